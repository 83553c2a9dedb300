// crates/zonegate-cli/src/main.rs
// ============================================================================
// Module: Zonegate CLI Entry Point
// Description: Command dispatcher for zone decisions, mitigations, audit, and evidence.
// Purpose: Provide a safe operator CLI over the zone control plane.
// Dependencies: clap, zonegate-config, zonegate-core, zonegate-store-sqlite, serde, thiserror.
// ============================================================================

//! ## Overview
//! The zonegate CLI loads `zonegate.toml`, opens the configured ledger store,
//! and runs one control plane operation per invocation. Results are written
//! to stdout as canonical JSON; telemetry and alert notices go to stderr or
//! the configured telemetry file.
//!
//! Inputs are untrusted: files are read with hard size limits and every
//! request is validated by the control plane before anything is committed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use zonegate_config::TelemetrySinkType;
use zonegate_config::ZonegateConfig;
use zonegate_core::AlertSink;
use zonegate_core::ArchiveRequest;
use zonegate_core::AuditEntry;
use zonegate_core::AuditFilter;
use zonegate_core::AuditResult;
use zonegate_core::Clock;
use zonegate_core::ControlPlaneError;
use zonegate_core::DecisionId;
use zonegate_core::DecisionLevel;
use zonegate_core::EvidenceFilter;
use zonegate_core::EvidenceId;
use zonegate_core::InMemoryLedgerStore;
use zonegate_core::MeasureType;
use zonegate_core::MitigationRequest;
use zonegate_core::OperationType;
use zonegate_core::OperatorId;
use zonegate_core::PreAlertRequest;
use zonegate_core::SharedLedgerStore;
use zonegate_core::SignalSnapshot;
use zonegate_core::SystemClock;
use zonegate_core::TelemetrySink;
use zonegate_core::Timestamp;
use zonegate_core::TransitionRequest;
use zonegate_core::TriggerType;
use zonegate_core::ZoneControlPlane;
use zonegate_core::ZoneId;
use zonegate_core::runtime::FileTelemetry;
use zonegate_core::runtime::NoopAlertSink;
use zonegate_core::runtime::NoopTelemetry;
use zonegate_core::runtime::StderrAlertSink;
use zonegate_core::runtime::StderrTelemetry;
use zonegate_store_sqlite::SqliteLedgerStore;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a JSON input file (signals or evidence snapshot).
const MAX_INPUT_BYTES: usize = 1024 * 1024;
/// Seconds per day.
const SECS_PER_DAY: u64 = 24 * 60 * 60;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "zonegate", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to zonegate.toml or `ZONEGATE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// List registered zones.
    Zones,
    /// Evaluate a signal snapshot for a zone.
    Evaluate(EvaluateCommand),
    /// Decision state machine operations.
    Decision {
        /// Selected decision subcommand.
        #[command(subcommand)]
        command: DecisionCommand,
    },
    /// Mitigation controller operations.
    Mitigation {
        /// Selected mitigation subcommand.
        #[command(subcommand)]
        command: MitigationCommand,
    },
    /// Audit ledger queries and verification.
    Audit {
        /// Selected audit subcommand.
        #[command(subcommand)]
        command: AuditCommand,
    },
    /// Evidence ledger operations.
    Evidence {
        /// Selected evidence subcommand.
        #[command(subcommand)]
        command: EvidenceCommand,
    },
    /// Show the dashboard view for a zone.
    Dashboard(DashboardCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
}

/// Decision subcommands.
#[derive(Subcommand, Debug)]
enum DecisionCommand {
    /// Declare a pre-alert (D0) in a nominal zone.
    PreAlert(PreAlertCommand),
    /// Move the latest decision of a zone to a new level.
    Transition(TransitionCommand),
    /// Acknowledge an engine-forced decision.
    Acknowledge(AcknowledgeCommand),
    /// Show the active decision of a zone.
    Show(ZoneArgs),
    /// Show the full decision history of a zone.
    History(ZoneArgs),
}

/// Mitigation subcommands.
#[derive(Subcommand, Debug)]
enum MitigationCommand {
    /// Activate a mitigation measure in a zone.
    Activate(MitigationActivateCommand),
    /// List active mitigations in a zone.
    List(ZoneArgs),
    /// Deactivate every active mitigation in a zone.
    Deactivate(MitigationDeactivateCommand),
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Query audit entries, newest first.
    Query(AuditQueryCommand),
    /// Verify the hash chain over a time range.
    Verify(AuditVerifyCommand),
    /// Append a manual audit entry.
    Record(AuditRecordCommand),
}

/// Evidence subcommands.
#[derive(Subcommand, Debug)]
enum EvidenceCommand {
    /// Archive a JSON snapshot as evidence.
    Archive(EvidenceArchiveCommand),
    /// Archive a decision record as evidence.
    ArchiveDecision(EvidenceArchiveDecisionCommand),
    /// Seal an evidence record.
    Seal(EvidenceSealCommand),
    /// Show one evidence record.
    Get(EvidenceGetCommand),
    /// List evidence records.
    List(EvidenceListCommand),
}

/// Zone selector shared by read commands.
#[derive(Args, Debug)]
struct ZoneArgs {
    /// Zone identifier.
    #[arg(long, value_name = "ZONE")]
    zone: String,
}

/// Arguments for `evaluate`.
#[derive(Args, Debug)]
struct EvaluateCommand {
    /// Zone identifier.
    #[arg(long, value_name = "ZONE")]
    zone: String,
    /// Path to the signal snapshot JSON file.
    #[arg(long, value_name = "PATH")]
    signals: PathBuf,
    /// Apply forced transitions and automatic mitigations.
    #[arg(long, action = ArgAction::SetTrue)]
    decide: bool,
}

/// Arguments for `decision pre-alert`.
#[derive(Args, Debug)]
struct PreAlertCommand {
    /// Zone identifier.
    #[arg(long, value_name = "ZONE")]
    zone: String,
    /// Reason for the declaration.
    #[arg(long)]
    reason: String,
    /// Declaring operator.
    #[arg(long, value_name = "ID")]
    operator: String,
    /// Number of signals observed.
    #[arg(long)]
    signal_count: Option<u64>,
    /// Number of context states observed.
    #[arg(long)]
    context_states: Option<u64>,
}

/// Arguments for `decision transition`.
#[derive(Args, Debug)]
struct TransitionCommand {
    /// Latest decision identifier of the zone.
    #[arg(long, value_name = "ID")]
    decision_id: String,
    /// Target level.
    #[arg(long, value_enum, ignore_case = true)]
    target: LevelArg,
    /// Reason for the transition.
    #[arg(long)]
    reason: String,
    /// Operator performing the transition.
    #[arg(long, value_name = "ID")]
    operator: String,
    /// Number of signals observed.
    #[arg(long)]
    signal_count: Option<u64>,
    /// Number of context states observed.
    #[arg(long)]
    context_states: Option<u64>,
}

/// Arguments for `decision acknowledge`.
#[derive(Args, Debug)]
struct AcknowledgeCommand {
    /// Engine-forced decision identifier.
    #[arg(long, value_name = "ID")]
    decision_id: String,
    /// Acknowledging operator.
    #[arg(long, value_name = "ID")]
    operator: String,
    /// Reason for the acknowledgment.
    #[arg(long)]
    reason: String,
}

/// Arguments for `mitigation activate`.
#[derive(Args, Debug)]
struct MitigationActivateCommand {
    /// Zone identifier.
    #[arg(long, value_name = "ZONE")]
    zone: String,
    /// Measure to activate.
    #[arg(long, value_enum)]
    measure: MeasureArg,
    /// Condition that prompted the activation.
    #[arg(long, default_value = "manual")]
    condition: String,
    /// Reason for the activation.
    #[arg(long)]
    reason: String,
    /// Activating operator.
    #[arg(long, value_name = "ID")]
    operator: String,
}

/// Arguments for `mitigation deactivate`.
#[derive(Args, Debug)]
struct MitigationDeactivateCommand {
    /// Zone identifier.
    #[arg(long, value_name = "ZONE")]
    zone: String,
    /// Reason for the deactivation.
    #[arg(long)]
    reason: String,
    /// Deactivating operator.
    #[arg(long, value_name = "ID")]
    operator: String,
}

/// Arguments for `audit query`.
#[derive(Args, Debug)]
struct AuditQueryCommand {
    /// Filter by operation type.
    #[arg(long, value_enum)]
    operation_type: Option<OperationTypeArg>,
    /// Filter by operator.
    #[arg(long, value_name = "ID")]
    operator: Option<String>,
    /// Filter by zone.
    #[arg(long, value_name = "ZONE")]
    zone: Option<String>,
    /// Filter by target type.
    #[arg(long)]
    target_type: Option<String>,
    /// Filter by target identifier.
    #[arg(long)]
    target_id: Option<String>,
    /// Filter by action name.
    #[arg(long)]
    action: Option<String>,
    /// Filter by result.
    #[arg(long, value_enum)]
    result: Option<AuditResultArg>,
    /// Inclusive lower bound (RFC 3339).
    #[arg(long, value_name = "RFC3339")]
    start: Option<String>,
    /// Exclusive upper bound (RFC 3339).
    #[arg(long, value_name = "RFC3339")]
    end: Option<String>,
    /// Maximum entries to return.
    #[arg(long)]
    limit: Option<usize>,
    /// Entries to skip.
    #[arg(long, default_value_t = 0)]
    offset: usize,
}

/// Arguments for `audit verify`.
#[derive(Args, Debug)]
struct AuditVerifyCommand {
    /// Inclusive lower bound (RFC 3339).
    #[arg(long, value_name = "RFC3339")]
    start: String,
    /// Exclusive upper bound (RFC 3339).
    #[arg(long, value_name = "RFC3339")]
    end: String,
}

/// Arguments for `audit record`.
#[derive(Args, Debug)]
struct AuditRecordCommand {
    /// Operation type of the entry.
    #[arg(long, value_enum, default_value_t = OperationTypeArg::SystemConfig)]
    operation_type: OperationTypeArg,
    /// Action name.
    #[arg(long)]
    action: String,
    /// Reason for the entry.
    #[arg(long)]
    reason: String,
    /// Recording operator.
    #[arg(long, value_name = "ID")]
    operator: String,
    /// Affected zone.
    #[arg(long, value_name = "ZONE")]
    zone: Option<String>,
}

/// Arguments for `evidence archive`.
#[derive(Args, Debug)]
struct EvidenceArchiveCommand {
    /// Evidence type label.
    #[arg(long = "type", value_name = "TYPE")]
    evidence_type: String,
    /// Identifier of the subject the evidence relates to.
    #[arg(long)]
    related_id: String,
    /// Zone the evidence belongs to.
    #[arg(long, value_name = "ZONE")]
    zone: Option<String>,
    /// Path to the snapshot JSON file.
    #[arg(long, value_name = "PATH")]
    snapshot: PathBuf,
    /// Archiving operator.
    #[arg(long, value_name = "ID")]
    operator: String,
    /// Retention window in days (defaults to the configured retention).
    #[arg(long)]
    retention_days: Option<u64>,
}

/// Arguments for `evidence archive-decision`.
#[derive(Args, Debug)]
struct EvidenceArchiveDecisionCommand {
    /// Decision identifier.
    #[arg(long, value_name = "ID")]
    decision_id: String,
    /// Archiving operator.
    #[arg(long, value_name = "ID")]
    operator: String,
}

/// Arguments for `evidence seal`.
#[derive(Args, Debug)]
struct EvidenceSealCommand {
    /// Evidence identifier.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Sealing operator.
    #[arg(long, value_name = "ID")]
    operator: String,
}

/// Arguments for `evidence get`.
#[derive(Args, Debug)]
struct EvidenceGetCommand {
    /// Evidence identifier.
    #[arg(long, value_name = "ID")]
    id: String,
}

/// Arguments for `evidence list`.
#[derive(Args, Debug)]
struct EvidenceListCommand {
    /// Filter by evidence type.
    #[arg(long = "type", value_name = "TYPE")]
    evidence_type: Option<String>,
    /// Filter by related identifier.
    #[arg(long)]
    related_id: Option<String>,
    /// Filter by zone.
    #[arg(long, value_name = "ZONE")]
    zone: Option<String>,
    /// Filter by seal state.
    #[arg(long)]
    sealed: Option<bool>,
    /// Inclusive lower bound on archive time (RFC 3339).
    #[arg(long, value_name = "RFC3339")]
    start: Option<String>,
    /// Exclusive upper bound on archive time (RFC 3339).
    #[arg(long, value_name = "RFC3339")]
    end: Option<String>,
    /// Maximum records to return.
    #[arg(long)]
    limit: Option<usize>,
    /// Records to skip.
    #[arg(long, default_value_t = 0)]
    offset: usize,
}

/// Arguments for `dashboard`.
#[derive(Args, Debug)]
struct DashboardCommand {
    /// Zone identifier.
    #[arg(long, value_name = "ZONE")]
    zone: String,
    /// Viewing operator, recorded as a data access.
    #[arg(long, value_name = "ID")]
    operator: String,
}

/// Decision level argument.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum LevelArg {
    /// No active declaration.
    Nominal,
    /// Pre-alert.
    D0,
    /// First escalation level.
    D1,
    /// Second escalation level.
    D2,
    /// Third escalation level.
    D3,
    /// Stand-down.
    D6,
}

impl From<LevelArg> for DecisionLevel {
    fn from(value: LevelArg) -> Self {
        match value {
            LevelArg::Nominal => Self::Nominal,
            LevelArg::D0 => Self::D0,
            LevelArg::D1 => Self::D1,
            LevelArg::D2 => Self::D2,
            LevelArg::D3 => Self::D3,
            LevelArg::D6 => Self::D6,
        }
    }
}

/// Mitigation measure argument.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum MeasureArg {
    /// Aggregate signals across more sources.
    Aggregation,
    /// Raise corroboration requirements.
    StricterGating,
    /// Pull additional context into the decision.
    RefinedContext,
    /// Require a human reviewer.
    HumanReview,
    /// Fall back to a degraded operating mode.
    Degradation,
}

impl From<MeasureArg> for MeasureType {
    fn from(value: MeasureArg) -> Self {
        match value {
            MeasureArg::Aggregation => Self::Aggregation,
            MeasureArg::StricterGating => Self::StricterGating,
            MeasureArg::RefinedContext => Self::RefinedContext,
            MeasureArg::HumanReview => Self::HumanReview,
            MeasureArg::Degradation => Self::Degradation,
        }
    }
}

/// Audit operation type argument.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OperationTypeArg {
    /// Read access to zone data.
    DataAccess,
    /// Decision or mitigation change.
    DecisionTransition,
    /// Configuration or maintenance action.
    SystemConfig,
    /// Evidence archive or seal.
    EvidenceLifecycle,
}

impl From<OperationTypeArg> for OperationType {
    fn from(value: OperationTypeArg) -> Self {
        match value {
            OperationTypeArg::DataAccess => Self::DataAccess,
            OperationTypeArg::DecisionTransition => Self::DecisionTransition,
            OperationTypeArg::SystemConfig => Self::SystemConfig,
            OperationTypeArg::EvidenceLifecycle => Self::EvidenceLifecycle,
        }
    }
}

/// Audit result argument.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum AuditResultArg {
    /// Operation applied.
    Success,
    /// Operation rejected.
    Failure,
    /// Infrastructure failure.
    Error,
}

impl From<AuditResultArg> for AuditResult {
    fn from(value: AuditResultArg) -> Self {
        match value {
            AuditResultArg::Success => Self::Success,
            AuditResultArg::Failure => Self::Failure,
            AuditResultArg::Error => Self::Error,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<ControlPlaneError> for CliError {
    fn from(error: ControlPlaneError) -> Self {
        Self::new(format!("{}: {error}", error.kind()))
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// Underlying I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// File exceeds the size limit.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Observed size.
        size: u64,
        /// Configured limit.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = ZonegateConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    if let Commands::Config {
        command: ConfigCommand::Validate,
    } = cli.command
    {
        return command_config_validate();
    }
    let plane = build_control_plane(&config)?;
    match cli.command {
        Commands::Config {
            ..
        } => command_config_validate(),
        Commands::Zones => command_zones(&plane),
        Commands::Evaluate(command) => command_evaluate(&plane, &command),
        Commands::Decision {
            command,
        } => command_decision(&plane, command),
        Commands::Mitigation {
            command,
        } => command_mitigation(&plane, command),
        Commands::Audit {
            command,
        } => command_audit(&plane, command),
        Commands::Evidence {
            command,
        } => command_evidence(&plane, command),
        Commands::Dashboard(command) => command_dashboard(&plane, &command),
    }
}

/// Control plane type used by every command.
type Plane = ZoneControlPlane<SharedLedgerStore>;

/// Builds the control plane described by the configuration.
fn build_control_plane(config: &ZonegateConfig) -> CliResult<Plane> {
    let zones = config
        .zone_registry()
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let store = match config.store.sqlite_config() {
        Some(sqlite) => SqliteLedgerStore::new(sqlite)
            .map(SharedLedgerStore::from_store)
            .map_err(|err| CliError::new(format!("failed to open ledger store: {err}")))?,
        None => SharedLedgerStore::from_store(InMemoryLedgerStore::new()),
    };
    let telemetry: Arc<dyn TelemetrySink> = match (config.telemetry.sink, &config.telemetry.path) {
        (TelemetrySinkType::File, Some(path)) => Arc::new(
            FileTelemetry::new(path)
                .map_err(|err| CliError::new(format!("failed to open telemetry file: {err}")))?,
        ),
        (TelemetrySinkType::Stderr, _) => Arc::new(StderrTelemetry),
        _ => Arc::new(NoopTelemetry),
    };
    let alerts: Arc<dyn AlertSink> =
        if config.telemetry.alerts { Arc::new(StderrAlertSink) } else { Arc::new(NoopAlertSink) };
    Ok(ZoneControlPlane::new(store, zones, config.risk_model(), config.control_plane_config())
        .with_telemetry(telemetry)
        .with_alert_sink(alerts))
}

// ============================================================================
// SECTION: Config and Zone Commands
// ============================================================================

/// Executes `config validate`; loading already validated the file.
fn command_config_validate() -> CliResult<ExitCode> {
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `zones`.
fn command_zones(plane: &Plane) -> CliResult<ExitCode> {
    let zones: Vec<&ZoneId> = plane.zones().iter().collect();
    write_json(&zones)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `evaluate`.
fn command_evaluate(plane: &Plane, command: &EvaluateCommand) -> CliResult<ExitCode> {
    let zone_id = ZoneId::new(command.zone.as_str());
    let signals: SignalSnapshot = read_json_file(&command.signals, "signals")?;
    if command.decide {
        write_json(&plane.evaluate_and_decide(&zone_id, &signals)?)?;
    } else {
        write_json(&plane.evaluate(&zone_id, &signals)?)?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Decision Commands
// ============================================================================

/// Dispatches decision subcommands.
fn command_decision(plane: &Plane, command: DecisionCommand) -> CliResult<ExitCode> {
    match command {
        DecisionCommand::PreAlert(command) => {
            let record = plane.create_pre_alert(PreAlertRequest {
                zone_id: ZoneId::new(command.zone),
                reason: command.reason,
                operator_id: OperatorId::new(command.operator),
                signal_count: command.signal_count,
                context_states: command.context_states,
            })?;
            write_json(&record)?;
        }
        DecisionCommand::Transition(command) => {
            let record = plane.transition(TransitionRequest {
                decision_id: DecisionId::new(command.decision_id),
                target_state: command.target.into(),
                reason: command.reason,
                operator_id: OperatorId::new(command.operator),
                signal_count: command.signal_count,
                context_states: command.context_states,
            })?;
            write_json(&record)?;
        }
        DecisionCommand::Acknowledge(command) => {
            let record = plane.acknowledge(
                &DecisionId::new(command.decision_id),
                &OperatorId::new(command.operator),
                &command.reason,
            )?;
            write_json(&record)?;
        }
        DecisionCommand::Show(args) => {
            let latest = plane.latest_decision(&ZoneId::new(args.zone))?;
            write_json(&latest)?;
        }
        DecisionCommand::History(args) => {
            let history = plane.decision_history(&ZoneId::new(args.zone))?;
            write_json(&history)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Mitigation Commands
// ============================================================================

/// Dispatches mitigation subcommands.
fn command_mitigation(plane: &Plane, command: MitigationCommand) -> CliResult<ExitCode> {
    match command {
        MitigationCommand::Activate(command) => {
            let mitigation = plane.activate_mitigation(MitigationRequest {
                zone_id: ZoneId::new(command.zone),
                measure_type: command.measure.into(),
                trigger_type: TriggerType::Manual,
                trigger_condition: command.condition,
                reason: command.reason,
                operator_id: OperatorId::new(command.operator),
            })?;
            write_json(&mitigation)?;
        }
        MitigationCommand::List(args) => {
            write_json(&plane.active_mitigations(&ZoneId::new(args.zone))?)?;
        }
        MitigationCommand::Deactivate(command) => {
            let deactivated = plane.deactivate_all_for_zone(
                &ZoneId::new(command.zone),
                &OperatorId::new(command.operator),
                &command.reason,
            )?;
            write_json(&deactivated)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Audit Commands
// ============================================================================

/// Dispatches audit subcommands.
fn command_audit(plane: &Plane, command: AuditCommand) -> CliResult<ExitCode> {
    match command {
        AuditCommand::Query(command) => {
            let filter = AuditFilter {
                operation_type: command.operation_type.map(Into::into),
                operator_id: command.operator.map(OperatorId::new),
                zone_id: command.zone.map(ZoneId::new),
                target_type: command.target_type,
                target_id: command.target_id,
                action: command.action,
                result: command.result.map(Into::into),
                start_time: command.start.as_deref().map(parse_timestamp).transpose()?,
                end_time: command.end.as_deref().map(parse_timestamp).transpose()?,
                limit: command.limit,
                offset: command.offset,
            };
            write_json(&plane.query_audit(&filter)?)?;
            Ok(ExitCode::SUCCESS)
        }
        AuditCommand::Verify(command) => {
            let start = parse_timestamp(&command.start)?;
            let end = parse_timestamp(&command.end)?;
            let report = plane.verify_integrity(start, end)?;
            write_json(&report)?;
            Ok(if report.ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        AuditCommand::Record(command) => {
            let mut entry = AuditEntry::new(
                SystemClock.now(),
                command.operation_type.into(),
                OperatorId::new(command.operator),
                command.action,
                AuditResult::Success,
                command.reason,
            );
            if let Some(zone) = command.zone {
                entry = entry.with_zone(&ZoneId::new(zone));
            }
            write_json(&plane.record_audit(entry)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// SECTION: Evidence Commands
// ============================================================================

/// Dispatches evidence subcommands.
fn command_evidence(plane: &Plane, command: EvidenceCommand) -> CliResult<ExitCode> {
    match command {
        EvidenceCommand::Archive(command) => {
            let snapshot: Value = read_json_file(&command.snapshot, "snapshot")?;
            let record = plane.archive_evidence(ArchiveRequest {
                evidence_type: command.evidence_type,
                related_id: command.related_id,
                zone_id: command.zone.map(ZoneId::new),
                snapshot,
                archived_by: OperatorId::new(command.operator),
                retention: command
                    .retention_days
                    .map(|days| Duration::from_secs(days.saturating_mul(SECS_PER_DAY))),
            })?;
            write_json(&record)?;
        }
        EvidenceCommand::ArchiveDecision(command) => {
            let record = plane.archive_decision_state(
                &DecisionId::new(command.decision_id),
                &OperatorId::new(command.operator),
            )?;
            write_json(&record)?;
        }
        EvidenceCommand::Seal(command) => {
            let record = plane
                .seal_evidence(&EvidenceId::new(command.id), &OperatorId::new(command.operator))?;
            write_json(&record)?;
        }
        EvidenceCommand::Get(command) => {
            write_json(&plane.get_evidence(&EvidenceId::new(command.id))?)?;
        }
        EvidenceCommand::List(command) => {
            let filter = EvidenceFilter {
                evidence_type: command.evidence_type,
                related_id: command.related_id,
                zone_id: command.zone.map(ZoneId::new),
                sealed: command.sealed,
                start_time: command.start.as_deref().map(parse_timestamp).transpose()?,
                end_time: command.end.as_deref().map(parse_timestamp).transpose()?,
                limit: command.limit,
                offset: command.offset,
            };
            write_json(&plane.list_evidence(&filter)?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Dashboard Command
// ============================================================================

/// Executes `dashboard`.
fn command_dashboard(plane: &Plane, command: &DashboardCommand) -> CliResult<ExitCode> {
    let view = plane.dashboard(
        &ZoneId::new(command.zone.as_str()),
        &OperatorId::new(command.operator.as_str()),
    )?;
    write_json(&view)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Parses an RFC 3339 timestamp argument.
fn parse_timestamp(value: &str) -> CliResult<Timestamp> {
    Timestamp::parse_rfc3339(value)
        .map_err(|err| CliError::new(format!("invalid timestamp {value}: {err}")))
}

/// Reads and parses a JSON input file with the input size limit.
fn read_json_file<T: DeserializeOwned>(path: &Path, label: &str) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, MAX_INPUT_BYTES).map_err(|err| {
        CliError::new(format!("failed to read {label} file {}: {err}", path.display()))
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid {label} json: {err}")))
}

/// Reads a file, failing closed when it exceeds `max_bytes`.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a value to stdout as canonical JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to encode output: {err}")))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| CliError::new(output_error(&err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(error: &std::io::Error) -> String {
    format!("failed to write output: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
