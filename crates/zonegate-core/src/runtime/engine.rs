// crates/zonegate-core/src/runtime/engine.rs
// ============================================================================
// Module: Zonegate Control Plane Engine
// Description: Decision state machine, mitigation controller, and ledger facade.
// Purpose: Apply zone-scoped state changes with durable, chained audit records.
// Dependencies: serde_json, thiserror, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`ZoneControlPlane`] is the single execution path for every zone
//! operation. Mutations run inside the zone's exclusive section, re-read the
//! zone's latest record, and commit the state change together with its
//! audit entries as one [`LedgerBatch`]. If that commit fails the operation
//! fails; nothing is reported as applied without its audit trail.
//!
//! Rejected attempts are audited with `result = failure`. If even the
//! failure entry cannot be written the caller sees
//! [`ControlPlaneError::StorageUnavailable`].
//!
//! Alert publication and `data_access` audit entries happen after the commit
//! and are best-effort: their failures go to telemetry only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::AlertNotice;
use crate::core::ArchiveRequest;
use crate::core::AssessmentSnapshot;
use crate::core::AuditEntry;
use crate::core::AuditFilter;
use crate::core::AuditLog;
use crate::core::AuditPage;
use crate::core::AuditResult;
use crate::core::Breakpoint;
use crate::core::ComplexityMetrics;
use crate::core::DECISION_STATE_EVIDENCE;
use crate::core::DEFAULT_RETENTION;
use crate::core::DashboardView;
use crate::core::DecisionId;
use crate::core::DecisionLevel;
use crate::core::DecisionState;
use crate::core::EscalationPolicy;
use crate::core::EvidenceFilter;
use crate::core::EvidenceId;
use crate::core::EvidenceRecord;
use crate::core::IntegrityReport;
use crate::core::MeasureType;
use crate::core::Mitigation;
use crate::core::MitigationId;
use crate::core::MitigationPolicy;
use crate::core::OperationType;
use crate::core::OperatorId;
use crate::core::RiskAssessment;
use crate::core::RiskModel;
use crate::core::SignalSnapshot;
use crate::core::Timestamp;
use crate::core::TransitionOrigin;
use crate::core::TriggerType;
use crate::core::ZoneId;
use crate::core::ZoneRegistry;
use crate::core::allowed_targets;
use crate::core::evidence_id_for;
use crate::core::hashing::canonical_json_bytes;
use crate::core::is_transition_allowed;
use crate::core::verify_chain;
use crate::interfaces::AlertSink;
use crate::interfaces::Clock;
use crate::interfaces::LedgerBatch;
use crate::interfaces::LedgerStore;
use crate::interfaces::OperationEvent;
use crate::interfaces::OperationOutcome;
use crate::interfaces::StoreError;
use crate::interfaces::TelemetrySink;
use crate::runtime::clock::SystemClock;
use crate::runtime::locks::GLOBAL_LOCK_KEY;
use crate::runtime::locks::ZoneLocks;
use crate::runtime::risk_engine::RiskEngine;
use crate::runtime::risk_engine::RiskError;
use crate::runtime::telemetry::NoopAlertSink;
use crate::runtime::telemetry::NoopTelemetry;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default maximum canonical size of an evidence snapshot (bytes).
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 1024 * 1024;

/// Default validity window of published alert notices.
pub const DEFAULT_ALERT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Telemetry event name for operation outcomes.
const OPERATION_EVENT: &str = "zonegate_operation";

/// Telemetry event name for infrastructure failures.
const INFRASTRUCTURE_EVENT: &str = "zonegate_infrastructure";

/// Policy configuration for the zone control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPlaneConfig {
    /// Level each breakpoint kind forces.
    pub escalation: EscalationPolicy,
    /// Measure each breakpoint kind activates.
    pub mitigation: MitigationPolicy,
    /// Block further forced escalation until an operator acknowledges.
    pub require_operator_ack_after_forced: bool,
    /// Activate mapped mitigations during evaluate-and-decide.
    pub auto_mitigate: bool,
    /// Retention applied when an archive request names none.
    pub default_retention: Duration,
    /// Maximum canonical snapshot size accepted for evidence.
    pub max_snapshot_bytes: usize,
    /// Validity window of published alert notices.
    pub alert_ttl: Duration,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            escalation: EscalationPolicy::default(),
            mitigation: MitigationPolicy::default(),
            require_operator_ack_after_forced: false,
            auto_mitigate: true,
            default_retention: DEFAULT_RETENTION,
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            alert_ttl: DEFAULT_ALERT_TTL,
        }
    }
}

// ============================================================================
// SECTION: Requests and Results
// ============================================================================

/// Request to declare a pre-alert in a Nominal zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAlertRequest {
    /// Target zone.
    pub zone_id: ZoneId,
    /// Explanation; required.
    pub reason: String,
    /// Requesting operator.
    pub operator_id: OperatorId,
    /// Aggregate signal count at request time.
    #[serde(default)]
    pub signal_count: Option<u64>,
    /// Context state count at request time.
    #[serde(default)]
    pub context_states: Option<u64>,
}

/// Operator request to move a zone to another level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// Any decision record of the zone; the zone's latest record is what is validated.
    pub decision_id: DecisionId,
    /// Requested level.
    pub target_state: DecisionLevel,
    /// Explanation; required.
    pub reason: String,
    /// Requesting operator.
    pub operator_id: OperatorId,
    /// Aggregate signal count at request time.
    #[serde(default)]
    pub signal_count: Option<u64>,
    /// Context state count at request time.
    #[serde(default)]
    pub context_states: Option<u64>,
}

/// Request to activate a mitigation measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationRequest {
    /// Target zone.
    pub zone_id: ZoneId,
    /// Measure to activate.
    pub measure_type: MeasureType,
    /// Trigger kind.
    pub trigger_type: TriggerType,
    /// Condition that prompted activation.
    pub trigger_condition: String,
    /// Explanation; required.
    pub reason: String,
    /// Requesting operator.
    pub operator_id: OperatorId,
}

/// Result of one evaluate-then-decide step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecideOutcome {
    /// Risk evaluation that drove the step.
    pub assessment: RiskAssessment,
    /// Zone's latest record after the step, if it has any.
    pub decision: Option<DecisionState>,
    /// True when the step appended a forced record.
    pub escalated: bool,
    /// Mitigations activated (or already active) for the breakpoints.
    pub mitigations: Vec<Mitigation>,
}

/// Fields of a decision record that vary by operation.
struct RecordDraft<'a> {
    /// Level to declare.
    level: DecisionLevel,
    /// Explanation.
    reason: &'a str,
    /// Initiator.
    origin: TransitionOrigin,
    /// Operator identity.
    operator_id: &'a OperatorId,
    /// Signal count snapshot.
    signal_count: Option<u64>,
    /// Context state snapshot.
    context_states: Option<u64>,
    /// Forcing breakpoint.
    breakpoint: Option<Breakpoint>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Control plane errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlPlaneError {
    /// Request is malformed or missing a required field.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Zone is not registered.
    #[error("unknown zone: {0}")]
    UnknownZone(ZoneId),
    /// Target level is not reachable from the current level.
    #[error("illegal transition from {current} to {target} (allowed: {})", level_list(.allowed))]
    IllegalTransition {
        /// Zone's current level.
        current: DecisionLevel,
        /// Requested level.
        target: DecisionLevel,
        /// Levels reachable from `current`.
        allowed: Vec<DecisionLevel>,
    },
    /// Zone already has an active declaration.
    #[error("zone {zone} already has an active decision at {current}")]
    AlreadyActive {
        /// Zone.
        zone: ZoneId,
        /// Active level.
        current: DecisionLevel,
    },
    /// Zone has no active declaration.
    #[error("zone {0} has no active decision")]
    NoActiveDecision(ZoneId),
    /// Decision record does not exist.
    #[error("decision not found: {0}")]
    DecisionNotFound(DecisionId),
    /// Evidence record does not exist.
    #[error("evidence not found: {0}")]
    EvidenceNotFound(EvidenceId),
    /// Evidence retention window has passed.
    #[error("evidence {evidence_id} retention expired at {retention_until}")]
    RetentionExpired {
        /// Evidence record.
        evidence_id: EvidenceId,
        /// End of its retention window.
        retention_until: Timestamp,
    },
    /// An engine-forced record must be acknowledged before further forcing.
    #[error("zone {zone} requires operator acknowledgment of {decision_id}")]
    AcknowledgementRequired {
        /// Zone.
        zone: ZoneId,
        /// Unacknowledged forced record.
        decision_id: DecisionId,
    },
    /// Stored evidence snapshot no longer matches its digest.
    #[error("evidence {0} failed integrity verification")]
    EvidenceTampered(EvidenceId),
    /// Another writer changed the zone concurrently; retry.
    #[error("concurrent update: {0}")]
    Conflict(String),
    /// Ledger storage failed; nothing was applied.
    #[error("storage unavailable")]
    StorageUnavailable,
    /// Risk engine rejected the signal snapshot.
    #[error("invalid risk input: {0}")]
    InvalidInput(String),
}

impl ControlPlaneError {
    /// Returns a stable label for telemetry and audit metadata.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownZone(_) => "unknown_zone",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::AlreadyActive { .. } => "already_active",
            Self::NoActiveDecision(_) => "no_active_decision",
            Self::DecisionNotFound(_) => "decision_not_found",
            Self::EvidenceNotFound(_) => "evidence_not_found",
            Self::RetentionExpired { .. } => "retention_expired",
            Self::AcknowledgementRequired { .. } => "acknowledgement_required",
            Self::EvidenceTampered(_) => "evidence_tampered",
            Self::Conflict(_) => "conflict",
            Self::StorageUnavailable => "storage_unavailable",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// Returns true for infrastructure failures rather than rule violations.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::StorageUnavailable | Self::Conflict(_))
    }
}

impl From<RiskError> for ControlPlaneError {
    fn from(err: RiskError) -> Self {
        match err {
            RiskError::InvalidInput(message) => Self::InvalidInput(message),
        }
    }
}

/// Renders a level list for error messages.
fn level_list(levels: &[DecisionLevel]) -> String {
    if levels.is_empty() {
        return "none".to_string();
    }
    levels.iter().map(|level| level.as_str()).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Control Plane
// ============================================================================

/// Zone-scoped control plane over a ledger store.
pub struct ZoneControlPlane<S> {
    /// Ledger store.
    store: S,
    /// Known zones.
    zones: ZoneRegistry,
    /// Risk engine.
    engine: RiskEngine,
    /// Policy configuration.
    config: ControlPlaneConfig,
    /// Per-zone exclusive sections.
    locks: ZoneLocks,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Alert publication collaborator.
    alerts: Arc<dyn AlertSink>,
    /// Operational telemetry.
    telemetry: Arc<dyn TelemetrySink>,
}

impl<S: LedgerStore> ZoneControlPlane<S> {
    /// Creates a control plane with the system clock and no-op sinks.
    #[must_use]
    pub fn new(store: S, zones: ZoneRegistry, model: RiskModel, config: ControlPlaneConfig) -> Self {
        Self {
            store,
            zones,
            engine: RiskEngine::new(model),
            config,
            locks: ZoneLocks::default(),
            clock: Arc::new(SystemClock),
            alerts: Arc::new(NoopAlertSink),
            telemetry: Arc::new(NoopTelemetry),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the alert publication collaborator.
    #[must_use]
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Replaces the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Returns the zone registry.
    #[must_use]
    pub const fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    /// Returns the policy configuration.
    #[must_use]
    pub const fn config(&self) -> &ControlPlaneConfig {
        &self.config
    }

    /// Returns the ledger store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Risk evaluation
    // ------------------------------------------------------------------------

    /// Evaluates a zone's signals and records the result for the dashboard.
    ///
    /// Recording is best-effort; a failed write is reported to telemetry.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::UnknownZone`] or [`ControlPlaneError::InvalidInput`].
    pub fn evaluate(
        &self,
        zone_id: &ZoneId,
        signals: &SignalSnapshot,
    ) -> Result<RiskAssessment, ControlPlaneError> {
        let result = self.run_evaluate(zone_id, signals);
        self.observe("evaluate", Some(zone_id), &result);
        result
    }

    /// Evaluates signals, then applies the forced transition and mitigations they imply.
    ///
    /// The zone lock is taken only after evaluation and held for this one step.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError`] when evaluation fails, the escalation is
    /// blocked pending acknowledgment, or the ledger write fails.
    pub fn evaluate_and_decide(
        &self,
        zone_id: &ZoneId,
        signals: &SignalSnapshot,
    ) -> Result<DecideOutcome, ControlPlaneError> {
        let result = self.run_evaluate_and_decide(zone_id, signals);
        self.observe("evaluate_and_decide", Some(zone_id), &result);
        result
    }

    // ------------------------------------------------------------------------
    // Decision state machine
    // ------------------------------------------------------------------------

    /// Declares a pre-alert (`D0`) in a zone with no active declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::AlreadyActive`] when the zone is active,
    /// [`ControlPlaneError::Validation`] for a blank reason, and
    /// [`ControlPlaneError::StorageUnavailable`] when the ledger write fails.
    pub fn create_pre_alert(
        &self,
        request: PreAlertRequest,
    ) -> Result<DecisionState, ControlPlaneError> {
        let zone_id = request.zone_id.clone();
        let result = self.run_create_pre_alert(request);
        self.observe("create_pre_alert", Some(&zone_id), &result);
        result
    }

    /// Applies an operator transition, validated against the zone's latest record.
    ///
    /// Requesting the level the zone is already at returns the latest record
    /// without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::IllegalTransition`] for unreachable
    /// targets, [`ControlPlaneError::DecisionNotFound`] for unknown ids,
    /// [`ControlPlaneError::Validation`] for a blank reason, and
    /// [`ControlPlaneError::StorageUnavailable`] when the ledger write fails.
    pub fn transition(
        &self,
        request: TransitionRequest,
    ) -> Result<DecisionState, ControlPlaneError> {
        let result = self.run_transition(request);
        let zone_id = result.as_ref().ok().map(|record| record.zone_id.clone());
        self.observe("transition", zone_id.as_ref(), &result);
        result
    }

    /// Escalates a zone to the level implied by a breakpoint.
    ///
    /// A zone already at or above the implied level is left unchanged and
    /// its latest record is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::AcknowledgementRequired`] when policy
    /// blocks stacking forced escalations, and
    /// [`ControlPlaneError::StorageUnavailable`] when the ledger write fails.
    pub fn force_transition(
        &self,
        zone_id: &ZoneId,
        breakpoint: Breakpoint,
    ) -> Result<DecisionState, ControlPlaneError> {
        let result = self.run_force_transition(zone_id, breakpoint);
        self.observe("force_transition", Some(zone_id), &result);
        result
    }

    /// Records an operator acknowledgment of an engine-forced record.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::NoActiveDecision`] when the zone is not
    /// active, [`ControlPlaneError::Validation`] for a blank reason, and
    /// [`ControlPlaneError::StorageUnavailable`] when the ledger write fails.
    pub fn acknowledge(
        &self,
        decision_id: &DecisionId,
        operator_id: &OperatorId,
        reason: &str,
    ) -> Result<DecisionState, ControlPlaneError> {
        let result = self.run_acknowledge(decision_id, operator_id, reason);
        let zone_id = result.as_ref().ok().map(|record| record.zone_id.clone());
        self.observe("acknowledge", zone_id.as_ref(), &result);
        result
    }

    /// Returns the zone's active record, or `None` when the zone is Nominal.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::UnknownZone`] or
    /// [`ControlPlaneError::StorageUnavailable`].
    pub fn latest_decision(
        &self,
        zone_id: &ZoneId,
    ) -> Result<Option<DecisionState>, ControlPlaneError> {
        let result = self.require_zone(zone_id).and_then(|()| {
            Ok(self.load_latest("latest_decision", zone_id)?.filter(DecisionState::is_active))
        });
        self.observe("latest_decision", Some(zone_id), &result);
        result
    }

    /// Returns the zone's full decision timeline, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::UnknownZone`] or
    /// [`ControlPlaneError::StorageUnavailable`].
    pub fn decision_history(
        &self,
        zone_id: &ZoneId,
    ) -> Result<Vec<DecisionState>, ControlPlaneError> {
        self.require_zone(zone_id)?;
        self.store
            .decision_history(zone_id)
            .map_err(|err| self.storage_failure("decision_history", Some(zone_id), &err))
    }

    // ------------------------------------------------------------------------
    // Mitigation controller
    // ------------------------------------------------------------------------

    /// Activates a mitigation in a zone with an active declaration.
    ///
    /// Activating a measure that is already active returns the existing record.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::NoActiveDecision`] when the zone is not
    /// active and [`ControlPlaneError::StorageUnavailable`] when the ledger
    /// write fails.
    pub fn activate_mitigation(
        &self,
        request: MitigationRequest,
    ) -> Result<Mitigation, ControlPlaneError> {
        let zone_id = request.zone_id.clone();
        let result = self.run_activate_mitigation(request);
        self.observe("activate_mitigation", Some(&zone_id), &result);
        result
    }

    /// Deactivates every active mitigation in a zone and returns them.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Validation`] for a blank reason and
    /// [`ControlPlaneError::StorageUnavailable`] when the ledger write fails.
    pub fn deactivate_all_for_zone(
        &self,
        zone_id: &ZoneId,
        operator_id: &OperatorId,
        reason: &str,
    ) -> Result<Vec<Mitigation>, ControlPlaneError> {
        let result = self.run_deactivate_all(zone_id, operator_id, reason);
        self.observe("deactivate_all_for_zone", Some(zone_id), &result);
        result
    }

    /// Returns the zone's active mitigations in activation order.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::UnknownZone`] or
    /// [`ControlPlaneError::StorageUnavailable`].
    pub fn active_mitigations(&self, zone_id: &ZoneId) -> Result<Vec<Mitigation>, ControlPlaneError> {
        self.require_zone(zone_id)?;
        self.load_active_mitigations("active_mitigations", zone_id)
    }

    // ------------------------------------------------------------------------
    // Audit ledger
    // ------------------------------------------------------------------------

    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::StorageUnavailable`] when the write fails.
    pub fn record_audit(&self, entry: AuditEntry) -> Result<AuditLog, ControlPlaneError> {
        let zone_id = entry.zone_id.clone();
        let result = self
            .commit("record_audit", zone_id.as_ref(), LedgerBatch::audit_only(entry))
            .and_then(|sealed| sealed.into_iter().next().ok_or(ControlPlaneError::StorageUnavailable));
        self.observe("record_audit", zone_id.as_ref(), &result);
        result
    }

    /// Queries audit entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::StorageUnavailable`] when the read fails.
    pub fn query_audit(&self, filter: &AuditFilter) -> Result<AuditPage, ControlPlaneError> {
        self.store
            .query_audit(filter)
            .map_err(|err| self.storage_failure("query_audit", filter.zone_id.as_ref(), &err))
    }

    /// Verifies the audit chain for entries with timestamps in `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::StorageUnavailable`] when the read fails;
    /// chain defects are reported in the returned [`IntegrityReport`].
    pub fn verify_integrity(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<IntegrityReport, ControlPlaneError> {
        let entries = self
            .store
            .audit_range(start, end)
            .map_err(|err| self.storage_failure("verify_integrity", None, &err))?;
        let anchor = match entries.first() {
            Some(first) => self
                .store
                .audit_before(first.sequence)
                .map_err(|err| self.storage_failure("verify_integrity", None, &err))?,
            None => None,
        };
        let report = verify_chain(&entries, anchor.as_ref(), start, end);
        if !report.ok {
            self.emit(OperationEvent {
                event: INFRASTRUCTURE_EVENT,
                timestamp_ms: self.clock.now().as_unix_millis(),
                operation: "verify_integrity",
                zone_id: None,
                outcome: OperationOutcome::Error,
                error_kind: Some("integrity_violation"),
                detail: Some(format!(
                    "{} of {} audit entries failed verification",
                    report.invalid, report.total
                )),
            });
        }
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Evidence ledger
    // ------------------------------------------------------------------------

    /// Archives a snapshot; archiving the same subject again returns the existing record.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::Validation`] for missing fields or
    /// oversized snapshots and [`ControlPlaneError::StorageUnavailable`] when
    /// the ledger write fails.
    pub fn archive_evidence(
        &self,
        request: ArchiveRequest,
    ) -> Result<EvidenceRecord, ControlPlaneError> {
        let zone_id = request.zone_id.clone();
        let result = self.run_archive_evidence(request);
        self.observe("archive_evidence", zone_id.as_ref(), &result);
        result
    }

    /// Archives a decision record as `decision_state` evidence.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::DecisionNotFound`] for unknown ids and the
    /// errors of [`Self::archive_evidence`].
    pub fn archive_decision_state(
        &self,
        decision_id: &DecisionId,
        operator_id: &OperatorId,
    ) -> Result<EvidenceRecord, ControlPlaneError> {
        let record = self
            .store
            .decision(decision_id)
            .map_err(|err| self.storage_failure("archive_decision_state", None, &err))?
            .ok_or_else(|| ControlPlaneError::DecisionNotFound(decision_id.clone()))?;
        let snapshot = serde_json::to_value(&record)
            .map_err(|err| ControlPlaneError::Validation(err.to_string()))?;
        self.archive_evidence(ArchiveRequest {
            evidence_type: DECISION_STATE_EVIDENCE.to_string(),
            related_id: record.id.to_string(),
            zone_id: Some(record.zone_id),
            snapshot,
            archived_by: operator_id.clone(),
            retention: None,
        })
    }

    /// Seals an evidence record; sealing a sealed record is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::EvidenceNotFound`],
    /// [`ControlPlaneError::RetentionExpired`],
    /// [`ControlPlaneError::EvidenceTampered`], or
    /// [`ControlPlaneError::StorageUnavailable`].
    pub fn seal_evidence(
        &self,
        evidence_id: &EvidenceId,
        operator_id: &OperatorId,
    ) -> Result<EvidenceRecord, ControlPlaneError> {
        let result = self.run_seal_evidence(evidence_id, operator_id);
        let zone_id = result.as_ref().ok().and_then(|record| record.zone_id.clone());
        self.observe("seal_evidence", zone_id.as_ref(), &result);
        result
    }

    /// Loads an evidence record and verifies its snapshot digest.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::EvidenceNotFound`],
    /// [`ControlPlaneError::EvidenceTampered`], or
    /// [`ControlPlaneError::StorageUnavailable`].
    pub fn get_evidence(&self, evidence_id: &EvidenceId) -> Result<EvidenceRecord, ControlPlaneError> {
        let record = self
            .store
            .evidence(evidence_id)
            .map_err(|err| self.storage_failure("get_evidence", None, &err))?
            .ok_or_else(|| ControlPlaneError::EvidenceNotFound(evidence_id.clone()))?;
        self.verified(record)
    }

    /// Lists evidence records, verifying each snapshot digest.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::EvidenceTampered`] for the first record
    /// that fails verification, or [`ControlPlaneError::StorageUnavailable`].
    pub fn list_evidence(
        &self,
        filter: &EvidenceFilter,
    ) -> Result<Vec<EvidenceRecord>, ControlPlaneError> {
        let records = self
            .store
            .list_evidence(filter)
            .map_err(|err| self.storage_failure("list_evidence", filter.zone_id.as_ref(), &err))?;
        records.into_iter().map(|record| self.verified(record)).collect()
    }

    // ------------------------------------------------------------------------
    // Dashboard facade
    // ------------------------------------------------------------------------

    /// Returns the aggregate read model for a zone.
    ///
    /// The read is audited as `data_access` on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`ControlPlaneError::UnknownZone`] or
    /// [`ControlPlaneError::StorageUnavailable`].
    pub fn dashboard(
        &self,
        zone_id: &ZoneId,
        operator_id: &OperatorId,
    ) -> Result<DashboardView, ControlPlaneError> {
        self.require_zone(zone_id)?;
        let decision_state =
            self.load_latest("dashboard", zone_id)?.filter(DecisionState::is_active);
        let active_mitigations = self.load_active_mitigations("dashboard", zone_id)?;
        let snapshot = self
            .store
            .latest_assessment(zone_id)
            .map_err(|err| self.storage_failure("dashboard", Some(zone_id), &err))?;
        let view = DashboardView {
            zone_id: zone_id.clone(),
            decision_state,
            complexity_metrics: snapshot.as_ref().map(|s| s.assessment.complexity_metrics),
            complexity_level: snapshot.as_ref().map(|s| s.assessment.complexity_level),
            ethical_primes: snapshot.as_ref().map(|s| s.assessment.ethical_primes),
            breakpoints: snapshot
                .as_ref()
                .map(|s| s.assessment.breakpoints.clone())
                .unwrap_or_default(),
            active_mitigations,
            evaluated_at: snapshot.map(|s| s.evaluated_at),
        };
        let access = AuditEntry::new(
            self.clock.now(),
            OperationType::DataAccess,
            operator_id.clone(),
            "read_dashboard",
            AuditResult::Success,
            "dashboard read",
        )
        .with_zone(zone_id)
        .with_target("zone", zone_id.as_str());
        if let Err(err) = self.store.commit(LedgerBatch::audit_only(access)) {
            self.report_store_error("dashboard", Some(zone_id), &err);
        }
        Ok(view)
    }

    // ========================================================================
    // SECTION: Operation Bodies
    // ========================================================================

    /// Body of [`Self::evaluate`].
    fn run_evaluate(
        &self,
        zone_id: &ZoneId,
        signals: &SignalSnapshot,
    ) -> Result<RiskAssessment, ControlPlaneError> {
        self.require_zone(zone_id)?;
        let assessment = self.engine.evaluate(zone_id, signals)?;
        let snapshot = LedgerBatch {
            assessment: Some(AssessmentSnapshot {
                assessment: assessment.clone(),
                evaluated_at: self.clock.now(),
            }),
            ..LedgerBatch::default()
        };
        if let Err(err) = self.store.commit(snapshot) {
            self.report_store_error("evaluate", Some(zone_id), &err);
        }
        Ok(assessment)
    }

    /// Body of [`Self::evaluate_and_decide`].
    fn run_evaluate_and_decide(
        &self,
        zone_id: &ZoneId,
        signals: &SignalSnapshot,
    ) -> Result<DecideOutcome, ControlPlaneError> {
        let assessment = self.run_evaluate(zone_id, signals)?;
        if assessment.breakpoints.is_empty() {
            let decision =
                self.load_latest("evaluate_and_decide", zone_id)?.filter(DecisionState::is_active);
            return Ok(DecideOutcome {
                assessment,
                decision,
                escalated: false,
                mitigations: Vec::new(),
            });
        }
        let handle = self.zone_lock(zone_id.as_str())?;
        let _guard = self.enter(&handle)?;
        let (decision, escalated) = self.force_locked(
            zone_id,
            &assessment.breakpoints,
            Some(&assessment.complexity_metrics),
        )?;
        let mut mitigations = Vec::new();
        if self.config.auto_mitigate {
            for breakpoint in &assessment.breakpoints {
                let request = MitigationRequest {
                    zone_id: zone_id.clone(),
                    measure_type: self.config.mitigation.measure_for(breakpoint.kind),
                    trigger_type: TriggerType::Automatic,
                    trigger_condition: format!("{} > {}", breakpoint.kind, breakpoint.threshold),
                    reason: breakpoint.description.clone(),
                    operator_id: OperatorId::risk_engine(),
                };
                let mitigation = self.activate_locked(request, Some(breakpoint))?;
                if !mitigations.iter().any(|known: &Mitigation| known.id == mitigation.id) {
                    mitigations.push(mitigation);
                }
            }
        }
        Ok(DecideOutcome {
            assessment,
            decision: Some(decision),
            escalated,
            mitigations,
        })
    }

    /// Body of [`Self::create_pre_alert`].
    fn run_create_pre_alert(
        &self,
        request: PreAlertRequest,
    ) -> Result<DecisionState, ControlPlaneError> {
        let zone_id = &request.zone_id;
        let audit = AuditEntry::new(
            self.clock.now(),
            OperationType::DecisionTransition,
            request.operator_id.clone(),
            "create_pre_alert",
            AuditResult::Success,
            request.reason.clone(),
        )
        .with_zone(zone_id)
        .with_target("zone", zone_id.as_str())
        .with_metadata(json!({"target_state": DecisionLevel::D0}));
        if !self.zones.contains(zone_id) {
            return Err(self.reject(audit, ControlPlaneError::UnknownZone(zone_id.clone())));
        }
        let handle = self.zone_lock(zone_id.as_str())?;
        let _guard = self.enter(&handle)?;
        if is_blank(&request.reason) {
            return Err(self.reject(audit, ControlPlaneError::Validation(reason_required())));
        }
        let latest = self.load_latest("create_pre_alert", zone_id)?;
        if let Some(latest) = latest.as_ref().filter(|record| record.is_active()) {
            let err = ControlPlaneError::AlreadyActive {
                zone: zone_id.clone(),
                current: latest.current_state,
            };
            return Err(self.reject(audit, err));
        }
        let record = self.next_record(
            zone_id,
            latest.as_ref(),
            RecordDraft {
                level: DecisionLevel::D0,
                reason: &request.reason,
                origin: TransitionOrigin::Operator,
                operator_id: &request.operator_id,
                signal_count: request.signal_count,
                context_states: request.context_states,
                breakpoint: None,
            },
        );
        let audit = audit
            .with_target("decision_state", record.id.as_str())
            .with_metadata(transition_metadata(&record, None));
        self.commit(
            "create_pre_alert",
            Some(zone_id),
            LedgerBatch {
                decision: Some(record.clone()),
                audit: vec![audit],
                ..LedgerBatch::default()
            },
        )?;
        self.publish(&record);
        Ok(record)
    }

    /// Body of [`Self::transition`].
    fn run_transition(&self, request: TransitionRequest) -> Result<DecisionState, ControlPlaneError> {
        let target = request.target_state;
        let audit = AuditEntry::new(
            self.clock.now(),
            OperationType::DecisionTransition,
            request.operator_id.clone(),
            "transition",
            AuditResult::Success,
            request.reason.clone(),
        )
        .with_target("decision_state", request.decision_id.as_str())
        .with_metadata(json!({
            "requested_decision_id": request.decision_id,
            "target_state": target,
        }));
        let referenced = self
            .store
            .decision(&request.decision_id)
            .map_err(|err| self.storage_failure("transition", None, &err))?;
        let Some(referenced) = referenced else {
            return Err(
                self.reject(audit, ControlPlaneError::DecisionNotFound(request.decision_id.clone()))
            );
        };
        let zone_id = &referenced.zone_id;
        let audit = audit.with_zone(zone_id);
        let handle = self.zone_lock(zone_id.as_str())?;
        let _guard = self.enter(&handle)?;
        if is_blank(&request.reason) {
            return Err(self.reject(audit, ControlPlaneError::Validation(reason_required())));
        }
        let latest = self.load_latest("transition", zone_id)?.ok_or_else(|| {
            self.storage_failure(
                "transition",
                Some(zone_id),
                &StoreError::Corrupt(format!("zone {zone_id} has records but no latest record")),
            )
        })?;
        if latest.current_state == target {
            return Ok(latest);
        }
        if !is_transition_allowed(latest.current_state, target, TransitionOrigin::Operator) {
            let err = ControlPlaneError::IllegalTransition {
                current: latest.current_state,
                target,
                allowed: allowed_targets(latest.current_state, TransitionOrigin::Operator),
            };
            return Err(self.reject(audit, err));
        }
        let record = self.next_record(
            zone_id,
            Some(&latest),
            RecordDraft {
                level: target,
                reason: &request.reason,
                origin: TransitionOrigin::Operator,
                operator_id: &request.operator_id,
                signal_count: request.signal_count,
                context_states: request.context_states,
                breakpoint: None,
            },
        );
        let mut batch = LedgerBatch {
            decision: Some(record.clone()),
            audit: vec![
                audit
                    .with_target("decision_state", record.id.as_str())
                    .with_metadata(transition_metadata(&record, Some(&request.decision_id))),
            ],
            ..LedgerBatch::default()
        };
        if !target.is_active() {
            let (mitigations, entries) = self.deactivation_writes(
                "transition",
                zone_id,
                &request.operator_id,
                &request.reason,
            )?;
            batch.mitigations = mitigations;
            batch.audit.extend(entries);
        }
        self.commit("transition", Some(zone_id), batch)?;
        self.publish(&record);
        Ok(record)
    }

    /// Body of [`Self::force_transition`].
    fn run_force_transition(
        &self,
        zone_id: &ZoneId,
        breakpoint: Breakpoint,
    ) -> Result<DecisionState, ControlPlaneError> {
        self.require_zone(zone_id)?;
        let handle = self.zone_lock(zone_id.as_str())?;
        let _guard = self.enter(&handle)?;
        self.force_locked(zone_id, &[breakpoint], None).map(|(record, _)| record)
    }

    /// Applies the highest-severity escalation implied by `breakpoints`.
    ///
    /// Must be called with the zone lock held. Returns the zone's latest
    /// record and whether a new record was appended.
    fn force_locked(
        &self,
        zone_id: &ZoneId,
        breakpoints: &[Breakpoint],
        metrics: Option<&ComplexityMetrics>,
    ) -> Result<(DecisionState, bool), ControlPlaneError> {
        let escalation = &self.config.escalation;
        let primary = breakpoints.iter().fold(None, |best: Option<&Breakpoint>, candidate| {
            match best {
                Some(current)
                    if escalation.level_for(current.kind).severity()
                        >= escalation.level_for(candidate.kind).severity() =>
                {
                    Some(current)
                }
                _ => Some(candidate),
            }
        });
        let Some(primary) = primary else {
            return Err(ControlPlaneError::Validation("at least one breakpoint is required".to_string()));
        };
        let implied = escalation.level_for(primary.kind);
        let latest = self.load_latest("force_transition", zone_id)?;
        let current = latest.as_ref().map_or(DecisionLevel::Nominal, |record| record.current_state);
        let operator_id = OperatorId::risk_engine();
        let audit = AuditEntry::new(
            self.clock.now(),
            OperationType::DecisionTransition,
            operator_id.clone(),
            "force_transition",
            AuditResult::Success,
            primary.description.clone(),
        )
        .with_zone(zone_id)
        .with_target("zone", zone_id.as_str())
        .with_metadata(json!({
            "breakpoint": primary,
            "breakpoints": breakpoints,
            "implied_state": implied,
        }));
        if let Some(latest) = latest.as_ref().filter(|record| record.is_active()) {
            if current.severity() >= implied.severity() {
                return Ok((latest.clone(), false));
            }
            if self.config.require_operator_ack_after_forced
                && latest.origin == TransitionOrigin::Engine
            {
                let err = ControlPlaneError::AcknowledgementRequired {
                    zone: zone_id.clone(),
                    decision_id: latest.id.clone(),
                };
                return Err(self.reject(audit, err));
            }
        }
        if !is_transition_allowed(current, implied, TransitionOrigin::Engine) {
            let err = ControlPlaneError::IllegalTransition {
                current,
                target: implied,
                allowed: allowed_targets(current, TransitionOrigin::Engine),
            };
            return Err(self.reject(audit, err));
        }
        let record = self.next_record(
            zone_id,
            latest.as_ref(),
            RecordDraft {
                level: implied,
                reason: &primary.description,
                origin: TransitionOrigin::Engine,
                operator_id: &operator_id,
                signal_count: metrics.map(|m| m.signal_sources),
                context_states: metrics.map(|m| m.context_states),
                breakpoint: Some(primary.clone()),
            },
        );
        let mut metadata = transition_metadata(&record, None);
        if let Value::Object(map) = &mut metadata {
            map.insert("breakpoint".to_string(), json!(primary));
            map.insert("breakpoints".to_string(), json!(breakpoints));
        }
        let audit = audit.with_target("decision_state", record.id.as_str()).with_metadata(metadata);
        self.commit(
            "force_transition",
            Some(zone_id),
            LedgerBatch {
                decision: Some(record.clone()),
                audit: vec![audit],
                ..LedgerBatch::default()
            },
        )?;
        self.publish(&record);
        Ok((record, true))
    }

    /// Body of [`Self::acknowledge`].
    fn run_acknowledge(
        &self,
        decision_id: &DecisionId,
        operator_id: &OperatorId,
        reason: &str,
    ) -> Result<DecisionState, ControlPlaneError> {
        let audit = AuditEntry::new(
            self.clock.now(),
            OperationType::DecisionTransition,
            operator_id.clone(),
            "acknowledge",
            AuditResult::Success,
            reason,
        )
        .with_target("decision_state", decision_id.as_str());
        let referenced = self
            .store
            .decision(decision_id)
            .map_err(|err| self.storage_failure("acknowledge", None, &err))?;
        let Some(referenced) = referenced else {
            return Err(self.reject(audit, ControlPlaneError::DecisionNotFound(decision_id.clone())));
        };
        let zone_id = &referenced.zone_id;
        let audit = audit.with_zone(zone_id);
        let handle = self.zone_lock(zone_id.as_str())?;
        let _guard = self.enter(&handle)?;
        if is_blank(reason) {
            return Err(self.reject(audit, ControlPlaneError::Validation(reason_required())));
        }
        let latest = self.load_latest("acknowledge", zone_id)?.filter(DecisionState::is_active);
        let Some(latest) = latest else {
            return Err(self.reject(audit, ControlPlaneError::NoActiveDecision(zone_id.clone())));
        };
        if latest.origin == TransitionOrigin::Operator {
            return Ok(latest);
        }
        let record = self.next_record(
            zone_id,
            Some(&latest),
            RecordDraft {
                level: latest.current_state,
                reason,
                origin: TransitionOrigin::Operator,
                operator_id,
                signal_count: latest.signal_count,
                context_states: latest.context_states,
                breakpoint: None,
            },
        );
        let audit = audit
            .with_target("decision_state", record.id.as_str())
            .with_metadata(transition_metadata(&record, Some(&latest.id)));
        self.commit(
            "acknowledge",
            Some(zone_id),
            LedgerBatch {
                decision: Some(record.clone()),
                audit: vec![audit],
                ..LedgerBatch::default()
            },
        )?;
        Ok(record)
    }

    /// Body of [`Self::activate_mitigation`].
    fn run_activate_mitigation(
        &self,
        request: MitigationRequest,
    ) -> Result<Mitigation, ControlPlaneError> {
        let zone_id = request.zone_id.clone();
        if !self.zones.contains(&zone_id) {
            let audit = mitigation_audit(self.clock.now(), &request, None);
            return Err(self.reject(audit, ControlPlaneError::UnknownZone(zone_id)));
        }
        let handle = self.zone_lock(zone_id.as_str())?;
        let _guard = self.enter(&handle)?;
        self.activate_locked(request, None)
    }

    /// Activates a mitigation; must be called with the zone lock held.
    fn activate_locked(
        &self,
        request: MitigationRequest,
        breakpoint: Option<&Breakpoint>,
    ) -> Result<Mitigation, ControlPlaneError> {
        let now = self.clock.now();
        let zone_id = &request.zone_id;
        let audit = mitigation_audit(now, &request, breakpoint);
        if is_blank(&request.reason) {
            return Err(self.reject(audit, ControlPlaneError::Validation(reason_required())));
        }
        let latest =
            self.load_latest("activate_mitigation", zone_id)?.filter(DecisionState::is_active);
        let Some(latest) = latest else {
            return Err(self.reject(audit, ControlPlaneError::NoActiveDecision(zone_id.clone())));
        };
        let existing = self
            .store
            .zone_mitigations(zone_id)
            .map_err(|err| self.storage_failure("activate_mitigation", Some(zone_id), &err))?;
        if let Some(active) = existing
            .iter()
            .find(|mitigation| mitigation.active && mitigation.measure_type == request.measure_type)
        {
            return Ok(active.clone());
        }
        let ordinal = u64::try_from(existing.len()).unwrap_or(u64::MAX).saturating_add(1);
        let mitigation = Mitigation {
            id: MitigationId::for_zone(zone_id, ordinal),
            zone_id: zone_id.clone(),
            decision_id: latest.id,
            measure_type: request.measure_type,
            trigger_type: request.trigger_type,
            trigger_condition: request.trigger_condition,
            reason: request.reason,
            active: true,
            activated_at: now,
            deactivated_at: None,
        };
        let audit = audit.with_target("mitigation", mitigation.id.as_str());
        self.commit(
            "activate_mitigation",
            Some(zone_id),
            LedgerBatch {
                mitigations: vec![mitigation.clone()],
                audit: vec![audit],
                ..LedgerBatch::default()
            },
        )?;
        Ok(mitigation)
    }

    /// Body of [`Self::deactivate_all_for_zone`].
    fn run_deactivate_all(
        &self,
        zone_id: &ZoneId,
        operator_id: &OperatorId,
        reason: &str,
    ) -> Result<Vec<Mitigation>, ControlPlaneError> {
        let audit = AuditEntry::new(
            self.clock.now(),
            OperationType::DecisionTransition,
            operator_id.clone(),
            "deactivate_all_mitigations",
            AuditResult::Success,
            reason,
        )
        .with_zone(zone_id)
        .with_target("zone", zone_id.as_str());
        if !self.zones.contains(zone_id) {
            return Err(self.reject(audit, ControlPlaneError::UnknownZone(zone_id.clone())));
        }
        let handle = self.zone_lock(zone_id.as_str())?;
        let _guard = self.enter(&handle)?;
        if is_blank(reason) {
            return Err(self.reject(audit, ControlPlaneError::Validation(reason_required())));
        }
        let (mitigations, entries) =
            self.deactivation_writes("deactivate_all_for_zone", zone_id, operator_id, reason)?;
        if mitigations.is_empty() {
            return Ok(mitigations);
        }
        self.commit(
            "deactivate_all_for_zone",
            Some(zone_id),
            LedgerBatch {
                mitigations: mitigations.clone(),
                audit: entries,
                ..LedgerBatch::default()
            },
        )?;
        Ok(mitigations)
    }

    /// Builds the writes that deactivate a zone's active mitigations.
    fn deactivation_writes(
        &self,
        operation: &'static str,
        zone_id: &ZoneId,
        operator_id: &OperatorId,
        reason: &str,
    ) -> Result<(Vec<Mitigation>, Vec<AuditEntry>), ControlPlaneError> {
        let now = self.clock.now();
        let deactivated: Vec<Mitigation> = self
            .load_active_mitigations(operation, zone_id)?
            .iter()
            .map(|mitigation| mitigation.deactivated(now))
            .collect();
        let entries = deactivated
            .iter()
            .map(|mitigation| {
                AuditEntry::new(
                    now,
                    OperationType::DecisionTransition,
                    operator_id.clone(),
                    "deactivate_mitigation",
                    AuditResult::Success,
                    reason,
                )
                .with_zone(zone_id)
                .with_target("mitigation", mitigation.id.as_str())
                .with_metadata(json!({"measure_type": mitigation.measure_type}))
            })
            .collect();
        Ok((deactivated, entries))
    }

    /// Body of [`Self::archive_evidence`].
    fn run_archive_evidence(
        &self,
        request: ArchiveRequest,
    ) -> Result<EvidenceRecord, ControlPlaneError> {
        let now = self.clock.now();
        let mut audit = AuditEntry::new(
            now,
            OperationType::EvidenceLifecycle,
            request.archived_by.clone(),
            "archive_evidence",
            AuditResult::Success,
            format!("archive {} {}", request.evidence_type, request.related_id),
        )
        .with_target("evidence", request.related_id.as_str())
        .with_metadata(json!({
            "evidence_type": request.evidence_type,
            "related_id": request.related_id,
        }));
        if let Some(zone_id) = &request.zone_id {
            audit = audit.with_zone(zone_id);
            if !self.zones.contains(zone_id) {
                return Err(self.reject(audit, ControlPlaneError::UnknownZone(zone_id.clone())));
            }
        }
        if is_blank(&request.evidence_type) || is_blank(&request.related_id) {
            let err = ControlPlaneError::Validation(
                "evidence_type and related_id are required".to_string(),
            );
            return Err(self.reject(audit, err));
        }
        let snapshot_bytes = canonical_json_bytes(&request.snapshot)
            .map_err(|err| ControlPlaneError::Validation(err.to_string()))?;
        if snapshot_bytes.len() > self.config.max_snapshot_bytes {
            let err = ControlPlaneError::Validation(format!(
                "snapshot exceeds size limit: {} bytes (max {})",
                snapshot_bytes.len(),
                self.config.max_snapshot_bytes
            ));
            return Err(self.reject(audit, err));
        }
        let lock_key =
            request.zone_id.as_ref().map_or(GLOBAL_LOCK_KEY, |zone_id| zone_id.as_str()).to_string();
        let handle = self.zone_lock(&lock_key)?;
        let _guard = self.enter(&handle)?;
        let evidence_id = evidence_id_for(&request.evidence_type, &request.related_id)
            .map_err(|err| ControlPlaneError::Validation(err.to_string()))?;
        let existing = self
            .store
            .evidence(&evidence_id)
            .map_err(|err| self.storage_failure("archive_evidence", request.zone_id.as_ref(), &err))?;
        if let Some(existing) = existing {
            return self.verified(existing);
        }
        let retention = request.retention.unwrap_or(self.config.default_retention);
        let record = EvidenceRecord::archive(
            ArchiveRequest {
                retention: Some(retention),
                ..request
            },
            now,
        )
        .map_err(|err| ControlPlaneError::Validation(err.to_string()))?;
        let audit = audit.with_target("evidence", record.id.as_str()).with_metadata(json!({
            "evidence_type": record.evidence_type,
            "related_id": record.related_id,
            "snapshot_hash": record.snapshot_hash,
            "retention_until": record.retention_until,
        }));
        self.commit(
            "archive_evidence",
            record.zone_id.as_ref(),
            LedgerBatch {
                evidence: vec![record.clone()],
                audit: vec![audit],
                ..LedgerBatch::default()
            },
        )?;
        Ok(record)
    }

    /// Body of [`Self::seal_evidence`].
    fn run_seal_evidence(
        &self,
        evidence_id: &EvidenceId,
        operator_id: &OperatorId,
    ) -> Result<EvidenceRecord, ControlPlaneError> {
        let audit = AuditEntry::new(
            self.clock.now(),
            OperationType::EvidenceLifecycle,
            operator_id.clone(),
            "seal_evidence",
            AuditResult::Success,
            "seal evidence",
        )
        .with_target("evidence", evidence_id.as_str());
        let found = self
            .store
            .evidence(evidence_id)
            .map_err(|err| self.storage_failure("seal_evidence", None, &err))?;
        let Some(found) = found else {
            return Err(self.reject(audit, ControlPlaneError::EvidenceNotFound(evidence_id.clone())));
        };
        let audit = match &found.zone_id {
            Some(zone_id) => audit.with_zone(zone_id),
            None => audit,
        };
        let lock_key =
            found.zone_id.as_ref().map_or(GLOBAL_LOCK_KEY, |zone_id| zone_id.as_str()).to_string();
        let handle = self.zone_lock(&lock_key)?;
        let _guard = self.enter(&handle)?;
        let record = self
            .store
            .evidence(evidence_id)
            .map_err(|err| self.storage_failure("seal_evidence", found.zone_id.as_ref(), &err))?
            .unwrap_or(found);
        if !record.snapshot_intact().unwrap_or(false) {
            return Err(self.reject(audit, ControlPlaneError::EvidenceTampered(evidence_id.clone())));
        }
        if record.sealed {
            return Ok(record);
        }
        let now = self.clock.now();
        if record.retention_expired(now) {
            let err = ControlPlaneError::RetentionExpired {
                evidence_id: evidence_id.clone(),
                retention_until: record.retention_until,
            };
            return Err(self.reject(audit, err));
        }
        let audit = audit.with_metadata(json!({"snapshot_hash": record.snapshot_hash}));
        self.commit(
            "seal_evidence",
            record.zone_id.as_ref(),
            LedgerBatch {
                seals: vec![(evidence_id.clone(), now)],
                audit: vec![audit],
                ..LedgerBatch::default()
            },
        )?;
        Ok(record.sealed_at(now))
    }

    // ========================================================================
    // SECTION: Helpers
    // ========================================================================

    /// Fails when the zone is not registered.
    fn require_zone(&self, zone_id: &ZoneId) -> Result<(), ControlPlaneError> {
        if self.zones.contains(zone_id) {
            Ok(())
        } else {
            Err(ControlPlaneError::UnknownZone(zone_id.clone()))
        }
    }

    /// Returns the lock handle for a zone key.
    fn zone_lock(&self, key: &str) -> Result<Arc<Mutex<()>>, ControlPlaneError> {
        self.locks.handle(key).map_err(|_| {
            self.report_infra("zone_lock", None, format!("lock registry poisoned at {key}"));
            ControlPlaneError::StorageUnavailable
        })
    }

    /// Enters a zone's exclusive section.
    fn enter<'a>(&self, handle: &'a Mutex<()>) -> Result<MutexGuard<'a, ()>, ControlPlaneError> {
        handle.lock().map_err(|_| {
            self.report_infra("zone_lock", None, "zone lock poisoned".to_string());
            ControlPlaneError::StorageUnavailable
        })
    }

    /// Loads the latest record of a zone.
    fn load_latest(
        &self,
        operation: &'static str,
        zone_id: &ZoneId,
    ) -> Result<Option<DecisionState>, ControlPlaneError> {
        self.store
            .latest_decision(zone_id)
            .map_err(|err| self.storage_failure(operation, Some(zone_id), &err))
    }

    /// Loads a zone's active mitigations.
    fn load_active_mitigations(
        &self,
        operation: &'static str,
        zone_id: &ZoneId,
    ) -> Result<Vec<Mitigation>, ControlPlaneError> {
        let mitigations = self
            .store
            .zone_mitigations(zone_id)
            .map_err(|err| self.storage_failure(operation, Some(zone_id), &err))?;
        Ok(mitigations.into_iter().filter(|mitigation| mitigation.active).collect())
    }

    /// Builds the next record in a zone's timeline.
    fn next_record(
        &self,
        zone_id: &ZoneId,
        latest: Option<&DecisionState>,
        draft: RecordDraft<'_>,
    ) -> DecisionState {
        let now = self.clock.now();
        let sequence = latest.map_or(1, |record| record.sequence.saturating_add(1));
        DecisionState {
            id: DecisionId::for_zone(zone_id, sequence),
            zone_id: zone_id.clone(),
            sequence,
            current_state: draft.level,
            previous_state: latest.map(|record| record.current_state),
            reason: draft.reason.to_string(),
            origin: draft.origin,
            operator_id: draft.operator_id.clone(),
            created_at: now,
            updated_at: now,
            signal_count: draft.signal_count,
            context_states: draft.context_states,
            breakpoint: draft.breakpoint,
        }
    }

    /// Commits a batch, mapping store failures to caller-safe errors.
    fn commit(
        &self,
        operation: &'static str,
        zone_id: Option<&ZoneId>,
        batch: LedgerBatch,
    ) -> Result<Vec<AuditLog>, ControlPlaneError> {
        self.store.commit(batch).map_err(|err| self.storage_failure(operation, zone_id, &err))
    }

    /// Audits a rejected attempt and returns the error to surface.
    fn reject(&self, entry: AuditEntry, err: ControlPlaneError) -> ControlPlaneError {
        let zone_id = entry.zone_id.clone();
        let mut metadata = match entry.metadata {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("context".to_string(), other);
                map
            }
        };
        metadata.insert("error_kind".to_string(), json!(err.kind()));
        metadata.insert("error".to_string(), json!(err.to_string()));
        let entry = AuditEntry {
            result: AuditResult::Failure,
            metadata: Value::Object(metadata),
            ..entry
        };
        match self.store.commit(LedgerBatch::audit_only(entry)) {
            Ok(_) => err,
            Err(store_err) => self.storage_failure("audit_rejection", zone_id.as_ref(), &store_err),
        }
    }

    /// Publishes the alert notice for a committed record.
    fn publish(&self, record: &DecisionState) {
        let Some(notice) = AlertNotice::for_decision(record, self.config.alert_ttl) else {
            return;
        };
        if let Err(err) = self.alerts.publish(&notice) {
            self.report_infra("publish_alert", Some(&record.zone_id), err.to_string());
        }
    }

    /// Verifies an evidence record's snapshot digest.
    fn verified(&self, record: EvidenceRecord) -> Result<EvidenceRecord, ControlPlaneError> {
        if record.snapshot_intact().unwrap_or(false) {
            Ok(record)
        } else {
            self.report_infra(
                "evidence_integrity",
                record.zone_id.as_ref(),
                format!("snapshot digest mismatch for {}", record.id),
            );
            Err(ControlPlaneError::EvidenceTampered(record.id))
        }
    }

    /// Reports a store failure and maps it to a caller-safe error.
    fn storage_failure(
        &self,
        operation: &'static str,
        zone_id: Option<&ZoneId>,
        err: &StoreError,
    ) -> ControlPlaneError {
        self.report_store_error(operation, zone_id, err);
        match err {
            StoreError::Conflict(message) => ControlPlaneError::Conflict(message.clone()),
            _ => ControlPlaneError::StorageUnavailable,
        }
    }

    /// Reports a store failure to telemetry.
    fn report_store_error(&self, operation: &'static str, zone_id: Option<&ZoneId>, err: &StoreError) {
        self.report_infra(operation, zone_id, err.to_string());
    }

    /// Records an infrastructure failure with detail.
    fn report_infra(&self, operation: &'static str, zone_id: Option<&ZoneId>, detail: String) {
        self.emit(OperationEvent {
            event: INFRASTRUCTURE_EVENT,
            timestamp_ms: self.clock.now().as_unix_millis(),
            operation,
            zone_id: zone_id.map(ToString::to_string),
            outcome: OperationOutcome::Error,
            error_kind: Some("infrastructure"),
            detail: Some(detail),
        });
    }

    /// Records the outcome of a public operation.
    fn observe<T>(
        &self,
        operation: &'static str,
        zone_id: Option<&ZoneId>,
        result: &Result<T, ControlPlaneError>,
    ) {
        let (outcome, error_kind) = match result {
            Ok(_) => (OperationOutcome::Ok, None),
            Err(err) if err.is_infrastructure() => (OperationOutcome::Error, Some(err.kind())),
            Err(err) => (OperationOutcome::Rejected, Some(err.kind())),
        };
        self.emit(OperationEvent {
            event: OPERATION_EVENT,
            timestamp_ms: self.clock.now().as_unix_millis(),
            operation,
            zone_id: zone_id.map(ToString::to_string),
            outcome,
            error_kind,
            detail: None,
        });
    }

    /// Sends an event to the telemetry sink.
    fn emit(&self, event: OperationEvent) {
        self.telemetry.record(&event);
    }
}

// ============================================================================
// SECTION: Free Helpers
// ============================================================================

/// Returns true for empty or whitespace-only text.
fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Validation message for a missing reason.
fn reason_required() -> String {
    "reason is required".to_string()
}

/// Audit metadata describing an appended decision record.
fn transition_metadata(record: &DecisionState, requested: Option<&DecisionId>) -> Value {
    json!({
        "from": record.previous_state,
        "to": record.current_state,
        "sequence": record.sequence,
        "origin": record.origin,
        "requested_decision_id": requested,
    })
}

/// Audit draft for a mitigation activation.
fn mitigation_audit(
    now: Timestamp,
    request: &MitigationRequest,
    breakpoint: Option<&Breakpoint>,
) -> AuditEntry {
    AuditEntry::new(
        now,
        OperationType::DecisionTransition,
        request.operator_id.clone(),
        "activate_mitigation",
        AuditResult::Success,
        request.reason.clone(),
    )
    .with_zone(&request.zone_id)
    .with_target("mitigation", request.measure_type.as_str())
    .with_metadata(json!({
        "measure_type": request.measure_type,
        "trigger_type": request.trigger_type,
        "trigger_condition": request.trigger_condition,
        "breakpoint": breakpoint,
    }))
}
