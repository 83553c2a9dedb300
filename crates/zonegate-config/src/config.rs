// crates/zonegate-config/src/config.rs
// ============================================================================
// Module: Zonegate Configuration
// Description: Configuration loading and validation for zonegate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: zonegate-core, zonegate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a control plane is never
//! built from a partially valid file.
//!
//! Resolution order: explicit path, then `ZONEGATE_CONFIG`, then
//! `./zonegate.toml`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;

use serde::Deserialize;
use thiserror::Error;
use zonegate_core::ComplexityWeights;
use zonegate_core::ControlPlaneConfig;
use zonegate_core::DecisionLevel;
use zonegate_core::EscalationPolicy;
use zonegate_core::MitigationPolicy;
use zonegate_core::NormalizationCaps;
use zonegate_core::PrimeCeilings;
use zonegate_core::RiskModel;
use zonegate_core::ZoneRegistry;
use zonegate_core::risk::DEFAULT_CRITICAL_THRESHOLD;
use zonegate_core::runtime::DEFAULT_ALERT_TTL;
use zonegate_core::runtime::DEFAULT_MAX_SNAPSHOT_BYTES;
use zonegate_store_sqlite::SqliteStoreConfig;
use zonegate_store_sqlite::SqliteStoreMode;
use zonegate_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "zonegate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ZONEGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of seeded zones.
pub const MAX_ZONES: usize = 4096;
/// Tolerance applied when checking that weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;
/// Default evidence retention in days (seven years).
const DEFAULT_RETENTION_DAYS: u64 = 7 * 365;
/// Maximum evidence retention in days.
const MAX_RETENTION_DAYS: u64 = 100 * 365;
/// Maximum accepted evidence snapshot size in bytes.
const MAX_SNAPSHOT_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum alert validity window in seconds (seven days).
const MAX_ALERT_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Default `SQLite` busy timeout in milliseconds.
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum `SQLite` busy timeout in milliseconds.
const MAX_STORE_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Seconds per day.
const SECS_PER_DAY: u64 = 24 * 60 * 60;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Zonegate deployment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ZonegateConfig {
    /// Zone registry seed.
    #[serde(default)]
    pub zones: ZonesConfig,
    /// Risk model and breakpoint policy.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Control plane policy flags.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Evidence ledger limits.
    #[serde(default)]
    pub evidence: EvidenceConfig,
    /// Ledger store backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Operational telemetry sink.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl ZonegateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.zones.validate()?;
        self.risk.validate()?;
        self.policy.validate()?;
        self.evidence.validate()?;
        self.store.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }

    /// Builds the zone registry from the seed list.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed or duplicated zone ids.
    pub fn zone_registry(&self) -> Result<ZoneRegistry, ConfigError> {
        ZoneRegistry::new(self.zones.seed.iter().map(String::as_str))
            .map_err(|err| ConfigError::Invalid(format!("zones.seed: {err}")))
    }

    /// Returns the risk model parameters.
    #[must_use]
    pub const fn risk_model(&self) -> RiskModel {
        RiskModel {
            weights: self.risk.weights,
            caps: self.risk.caps,
            ceilings: self.risk.ceilings,
            critical_threshold: self.risk.critical_threshold,
        }
    }

    /// Returns the control plane policy.
    #[must_use]
    pub const fn control_plane_config(&self) -> ControlPlaneConfig {
        ControlPlaneConfig {
            escalation: self.risk.escalation,
            mitigation: self.risk.mitigation,
            require_operator_ack_after_forced: self.policy.require_operator_ack_after_forced,
            auto_mitigate: self.policy.auto_mitigate,
            default_retention: Duration::from_secs(
                self.evidence.default_retention_days.saturating_mul(SECS_PER_DAY),
            ),
            max_snapshot_bytes: self.evidence.max_snapshot_bytes,
            alert_ttl: Duration::from_secs(self.policy.alert_ttl_secs),
        }
    }
}

// ============================================================================
// SECTION: Zones
// ============================================================================

/// Zone registry seed configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZonesConfig {
    /// Zone identifiers known to the control plane.
    #[serde(default)]
    pub seed: Vec<String>,
}

impl ZonesConfig {
    /// Validates the zone seed list.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.seed.is_empty() {
            return Err(ConfigError::Invalid("zones.seed must list at least one zone".to_string()));
        }
        if self.seed.len() > MAX_ZONES {
            return Err(ConfigError::Invalid(format!("zones.seed exceeds {MAX_ZONES} entries")));
        }
        ZoneRegistry::new(self.seed.iter().map(String::as_str))
            .map(|_| ())
            .map_err(|err| ConfigError::Invalid(format!("zones.seed: {err}")))
    }
}

// ============================================================================
// SECTION: Risk
// ============================================================================

/// Risk model and breakpoint policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Complexity component weights; must sum to one.
    #[serde(default)]
    pub weights: ComplexityWeights,
    /// Complexity normalization caps.
    #[serde(default)]
    pub caps: NormalizationCaps,
    /// Ethical prime ceilings.
    #[serde(default)]
    pub ceilings: PrimeCeilings,
    /// Complexity breakpoint threshold.
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
    /// Level each breakpoint kind forces.
    #[serde(default)]
    pub escalation: EscalationPolicy,
    /// Measure each breakpoint kind activates.
    #[serde(default)]
    pub mitigation: MitigationPolicy,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: ComplexityWeights::default(),
            caps: NormalizationCaps::default(),
            ceilings: PrimeCeilings::default(),
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            escalation: EscalationPolicy::default(),
            mitigation: MitigationPolicy::default(),
        }
    }
}

impl RiskConfig {
    /// Validates risk parameters.
    fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("risk.weights.signal_sources", self.weights.signal_sources),
            ("risk.weights.decision_depth", self.weights.decision_depth),
            ("risk.weights.context_states", self.weights.context_states),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be finite and non-negative"
                )));
            }
        }
        let sum: f64 = weights.iter().map(|(_, value)| value).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid("risk.weights must sum to 1.0".to_string()));
        }
        let caps = [
            ("risk.caps.signal_sources", self.caps.signal_sources),
            ("risk.caps.decision_depth", self.caps.decision_depth),
            ("risk.caps.context_states", self.caps.context_states),
        ];
        for (field, value) in caps {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
            }
        }
        let ceilings = [
            ("risk.ceilings.fn_prime", self.ceilings.fn_prime),
            ("risk.ceilings.fp_prime", self.ceilings.fp_prime),
            ("risk.ceilings.bias_prime", self.ceilings.bias_prime),
            ("risk.ceilings.integrity_prime", self.ceilings.integrity_prime),
            ("risk.critical_threshold", self.critical_threshold),
        ];
        for (field, value) in ceilings {
            validate_unit_interval(field, value)?;
        }
        let escalation = [
            ("risk.escalation.complexity", self.escalation.complexity),
            ("risk.escalation.fn_prime", self.escalation.fn_prime),
            ("risk.escalation.fp_prime", self.escalation.fp_prime),
            ("risk.escalation.bias_prime", self.escalation.bias_prime),
            ("risk.escalation.integrity_prime", self.escalation.integrity_prime),
        ];
        for (field, level) in escalation {
            if !matches!(
                level,
                DecisionLevel::D0 | DecisionLevel::D1 | DecisionLevel::D2 | DecisionLevel::D3
            ) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be an escalation level (D0-D3), got {level}"
                )));
            }
        }
        Ok(())
    }
}

/// Returns the default complexity breakpoint threshold.
const fn default_critical_threshold() -> f64 {
    DEFAULT_CRITICAL_THRESHOLD
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Control plane policy flags.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Block further forced escalation until an operator acknowledges.
    #[serde(default)]
    pub require_operator_ack_after_forced: bool,
    /// Activate mapped mitigations during evaluate-and-decide.
    #[serde(default = "default_auto_mitigate")]
    pub auto_mitigate: bool,
    /// Validity window of published alert notices, in seconds.
    #[serde(default = "default_alert_ttl_secs")]
    pub alert_ttl_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            require_operator_ack_after_forced: false,
            auto_mitigate: default_auto_mitigate(),
            alert_ttl_secs: default_alert_ttl_secs(),
        }
    }
}

impl PolicyConfig {
    /// Validates policy flags.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.alert_ttl_secs == 0 || self.alert_ttl_secs > MAX_ALERT_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "policy.alert_ttl_secs must be between 1 and {MAX_ALERT_TTL_SECS}"
            )));
        }
        Ok(())
    }
}

/// Returns the default auto-mitigation flag.
const fn default_auto_mitigate() -> bool {
    true
}

/// Returns the default alert validity window in seconds.
const fn default_alert_ttl_secs() -> u64 {
    DEFAULT_ALERT_TTL.as_secs()
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

/// Evidence ledger limits.
#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceConfig {
    /// Retention applied when an archive request names none, in days.
    #[serde(default = "default_retention_days")]
    pub default_retention_days: u64,
    /// Maximum canonical snapshot size in bytes.
    #[serde(default = "default_max_snapshot_bytes")]
    pub max_snapshot_bytes: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            default_retention_days: default_retention_days(),
            max_snapshot_bytes: default_max_snapshot_bytes(),
        }
    }
}

impl EvidenceConfig {
    /// Validates evidence limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_retention_days == 0 || self.default_retention_days > MAX_RETENTION_DAYS {
            return Err(ConfigError::Invalid(format!(
                "evidence.default_retention_days must be between 1 and {MAX_RETENTION_DAYS}"
            )));
        }
        if self.max_snapshot_bytes == 0 || self.max_snapshot_bytes > MAX_SNAPSHOT_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "evidence.max_snapshot_bytes must be between 1 and {MAX_SNAPSHOT_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Returns the default evidence retention in days.
const fn default_retention_days() -> u64 {
    DEFAULT_RETENTION_DAYS
}

/// Returns the default snapshot size limit.
const fn default_max_snapshot_bytes() -> usize {
    DEFAULT_MAX_SNAPSHOT_BYTES
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Ledger store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Process-local in-memory ledger.
    #[default]
    Memory,
    /// `SQLite`-backed durable ledger.
    Sqlite,
}

/// Ledger store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
                validate_field_path("store.path", path)?;
                if self.busy_timeout_ms > MAX_STORE_BUSY_TIMEOUT_MS {
                    return Err(ConfigError::Invalid(format!(
                        "store.busy_timeout_ms must be at most {MAX_STORE_BUSY_TIMEOUT_MS}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` store config when the sqlite backend is selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (StoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

/// Returns the default `SQLite` busy timeout.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Telemetry
// ============================================================================

/// Telemetry sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySinkType {
    /// Discard events.
    None,
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: TelemetrySinkType,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Publish alert notices as JSON lines on stderr.
    #[serde(default = "default_publish_alerts")]
    pub alerts: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sink: TelemetrySinkType::default(),
            path: None,
            alerts: default_publish_alerts(),
        }
    }
}

impl TelemetryConfig {
    /// Validates telemetry configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (TelemetrySinkType::File, None) => {
                Err(ConfigError::Invalid("file telemetry requires path".to_string()))
            }
            (TelemetrySinkType::File, Some(path)) => validate_field_path("telemetry.path", path),
            (_, Some(_)) => {
                Err(ConfigError::Invalid("telemetry.path requires the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

/// Returns the default alert publication flag.
const fn default_publish_alerts() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit value, the environment, or the default name.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured file path field against length constraints.
fn validate_field_path(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a value lies in `(0, 1]`.
fn validate_unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(ConfigError::Invalid(format!("{field} must be in (0, 1]")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
