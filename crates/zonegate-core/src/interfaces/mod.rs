// crates/zonegate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Zonegate Interfaces
// Description: Backend-agnostic seams for storage, alerts, telemetry, and time.
// Purpose: Keep the control plane independent of persistence and transport.
// Dependencies: serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! The control plane depends only on these traits. Storage is a single
//! [`LedgerStore`] whose [`LedgerStore::commit`] applies a [`LedgerBatch`]
//! atomically, so a state change and its audit entries become durable
//! together or not at all.
//!
//! Security posture: store implementations must treat their contents as
//! untrusted on read and report corruption instead of repairing it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::AlertNotice;
use crate::core::AssessmentSnapshot;
use crate::core::AuditEntry;
use crate::core::AuditFilter;
use crate::core::AuditLog;
use crate::core::AuditPage;
use crate::core::DecisionId;
use crate::core::DecisionState;
use crate::core::EvidenceFilter;
use crate::core::EvidenceId;
use crate::core::EvidenceRecord;
use crate::core::Mitigation;
use crate::core::Timestamp;
use crate::core::ZoneId;

// ============================================================================
// SECTION: Ledger Store
// ============================================================================

/// Ledger store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store I/O error.
    #[error("ledger store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("ledger store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("ledger store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("ledger store invalid data: {0}")]
    Invalid(String),
    /// A concurrent writer changed the records this batch was built on.
    #[error("ledger store conflict: {0}")]
    Conflict(String),
    /// Store reported an error.
    #[error("ledger store error: {0}")]
    Store(String),
}

/// Set of writes applied atomically by [`LedgerStore::commit`].
///
/// # Invariants
/// - `decision`, when present, has `sequence` one past the zone's latest.
/// - `audit` drafts are sealed in order after the current chain tail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerBatch {
    /// Decision record to append.
    pub decision: Option<DecisionState>,
    /// Mitigations to insert or replace by id.
    pub mitigations: Vec<Mitigation>,
    /// Evidence records to insert.
    pub evidence: Vec<EvidenceRecord>,
    /// Evidence records to seal, with the seal time.
    pub seals: Vec<(EvidenceId, Timestamp)>,
    /// Audit drafts to seal and append.
    pub audit: Vec<AuditEntry>,
    /// Evaluation replacing the zone's recorded assessment.
    pub assessment: Option<AssessmentSnapshot>,
}

impl LedgerBatch {
    /// Creates a batch holding a single audit draft.
    #[must_use]
    pub fn audit_only(entry: AuditEntry) -> Self {
        Self {
            audit: vec![entry],
            ..Self::default()
        }
    }
}

/// Durable ledger of decisions, mitigations, evidence, and audit entries.
pub trait LedgerStore: Send + Sync {
    /// Loads the latest decision record of a zone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn latest_decision(&self, zone_id: &ZoneId) -> Result<Option<DecisionState>, StoreError>;

    /// Loads a decision record by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionState>, StoreError>;

    /// Loads a zone's decision timeline in ascending sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn decision_history(&self, zone_id: &ZoneId) -> Result<Vec<DecisionState>, StoreError>;

    /// Loads every mitigation of a zone, active or not, in activation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn zone_mitigations(&self, zone_id: &ZoneId) -> Result<Vec<Mitigation>, StoreError>;

    /// Loads the latest recorded risk assessment of a zone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn latest_assessment(&self, zone_id: &ZoneId) -> Result<Option<AssessmentSnapshot>, StoreError>;

    /// Loads an evidence record by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn evidence(&self, evidence_id: &EvidenceId) -> Result<Option<EvidenceRecord>, StoreError>;

    /// Lists evidence records matching a filter, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list_evidence(&self, filter: &EvidenceFilter) -> Result<Vec<EvidenceRecord>, StoreError>;

    /// Queries audit entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn query_audit(&self, filter: &AuditFilter) -> Result<AuditPage, StoreError>;

    /// Loads the contiguous chain span covering audit entries with timestamps
    /// in `[start, end)`, in sequence order.
    ///
    /// The span runs from the lowest to the highest in-window sequence and
    /// includes every entry between them, whatever its timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn audit_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<AuditLog>, StoreError>;

    /// Loads the last audit entry with a sequence below `sequence`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn audit_before(&self, sequence: u64) -> Result<Option<AuditLog>, StoreError>;

    /// Applies a batch atomically and returns the sealed audit entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the batch cannot be applied; nothing is
    /// written in that case.
    fn commit(&self, batch: LedgerBatch) -> Result<Vec<AuditLog>, StoreError>;
}

// ============================================================================
// SECTION: Alert Sink
// ============================================================================

/// Alert publication errors.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Publication failed.
    #[error("alert publication failed: {0}")]
    Publish(String),
}

/// Receiver of alert notices for public dissemination.
pub trait AlertSink: Send + Sync {
    /// Publishes a notice.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError`] when publication fails.
    fn publish(&self, notice: &AlertNotice) -> Result<(), AlertError>;
}

// ============================================================================
// SECTION: Telemetry
// ============================================================================

/// Outcome of a control plane operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationOutcome {
    /// Operation applied or read succeeded.
    Ok,
    /// Operation rejected by a domain rule or validation.
    Rejected,
    /// Operation failed on infrastructure.
    Error,
}

/// Structured operational event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationEvent {
    /// Event name.
    pub event: &'static str,
    /// Event time in Unix milliseconds.
    pub timestamp_ms: i64,
    /// Operation name.
    pub operation: &'static str,
    /// Zone, when zone-scoped.
    pub zone_id: Option<String>,
    /// Outcome.
    pub outcome: OperationOutcome,
    /// Stable error kind label.
    pub error_kind: Option<&'static str>,
    /// Error detail for operators; never includes snapshot payloads.
    pub detail: Option<String>,
}

/// Receiver of operational events.
pub trait TelemetrySink: Send + Sync {
    /// Records an event. Recording never fails the calling operation.
    fn record(&self, event: &OperationEvent);
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of timestamps for ledger records.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
