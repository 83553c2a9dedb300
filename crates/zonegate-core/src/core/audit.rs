// crates/zonegate-core/src/core/audit.rs
// ============================================================================
// Module: Zonegate Audit Ledger Types
// Description: Hash-chained audit entries, query filters, and integrity reports.
// Purpose: Provide the tamper-evident record of every consequential action.
// Dependencies: serde, serde_json, crate::core::{hashing, identifiers, time}
// ============================================================================

//! ## Overview
//! Callers submit [`AuditEntry`] drafts; the ledger store assigns the next
//! sequence number and seals the draft into an [`AuditLog`] whose `hash`
//! covers the canonical entry body and the previous entry's hash. The first
//! entry links to [`GENESIS_HASH`].
//!
//! [`verify_chain`] recomputes every link in an ordered slice and reports
//! hash mismatches, broken links, and sequence gaps. A gap or broken link is
//! how out-of-band deletion shows up.
//!
//! Security posture: audit rows are append-only; verification results are
//! data, never errors, because they describe history rather than the call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::GENESIS_HASH;
use crate::core::hashing::HashError;
use crate::core::hashing::chain_digest;
use crate::core::identifiers::AuditId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ZoneId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Category of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Read access to zone data.
    DataAccess,
    /// Decision or mitigation change.
    DecisionTransition,
    /// Configuration or maintenance action.
    SystemConfig,
    /// Evidence archive or seal.
    EvidenceLifecycle,
}

impl OperationType {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataAccess => "data_access",
            Self::DecisionTransition => "decision_transition",
            Self::SystemConfig => "system_config",
            Self::EvidenceLifecycle => "evidence_lifecycle",
        }
    }
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    /// Operation applied.
    Success,
    /// Operation rejected by a domain rule or validation.
    Failure,
    /// Operation failed on infrastructure.
    Error,
}

impl AuditResult {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Audit entry draft, before the ledger assigns its chain position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Time the operation was attempted.
    pub timestamp: Timestamp,
    /// Operation category.
    pub operation_type: OperationType,
    /// Acting operator.
    pub operator_id: OperatorId,
    /// Zone affected, when zone-scoped.
    pub zone_id: Option<ZoneId>,
    /// Kind of target record.
    pub target_type: Option<String>,
    /// Target record identifier.
    pub target_id: Option<String>,
    /// Action name.
    pub action: String,
    /// Outcome.
    pub result: AuditResult,
    /// Explanation.
    pub reason: String,
    /// Opaque structured detail.
    pub metadata: Value,
}

impl AuditEntry {
    /// Creates a draft with no zone, target, or metadata.
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        operation_type: OperationType,
        operator_id: OperatorId,
        action: impl Into<String>,
        result: AuditResult,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            operation_type,
            operator_id,
            zone_id: None,
            target_type: None,
            target_id: None,
            action: action.into(),
            result,
            reason: reason.into(),
            metadata: Value::Null,
        }
    }

    /// Sets the affected zone.
    #[must_use]
    pub fn with_zone(mut self, zone_id: &ZoneId) -> Self {
        self.zone_id = Some(zone_id.clone());
        self
    }

    /// Sets the target record.
    #[must_use]
    pub fn with_target(mut self, target_type: &str, target_id: impl Into<String>) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = Some(target_id.into());
        self
    }

    /// Sets the metadata payload.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Sealed, chained audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Entry identifier.
    pub id: AuditId,
    /// Position in the chain, starting at 1.
    pub sequence: u64,
    /// Entry body.
    #[serde(flatten)]
    pub entry: AuditEntry,
    /// Hash of the preceding entry, or [`GENESIS_HASH`].
    pub previous_hash: String,
    /// Hash over `previous_hash` and the canonical body.
    pub hash: String,
}

/// Hashed portion of an audit log entry.
#[derive(Serialize)]
struct AuditHashBody<'a> {
    /// Entry identifier.
    id: &'a AuditId,
    /// Chain position.
    sequence: u64,
    /// Entry body.
    #[serde(flatten)]
    entry: &'a AuditEntry,
}

impl AuditLog {
    /// Seals a draft at the given chain position.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the entry cannot be canonicalized.
    pub fn seal(entry: AuditEntry, sequence: u64, previous_hash: &str) -> Result<Self, HashError> {
        let id = AuditId::from_sequence(sequence);
        let body = AuditHashBody {
            id: &id,
            sequence,
            entry: &entry,
        };
        let hash = chain_digest(previous_hash, &body)?;
        Ok(Self {
            id,
            sequence,
            entry,
            previous_hash: previous_hash.to_string(),
            hash: hash.value,
        })
    }

    /// Recomputes this entry's hash from its stored fields.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the entry cannot be canonicalized.
    pub fn recompute_hash(&self) -> Result<String, HashError> {
        let body = AuditHashBody {
            id: &self.id,
            sequence: self.sequence,
            entry: &self.entry,
        };
        Ok(chain_digest(&self.previous_hash, &body)?.value)
    }
}

/// Seals drafts in order after `tail`, returning the new entries.
///
/// # Errors
///
/// Returns [`HashError`] when an entry cannot be canonicalized.
pub fn seal_after(
    tail: Option<&AuditLog>,
    drafts: Vec<AuditEntry>,
) -> Result<Vec<AuditLog>, HashError> {
    let mut sequence = tail.map_or(0, |log| log.sequence);
    let mut previous = tail.map_or_else(|| GENESIS_HASH.to_string(), |log| log.hash.clone());
    let mut sealed = Vec::with_capacity(drafts.len());
    for draft in drafts {
        sequence += 1;
        let log = AuditLog::seal(draft, sequence, &previous)?;
        previous.clone_from(&log.hash);
        sealed.push(log);
    }
    Ok(sealed)
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Audit query filters; every present field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    /// Operation category.
    pub operation_type: Option<OperationType>,
    /// Acting operator.
    pub operator_id: Option<OperatorId>,
    /// Affected zone.
    pub zone_id: Option<ZoneId>,
    /// Target record kind.
    pub target_type: Option<String>,
    /// Target record identifier.
    pub target_id: Option<String>,
    /// Action name.
    pub action: Option<String>,
    /// Outcome.
    pub result: Option<AuditResult>,
    /// Inclusive lower time bound.
    pub start_time: Option<Timestamp>,
    /// Exclusive upper time bound.
    pub end_time: Option<Timestamp>,
    /// Maximum entries returned.
    pub limit: Option<usize>,
    /// Entries skipped before the first returned.
    pub offset: usize,
}

impl AuditFilter {
    /// Returns true when `log` satisfies every present filter field.
    #[must_use]
    pub fn matches(&self, log: &AuditLog) -> bool {
        let entry = &log.entry;
        self.operation_type.is_none_or(|value| entry.operation_type == value)
            && self.operator_id.as_ref().is_none_or(|value| &entry.operator_id == value)
            && self.zone_id.as_ref().is_none_or(|value| entry.zone_id.as_ref() == Some(value))
            && self.target_type.as_ref().is_none_or(|value| entry.target_type.as_ref() == Some(value))
            && self.target_id.as_ref().is_none_or(|value| entry.target_id.as_ref() == Some(value))
            && self.action.as_ref().is_none_or(|value| &entry.action == value)
            && self.result.is_none_or(|value| entry.result == value)
            && self.start_time.is_none_or(|start| entry.timestamp >= start)
            && self.end_time.is_none_or(|end| entry.timestamp < end)
    }

    /// Filters, orders newest first, and paginates `logs`.
    #[must_use]
    pub fn select<'a>(&self, logs: impl IntoIterator<Item = &'a AuditLog>) -> AuditPage {
        let mut matched: Vec<&AuditLog> = logs.into_iter().filter(|log| self.matches(log)).collect();
        matched.sort_by(|left, right| {
            right
                .entry
                .timestamp
                .cmp(&left.entry.timestamp)
                .then_with(|| right.sequence.cmp(&left.sequence))
        });
        let count = matched.len();
        let logs = matched
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        AuditPage {
            logs,
            count,
        }
    }
}

/// One page of audit query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    /// Matching entries, newest first.
    pub logs: Vec<AuditLog>,
    /// Total matches before pagination.
    pub count: usize,
}

// ============================================================================
// SECTION: Integrity Verification
// ============================================================================

/// Kind of chain defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Stored hash does not match the recomputed hash.
    HashMismatch,
    /// `previous_hash` does not match the preceding entry's hash.
    ChainBreak,
    /// Sequence numbers are not consecutive.
    SequenceGap,
}

/// A single chain defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    /// Defect kind.
    pub kind: ViolationKind,
    /// Entry at which the defect was observed.
    pub audit_id: AuditId,
    /// Sequence of that entry.
    pub sequence: u64,
    /// Zero-based index of that entry within the verified range.
    pub position: usize,
    /// Description of the defect.
    pub message: String,
}

/// Result of verifying the audit chain over a time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// True when no violations were found.
    pub ok: bool,
    /// Inclusive range start.
    pub start_time: Timestamp,
    /// Exclusive range end.
    pub end_time: Timestamp,
    /// Entries verified.
    pub total: usize,
    /// Entries without violations.
    pub valid: usize,
    /// Entries with at least one violation.
    pub invalid: usize,
    /// Violations in chain order.
    pub violations: Vec<IntegrityViolation>,
    /// Position of the first defective entry.
    pub first_break: Option<usize>,
}

/// Verifies an ascending slice of audit entries.
///
/// `anchor` is the entry immediately preceding the range (if any), so the
/// first in-range link is checked as well.
#[must_use]
pub fn verify_chain(
    entries: &[AuditLog],
    anchor: Option<&AuditLog>,
    start_time: Timestamp,
    end_time: Timestamp,
) -> IntegrityReport {
    let mut violations = Vec::new();
    let mut invalid = 0;
    let mut previous = anchor;
    for (position, entry) in entries.iter().enumerate() {
        let before = violations.len();
        let mut flag = |kind: ViolationKind, message: String| {
            violations.push(IntegrityViolation {
                kind,
                audit_id: entry.id.clone(),
                sequence: entry.sequence,
                position,
                message,
            });
        };
        match entry.recompute_hash() {
            Ok(hash) if hash == entry.hash => {}
            Ok(hash) => flag(
                ViolationKind::HashMismatch,
                format!("stored hash {} does not match recomputed {hash}", entry.hash),
            ),
            Err(err) => flag(ViolationKind::HashMismatch, err.to_string()),
        }
        let expected_link = previous.map_or(GENESIS_HASH, |log| log.hash.as_str());
        if entry.previous_hash != expected_link {
            flag(
                ViolationKind::ChainBreak,
                format!("previous_hash {} does not link to {expected_link}", entry.previous_hash),
            );
        }
        let expected_sequence = previous.map_or(1, |log| log.sequence + 1);
        if entry.sequence != expected_sequence {
            flag(
                ViolationKind::SequenceGap,
                format!("expected sequence {expected_sequence}, found {}", entry.sequence),
            );
        }
        if violations.len() > before {
            invalid += 1;
        }
        previous = Some(entry);
    }
    let first_break = violations.first().map(|violation| violation.position);
    IntegrityReport {
        ok: violations.is_empty(),
        start_time,
        end_time,
        total: entries.len(),
        valid: entries.len() - invalid,
        invalid,
        violations,
        first_break,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
