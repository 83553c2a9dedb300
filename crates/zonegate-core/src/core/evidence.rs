// crates/zonegate-core/src/core/evidence.rs
// ============================================================================
// Module: Zonegate Evidence Records
// Description: Retained, sealable snapshots of decisions and mitigations.
// Purpose: Preserve point-in-time state for compliance review.
// Dependencies: serde, serde_json, crate::core::{hashing, identifiers, time}
// ============================================================================

//! ## Overview
//! An [`EvidenceRecord`] holds an opaque JSON snapshot together with the
//! SHA-256 digest of its canonical form. The digest is checked on every read
//! so silent edits to stored snapshots are detected.
//!
//! Evidence identity is derived from `(evidence_type, related_id)`, which
//! makes archiving idempotent: archiving the same subject twice yields the
//! same record.
//!
//! # Invariants
//! - `sealed` only moves from `false` to `true`.
//! - A sealed record's snapshot never changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ZoneId;
use crate::core::time::Timestamp;
use crate::core::time::days;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Evidence type used for decision state snapshots.
pub const DECISION_STATE_EVIDENCE: &str = "decision_state";

/// Default retention period (seven years).
pub const DEFAULT_RETENTION: Duration = days(7 * 365);

/// Number of hex digits of the subject digest used in evidence ids.
const EVIDENCE_ID_DIGITS: usize = 24;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Archived snapshot with retention and sealing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Evidence identifier.
    pub id: EvidenceId,
    /// Kind of subject, e.g. `decision_state`.
    pub evidence_type: String,
    /// Identifier of the snapshotted subject.
    pub related_id: String,
    /// Zone of the subject, when zone-scoped.
    pub zone_id: Option<ZoneId>,
    /// Opaque snapshot payload.
    pub snapshot: Value,
    /// Digest of the canonical snapshot.
    pub snapshot_hash: HashDigest,
    /// Archive time.
    pub archived_at: Timestamp,
    /// Archiving operator.
    pub archived_by: OperatorId,
    /// End of the retention window.
    pub retention_until: Timestamp,
    /// True once sealed.
    pub sealed: bool,
    /// Seal time.
    pub sealed_at: Option<Timestamp>,
}

impl EvidenceRecord {
    /// Builds an unsealed record for a new archive request.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the snapshot cannot be canonicalized.
    pub fn archive(request: ArchiveRequest, archived_at: Timestamp) -> Result<Self, HashError> {
        let id = evidence_id_for(&request.evidence_type, &request.related_id)?;
        let snapshot_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &request.snapshot)?;
        let retention = request.retention.unwrap_or(DEFAULT_RETENTION);
        Ok(Self {
            id,
            evidence_type: request.evidence_type,
            related_id: request.related_id,
            zone_id: request.zone_id,
            snapshot: request.snapshot,
            snapshot_hash,
            archived_at,
            archived_by: request.archived_by,
            retention_until: archived_at.saturating_add(retention),
            sealed: false,
            sealed_at: None,
        })
    }

    /// Returns true when the stored snapshot still matches its digest.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the snapshot cannot be canonicalized.
    pub fn snapshot_intact(&self) -> Result<bool, HashError> {
        let digest = hash_canonical_json(self.snapshot_hash.algorithm, &self.snapshot)?;
        Ok(digest == self.snapshot_hash)
    }

    /// Returns true when `now` is past the retention window.
    #[must_use]
    pub fn retention_expired(&self, now: Timestamp) -> bool {
        now > self.retention_until
    }

    /// Returns a sealed copy of this record.
    #[must_use]
    pub fn sealed_at(&self, at: Timestamp) -> Self {
        Self {
            sealed: true,
            sealed_at: Some(at),
            ..self.clone()
        }
    }
}

/// Derives the evidence identifier for a subject.
///
/// # Errors
///
/// Returns [`HashError`] when the subject cannot be canonicalized.
pub fn evidence_id_for(evidence_type: &str, related_id: &str) -> Result<EvidenceId, HashError> {
    let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &[evidence_type, related_id])?;
    let prefix = digest.value.get(..EVIDENCE_ID_DIGITS).unwrap_or(&digest.value);
    Ok(EvidenceId::new(format!("evd-{prefix}")))
}

// ============================================================================
// SECTION: Requests and Filters
// ============================================================================

/// Request to archive a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRequest {
    /// Kind of subject.
    pub evidence_type: String,
    /// Identifier of the subject.
    pub related_id: String,
    /// Zone of the subject.
    pub zone_id: Option<ZoneId>,
    /// Snapshot payload.
    pub snapshot: Value,
    /// Archiving operator.
    pub archived_by: OperatorId,
    /// Retention period; the configured default applies when absent.
    pub retention: Option<Duration>,
}

/// Evidence listing filters; every present field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceFilter {
    /// Kind of subject.
    pub evidence_type: Option<String>,
    /// Identifier of the subject.
    pub related_id: Option<String>,
    /// Zone of the subject.
    pub zone_id: Option<ZoneId>,
    /// Sealing state.
    pub sealed: Option<bool>,
    /// Inclusive lower bound on `archived_at`.
    pub start_time: Option<Timestamp>,
    /// Exclusive upper bound on `archived_at`.
    pub end_time: Option<Timestamp>,
    /// Maximum records returned.
    pub limit: Option<usize>,
    /// Records skipped before the first returned.
    pub offset: usize,
}

impl EvidenceFilter {
    /// Returns true when `record` satisfies every present filter field.
    #[must_use]
    pub fn matches(&self, record: &EvidenceRecord) -> bool {
        self.evidence_type.as_ref().is_none_or(|value| &record.evidence_type == value)
            && self.related_id.as_ref().is_none_or(|value| &record.related_id == value)
            && self.zone_id.as_ref().is_none_or(|value| record.zone_id.as_ref() == Some(value))
            && self.sealed.is_none_or(|value| record.sealed == value)
            && self.start_time.is_none_or(|start| record.archived_at >= start)
            && self.end_time.is_none_or(|end| record.archived_at < end)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
