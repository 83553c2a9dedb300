// crates/zonegate-core/src/runtime/store.rs
// ============================================================================
// Module: Zonegate In-Memory Ledger Store
// Description: Mutex-guarded ledger store for tests and ephemeral deployments.
// Purpose: Provide a deterministic LedgerStore without external dependencies.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryLedgerStore`] keeps every table behind one mutex so that
//! [`LedgerStore::commit`] validates the whole batch before applying any of
//! it. Contents are lost when the process exits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::AssessmentSnapshot;
use crate::core::AuditFilter;
use crate::core::AuditLog;
use crate::core::AuditPage;
use crate::core::DecisionId;
use crate::core::DecisionState;
use crate::core::EvidenceFilter;
use crate::core::EvidenceId;
use crate::core::EvidenceRecord;
use crate::core::Mitigation;
use crate::core::MitigationId;
use crate::core::Timestamp;
use crate::core::ZoneId;
use crate::core::seal_after;
use crate::interfaces::LedgerBatch;
use crate::interfaces::LedgerStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Tables held by the in-memory store.
#[derive(Debug, Default)]
struct LedgerTables {
    /// Decision timelines keyed by zone.
    decisions: BTreeMap<ZoneId, Vec<DecisionState>>,
    /// Decision id to owning zone.
    decision_zones: BTreeMap<DecisionId, ZoneId>,
    /// Mitigations keyed by id.
    mitigations: BTreeMap<MitigationId, Mitigation>,
    /// Evidence keyed by id.
    evidence: BTreeMap<EvidenceId, EvidenceRecord>,
    /// Audit chain in sequence order.
    audit: Vec<AuditLog>,
    /// Latest assessment per zone.
    assessments: BTreeMap<ZoneId, AssessmentSnapshot>,
}

/// In-memory ledger store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    /// Ledger tables protected by a mutex.
    tables: Arc<Mutex<LedgerTables>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty in-memory ledger store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the ledger tables.
    fn lock(&self) -> Result<MutexGuard<'_, LedgerTables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Store("ledger store mutex poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn latest_decision(&self, zone_id: &ZoneId) -> Result<Option<DecisionState>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.decisions.get(zone_id).and_then(|timeline| timeline.last()).cloned())
    }

    fn decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionState>, StoreError> {
        let tables = self.lock()?;
        let Some(zone_id) = tables.decision_zones.get(decision_id) else {
            return Ok(None);
        };
        Ok(tables
            .decisions
            .get(zone_id)
            .and_then(|timeline| timeline.iter().find(|record| &record.id == decision_id))
            .cloned())
    }

    fn decision_history(&self, zone_id: &ZoneId) -> Result<Vec<DecisionState>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.decisions.get(zone_id).cloned().unwrap_or_default())
    }

    fn zone_mitigations(&self, zone_id: &ZoneId) -> Result<Vec<Mitigation>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .mitigations
            .values()
            .filter(|mitigation| &mitigation.zone_id == zone_id)
            .cloned()
            .collect())
    }

    fn latest_assessment(&self, zone_id: &ZoneId) -> Result<Option<AssessmentSnapshot>, StoreError> {
        Ok(self.lock()?.assessments.get(zone_id).cloned())
    }

    fn evidence(&self, evidence_id: &EvidenceId) -> Result<Option<EvidenceRecord>, StoreError> {
        Ok(self.lock()?.evidence.get(evidence_id).cloned())
    }

    fn list_evidence(&self, filter: &EvidenceFilter) -> Result<Vec<EvidenceRecord>, StoreError> {
        let tables = self.lock()?;
        let mut matched: Vec<&EvidenceRecord> =
            tables.evidence.values().filter(|record| filter.matches(record)).collect();
        matched.sort_by(|left, right| {
            left.archived_at.cmp(&right.archived_at).then_with(|| left.id.cmp(&right.id))
        });
        Ok(matched
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn query_audit(&self, filter: &AuditFilter) -> Result<AuditPage, StoreError> {
        Ok(filter.select(&self.lock()?.audit))
    }

    fn audit_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<AuditLog>, StoreError> {
        let tables = self.lock()?;
        let in_window = |log: &AuditLog| log.entry.timestamp >= start && log.entry.timestamp < end;
        let (Some(first), Some(last)) =
            (tables.audit.iter().position(in_window), tables.audit.iter().rposition(in_window))
        else {
            return Ok(Vec::new());
        };
        Ok(tables.audit[first..=last].to_vec())
    }

    fn audit_before(&self, sequence: u64) -> Result<Option<AuditLog>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.audit.iter().rev().find(|log| log.sequence < sequence).cloned())
    }

    fn commit(&self, batch: LedgerBatch) -> Result<Vec<AuditLog>, StoreError> {
        let mut tables = self.lock()?;

        if let Some(decision) = &batch.decision {
            let latest = tables
                .decisions
                .get(&decision.zone_id)
                .and_then(|timeline| timeline.last())
                .map_or(0, |record| record.sequence);
            if decision.sequence != latest + 1 {
                return Err(StoreError::Conflict(format!(
                    "zone {} is at sequence {latest}, batch expects {}",
                    decision.zone_id,
                    decision.sequence.saturating_sub(1)
                )));
            }
            if tables.decision_zones.contains_key(&decision.id) {
                return Err(StoreError::Conflict(format!("decision {} already exists", decision.id)));
            }
        }
        for record in &batch.evidence {
            if tables.evidence.contains_key(&record.id) {
                return Err(StoreError::Conflict(format!("evidence {} already exists", record.id)));
            }
        }
        for (evidence_id, _) in &batch.seals {
            let known = tables.evidence.contains_key(evidence_id)
                || batch.evidence.iter().any(|record| &record.id == evidence_id);
            if !known {
                return Err(StoreError::Invalid(format!("evidence {evidence_id} not found")));
            }
        }
        let sealed = seal_after(tables.audit.last(), batch.audit)
            .map_err(|err| StoreError::Invalid(err.to_string()))?;

        if let Some(decision) = batch.decision {
            tables.decision_zones.insert(decision.id.clone(), decision.zone_id.clone());
            tables.decisions.entry(decision.zone_id.clone()).or_default().push(decision);
        }
        for mitigation in batch.mitigations {
            tables.mitigations.insert(mitigation.id.clone(), mitigation);
        }
        for record in batch.evidence {
            tables.evidence.insert(record.id.clone(), record);
        }
        for (evidence_id, at) in batch.seals {
            if let Some(record) = tables.evidence.get_mut(&evidence_id)
                && !record.sealed
            {
                *record = record.sealed_at(at);
            }
        }
        if let Some(snapshot) = batch.assessment {
            tables.assessments.insert(snapshot.assessment.zone_id.clone(), snapshot);
        }
        tables.audit.extend(sealed.iter().cloned());
        drop(tables);
        Ok(sealed)
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared ledger store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedLedgerStore {
    /// Inner store implementation.
    inner: Arc<dyn LedgerStore>,
}

impl SharedLedgerStore {
    /// Wraps a ledger store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl LedgerStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl LedgerStore for SharedLedgerStore {
    fn latest_decision(&self, zone_id: &ZoneId) -> Result<Option<DecisionState>, StoreError> {
        self.inner.latest_decision(zone_id)
    }

    fn decision(&self, decision_id: &DecisionId) -> Result<Option<DecisionState>, StoreError> {
        self.inner.decision(decision_id)
    }

    fn decision_history(&self, zone_id: &ZoneId) -> Result<Vec<DecisionState>, StoreError> {
        self.inner.decision_history(zone_id)
    }

    fn zone_mitigations(&self, zone_id: &ZoneId) -> Result<Vec<Mitigation>, StoreError> {
        self.inner.zone_mitigations(zone_id)
    }

    fn latest_assessment(&self, zone_id: &ZoneId) -> Result<Option<AssessmentSnapshot>, StoreError> {
        self.inner.latest_assessment(zone_id)
    }

    fn evidence(&self, evidence_id: &EvidenceId) -> Result<Option<EvidenceRecord>, StoreError> {
        self.inner.evidence(evidence_id)
    }

    fn list_evidence(&self, filter: &EvidenceFilter) -> Result<Vec<EvidenceRecord>, StoreError> {
        self.inner.list_evidence(filter)
    }

    fn query_audit(&self, filter: &AuditFilter) -> Result<AuditPage, StoreError> {
        self.inner.query_audit(filter)
    }

    fn audit_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<AuditLog>, StoreError> {
        self.inner.audit_range(start, end)
    }

    fn audit_before(&self, sequence: u64) -> Result<Option<AuditLog>, StoreError> {
        self.inner.audit_before(sequence)
    }

    fn commit(&self, batch: LedgerBatch) -> Result<Vec<AuditLog>, StoreError> {
        self.inner.commit(batch)
    }
}
