// crates/zonegate-core/tests/common/mod.rs
// =============================================================================
// Module: Control Plane Test Helpers
// Description: Shared fixtures and wrapper stores for control plane tests.
// Purpose: Reduce duplication across integration tests for zonegate-core.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use zonegate_core::AssessmentSnapshot;
use zonegate_core::AuditFilter;
use zonegate_core::AuditLog;
use zonegate_core::AuditPage;
use zonegate_core::ControlPlaneConfig;
use zonegate_core::DecisionId;
use zonegate_core::DecisionLevel;
use zonegate_core::DecisionState;
use zonegate_core::EvidenceFilter;
use zonegate_core::EvidenceId;
use zonegate_core::EvidenceRecord;
use zonegate_core::InMemoryLedgerStore;
use zonegate_core::LedgerBatch;
use zonegate_core::LedgerStore;
use zonegate_core::ManualClock;
use zonegate_core::Mitigation;
use zonegate_core::OperatorId;
use zonegate_core::PreAlertRequest;
use zonegate_core::RiskModel;
use zonegate_core::StoreError;
use zonegate_core::Timestamp;
use zonegate_core::TransitionRequest;
use zonegate_core::ZoneControlPlane;
use zonegate_core::ZoneId;
use zonegate_core::ZoneRegistry;

/// Fixed start time for deterministic ledgers.
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Zones registered by [`control_plane`].
pub const ZONES: [&str; 4] = ["Z1", "Z2", "Z3", "Z4"];

/// Returns the fixture start time.
pub const fn start() -> Timestamp {
    Timestamp::from_unix_millis(START_MILLIS)
}

/// Returns a manual clock frozen at the fixture start time.
pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start()))
}

/// Returns the fixture zone registry.
pub fn registry() -> ZoneRegistry {
    ZoneRegistry::new(ZONES).expect("zone registry")
}

/// Builds a control plane over `store` with default policy.
pub fn control_plane_with<S: LedgerStore>(
    store: S,
    config: ControlPlaneConfig,
    clock: &Arc<ManualClock>,
) -> ZoneControlPlane<S> {
    ZoneControlPlane::new(store, registry(), RiskModel::default(), config).with_clock(clock.clone())
}

/// Builds an in-memory control plane with default policy.
pub fn control_plane() -> (ZoneControlPlane<InMemoryLedgerStore>, Arc<ManualClock>) {
    let clock = clock();
    let plane = control_plane_with(InMemoryLedgerStore::new(), ControlPlaneConfig::default(), &clock);
    (plane, clock)
}

/// Returns an operator identity.
pub fn operator(name: &str) -> OperatorId {
    OperatorId::new(name)
}

/// Builds a pre-alert request.
pub fn pre_alert(zone: &str, reason: &str) -> PreAlertRequest {
    PreAlertRequest {
        zone_id: ZoneId::new(zone),
        reason: reason.to_string(),
        operator_id: operator("op-1"),
        signal_count: None,
        context_states: None,
    }
}

/// Builds an operator transition request.
pub fn transition(decision_id: &DecisionId, target: DecisionLevel, reason: &str) -> TransitionRequest {
    TransitionRequest {
        decision_id: decision_id.clone(),
        target_state: target,
        reason: reason.to_string(),
        operator_id: operator("op-1"),
        signal_count: None,
        context_states: None,
    }
}

/// Returns every audit entry, newest first.
pub fn all_audit<S: LedgerStore>(plane: &ZoneControlPlane<S>) -> Vec<AuditLog> {
    plane.query_audit(&AuditFilter::default()).expect("audit query").logs
}

// ============================================================================
// SECTION: Wrapper Stores
// ============================================================================

/// Store whose audit reads omit chosen sequences, as if deleted out-of-band.
#[derive(Debug, Default, Clone)]
pub struct HidingStore {
    /// Underlying store.
    pub inner: InMemoryLedgerStore,
    /// Audit sequences hidden from reads.
    pub hidden: Arc<Mutex<BTreeSet<u64>>>,
}

impl HidingStore {
    /// Hides an audit sequence from subsequent reads.
    pub fn hide(&self, sequence: u64) {
        self.hidden.lock().expect("hidden set").insert(sequence);
    }

    /// Drops hidden entries from a read.
    fn visible(&self, logs: Vec<AuditLog>) -> Vec<AuditLog> {
        let hidden = self.hidden.lock().expect("hidden set");
        logs.into_iter().filter(|log| !hidden.contains(&log.sequence)).collect()
    }
}

impl LedgerStore for HidingStore {
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
        let page = self.inner.query_audit(filter)?;
        let logs = self.visible(page.logs);
        Ok(AuditPage {
            count: logs.len(),
            logs,
        })
    }

    fn audit_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<AuditLog>, StoreError> {
        Ok(self.visible(self.inner.audit_range(start, end)?))
    }

    fn audit_before(&self, sequence: u64) -> Result<Option<AuditLog>, StoreError> {
        let hidden = self.hidden.lock().expect("hidden set").clone();
        let mut cursor = sequence;
        loop {
            let Some(log) = self.inner.audit_before(cursor)? else {
                return Ok(None);
            };
            if !hidden.contains(&log.sequence) {
                return Ok(Some(log));
            }
            cursor = log.sequence;
        }
    }

    fn commit(&self, batch: LedgerBatch) -> Result<Vec<AuditLog>, StoreError> {
        self.inner.commit(batch)
    }
}

/// Store that serves reads but can be switched to fail every commit.
#[derive(Debug, Default, Clone)]
pub struct FailingStore {
    /// Underlying store.
    pub inner: InMemoryLedgerStore,
    /// When set, commits fail with an I/O error.
    pub failing: Arc<Mutex<bool>>,
}

impl FailingStore {
    /// Toggles commit failures.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("failing flag") = failing;
    }
}

impl LedgerStore for FailingStore {
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
        if *self.failing.lock().expect("failing flag") {
            return Err(StoreError::Io("disk unavailable".to_string()));
        }
        self.inner.commit(batch)
    }
}

/// Store that rewrites evidence snapshots on read.
#[derive(Debug, Default, Clone)]
pub struct TamperingStore {
    /// Underlying store.
    pub inner: InMemoryLedgerStore,
    /// When set, evidence reads return an altered snapshot.
    pub tamper: Arc<Mutex<bool>>,
}

impl TamperingStore {
    /// Toggles snapshot tampering.
    pub fn set_tampering(&self, tamper: bool) {
        *self.tamper.lock().expect("tamper flag") = tamper;
    }

    /// Rewrites the snapshot while tampering is on.
    fn maybe_tamper(&self, mut record: EvidenceRecord) -> EvidenceRecord {
        if *self.tamper.lock().expect("tamper flag") {
            record.snapshot = serde_json::json!({"rewritten": true});
        }
        record
    }
}

impl LedgerStore for TamperingStore {
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
        Ok(self.inner.evidence(evidence_id)?.map(|record| self.maybe_tamper(record)))
    }

    fn list_evidence(&self, filter: &EvidenceFilter) -> Result<Vec<EvidenceRecord>, StoreError> {
        Ok(self
            .inner
            .list_evidence(filter)?
            .into_iter()
            .map(|record| self.maybe_tamper(record))
            .collect())
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
