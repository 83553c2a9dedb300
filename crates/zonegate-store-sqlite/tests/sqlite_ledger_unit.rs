// crates/zonegate-store-sqlite/tests/sqlite_ledger_unit.rs
// ============================================================================
// Module: SQLite Ledger Integrity Unit Tests
// Description: Targeted integrity tests for the SQLite ledger store.
// Purpose: Validate path safety, schema versioning, append-only triggers,
//          corruption detection, and chain verification over durable rows.
// ============================================================================

//! ## Overview
//! Unit-level tests for `SQLite` ledger invariants:
//! - Path safety checks and schema version validation
//! - Durability of decisions, mitigations, and evidence across reopen
//! - Append-only and sealed-row triggers
//! - Digest verification on load
//! - Chain verification after an out-of-band deletion

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::params;
use serde_json::json;
use tempfile::TempDir;
use zonegate_core::ArchiveRequest;
use zonegate_core::AuditEntry;
use zonegate_core::AuditFilter;
use zonegate_core::AuditResult;
use zonegate_core::ControlPlaneConfig;
use zonegate_core::DecisionId;
use zonegate_core::DecisionLevel;
use zonegate_core::DecisionState;
use zonegate_core::LedgerBatch;
use zonegate_core::LedgerStore;
use zonegate_core::ManualClock;
use zonegate_core::MeasureType;
use zonegate_core::MitigationRequest;
use zonegate_core::OperationType;
use zonegate_core::OperatorId;
use zonegate_core::PreAlertRequest;
use zonegate_core::RiskModel;
use zonegate_core::StoreError;
use zonegate_core::Timestamp;
use zonegate_core::TransitionOrigin;
use zonegate_core::TransitionRequest;
use zonegate_core::TriggerType;
use zonegate_core::ViolationKind;
use zonegate_core::ZoneControlPlane;
use zonegate_core::ZoneId;
use zonegate_core::ZoneRegistry;
use zonegate_store_sqlite::SqliteLedgerStore;
use zonegate_store_sqlite::SqliteStoreConfig;
use zonegate_store_sqlite::SqliteStoreError;
use zonegate_store_sqlite::SqliteStoreMode;
use zonegate_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fixed start time for deterministic timestamps.
const START_MILLIS: i64 = 1_700_000_000_000;

/// Opens a WAL-mode store at `path`.
fn store_for(path: &Path) -> SqliteLedgerStore {
    SqliteLedgerStore::new(SqliteStoreConfig {
        path: path.to_path_buf(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Normal,
    })
    .expect("open store")
}

/// Builds a control plane over a `SQLite` store.
fn plane_for(
    store: SqliteLedgerStore,
    clock: &Arc<ManualClock>,
) -> ZoneControlPlane<SqliteLedgerStore> {
    let zones = ZoneRegistry::new(["Z1", "Z2", "Z3"]).expect("zones");
    ZoneControlPlane::new(store, zones, RiskModel::default(), ControlPlaneConfig::default())
        .with_clock(clock.clone())
}

/// Manual clock pinned to the fixture start.
fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Timestamp::from_unix_millis(START_MILLIS)))
}

/// Pre-alert request for `zone`.
fn pre_alert(zone: &str) -> PreAlertRequest {
    PreAlertRequest {
        zone_id: ZoneId::new(zone),
        reason: "unusual signal cluster".to_string(),
        operator_id: OperatorId::new("op-1"),
        signal_count: Some(7),
        context_states: None,
    }
}

/// Operator transition request.
fn transition(decision_id: &DecisionId, target: DecisionLevel) -> TransitionRequest {
    TransitionRequest {
        decision_id: decision_id.clone(),
        target_state: target,
        reason: "operator decision".to_string(),
        operator_id: OperatorId::new("op-1"),
        signal_count: None,
        context_states: None,
    }
}

/// Minimal decision record for direct store writes.
fn record(zone: &str, sequence: u64, level: DecisionLevel) -> DecisionState {
    let zone_id = ZoneId::new(zone);
    let at = Timestamp::from_unix_millis(START_MILLIS);
    DecisionState {
        id: DecisionId::for_zone(&zone_id, sequence),
        zone_id,
        sequence,
        current_state: level,
        previous_state: None,
        reason: "seed".to_string(),
        origin: TransitionOrigin::Operator,
        operator_id: OperatorId::new("op-1"),
        created_at: at,
        updated_at: at,
        signal_count: None,
        context_states: None,
        breakpoint: None,
    }
}

/// Upper bound covering every fixture timestamp.
fn far_future() -> Timestamp {
    Timestamp::from_unix_millis(START_MILLIS + 3_600_000)
}

// ============================================================================
// SECTION: Path and Schema
// ============================================================================

#[test]
fn sqlite_store_rejects_directory_path() {
    let dir = TempDir::new().expect("tempdir");
    let result = SqliteLedgerStore::new(SqliteStoreConfig::for_path(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_empty_path() {
    let result = SqliteLedgerStore::new(SqliteStoreConfig::for_path(""));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_unknown_schema_version() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ledger.sqlite");
    drop(store_for(&path));
    let connection = Connection::open(&path).expect("raw open");
    connection.execute("UPDATE store_meta SET version = ?1", params![99]).expect("bump version");
    drop(connection);

    let result = SqliteLedgerStore::new(SqliteStoreConfig::for_path(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn sqlite_store_check_connection_succeeds() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_for(&dir.path().join("ledger.sqlite"));
    store.check_connection().expect("healthy");
}

// ============================================================================
// SECTION: Durability
// ============================================================================

#[test]
fn ledger_survives_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ledger.sqlite");
    let clock = clock();
    let evidence_id = {
        let plane = plane_for(store_for(&path), &clock);
        let d0 = plane.create_pre_alert(pre_alert("Z1")).expect("pre-alert");
        clock.advance(Duration::from_secs(1));
        plane.transition(transition(&d0.id, DecisionLevel::D1)).expect("d1");
        plane
            .activate_mitigation(MitigationRequest {
                zone_id: ZoneId::new("Z1"),
                measure_type: MeasureType::HumanReview,
                trigger_type: TriggerType::Manual,
                trigger_condition: "manual".to_string(),
                reason: "escalated".to_string(),
                operator_id: OperatorId::new("op-1"),
            })
            .expect("mitigation");
        let record = plane.archive_decision_state(&d0.id, &OperatorId::new("op-1")).expect("archive");
        plane.seal_evidence(&record.id, &OperatorId::new("op-1")).expect("seal");
        record.id
    };

    let plane = plane_for(store_for(&path), &clock);
    let zone = ZoneId::new("Z1");
    let latest = plane.latest_decision(&zone).expect("latest").expect("active");
    assert_eq!(latest.current_state, DecisionLevel::D1);
    assert_eq!(plane.decision_history(&zone).expect("history").len(), 2);
    assert_eq!(plane.active_mitigations(&zone).expect("mitigations").len(), 1);
    let evidence = plane.get_evidence(&evidence_id).expect("evidence");
    assert!(evidence.sealed);
    assert!(plane.verify_integrity(Timestamp::from_unix_millis(0), far_future()).expect("verify").ok);

    plane
        .create_pre_alert(pre_alert("Z1"))
        .expect_err("zone still active after reopen");
}

#[test]
fn stand_down_persists_deactivated_mitigations() {
    let dir = TempDir::new().expect("tempdir");
    let clock = clock();
    let plane = plane_for(store_for(&dir.path().join("ledger.sqlite")), &clock);
    let d0 = plane.create_pre_alert(pre_alert("Z2")).expect("pre-alert");
    plane
        .activate_mitigation(MitigationRequest {
            zone_id: ZoneId::new("Z2"),
            measure_type: MeasureType::Aggregation,
            trigger_type: TriggerType::Manual,
            trigger_condition: "manual".to_string(),
            reason: "noise".to_string(),
            operator_id: OperatorId::new("op-1"),
        })
        .expect("mitigation");
    plane.transition(transition(&d0.id, DecisionLevel::D6)).expect("stand down");

    let stored = plane.store().zone_mitigations(&ZoneId::new("Z2")).expect("stored");
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].active);
    plane.create_pre_alert(pre_alert("Z2")).expect("zone reopened");
}

#[test]
fn stale_sequence_is_a_conflict() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_for(&dir.path().join("ledger.sqlite"));
    store
        .commit(LedgerBatch {
            decision: Some(record("Z1", 1, DecisionLevel::D0)),
            ..LedgerBatch::default()
        })
        .expect("first");
    let err = store
        .commit(LedgerBatch {
            decision: Some(record("Z1", 1, DecisionLevel::D1)),
            ..LedgerBatch::default()
        })
        .expect_err("stale");
    assert!(matches!(err, StoreError::Conflict(_)));
    assert_eq!(store.decision_history(&ZoneId::new("Z1")).expect("history").len(), 1);
}

#[test]
fn failed_batch_leaves_no_partial_writes() {
    let dir = TempDir::new().expect("tempdir");
    let store = store_for(&dir.path().join("ledger.sqlite"));
    let entry = AuditEntry::new(
        Timestamp::from_unix_millis(START_MILLIS),
        OperationType::DecisionTransition,
        OperatorId::new("op-1"),
        "create_pre_alert",
        AuditResult::Success,
        "seed",
    );
    let err = store
        .commit(LedgerBatch {
            decision: Some(record("Z1", 2, DecisionLevel::D0)),
            audit: vec![entry],
            ..LedgerBatch::default()
        })
        .expect_err("gap");
    assert!(matches!(err, StoreError::Conflict(_)));
    assert_eq!(store.query_audit(&AuditFilter::default()).expect("audit").count, 0);
}

// ============================================================================
// SECTION: Triggers and Corruption
// ============================================================================

#[test]
fn decision_and_audit_rows_are_append_only() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ledger.sqlite");
    let clock = clock();
    let plane = plane_for(store_for(&path), &clock);
    plane.create_pre_alert(pre_alert("Z1")).expect("pre-alert");

    let connection = Connection::open(&path).expect("raw open");
    assert!(connection.execute("UPDATE decision_states SET current_state = 'D3'", []).is_err());
    assert!(connection.execute("DELETE FROM decision_states", []).is_err());
    assert!(connection.execute("UPDATE audit_log SET action = 'noop'", []).is_err());
    assert!(connection.execute("DELETE FROM audit_log", []).is_err());
}

#[test]
fn sealed_evidence_rejects_updates() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ledger.sqlite");
    let clock = clock();
    let plane = plane_for(store_for(&path), &clock);
    let record = plane
        .archive_evidence(ArchiveRequest {
            evidence_type: "sensor_frame".to_string(),
            related_id: "frame-1".to_string(),
            zone_id: None,
            snapshot: json!({"frame": 1}),
            archived_by: OperatorId::new("archivist"),
            retention: None,
        })
        .expect("archive");
    plane.seal_evidence(&record.id, &OperatorId::new("archivist")).expect("seal");

    let connection = Connection::open(&path).expect("raw open");
    let result = connection.execute(
        "UPDATE evidence SET record_json = x'00' WHERE evidence_id = ?1",
        params![record.id.as_str()],
    );
    assert!(result.is_err());
}

#[test]
fn corrupted_record_fails_closed() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ledger.sqlite");
    let clock = clock();
    let plane = plane_for(store_for(&path), &clock);
    let record = plane
        .archive_evidence(ArchiveRequest {
            evidence_type: "sensor_frame".to_string(),
            related_id: "frame-2".to_string(),
            zone_id: Some(ZoneId::new("Z1")),
            snapshot: json!({"frame": 2}),
            archived_by: OperatorId::new("archivist"),
            retention: None,
        })
        .expect("archive");

    let connection = Connection::open(&path).expect("raw open");
    connection
        .execute(
            "UPDATE evidence SET record_json = CAST('{}' AS BLOB) WHERE evidence_id = ?1",
            params![record.id.as_str()],
        )
        .expect("unsealed rows are writable");
    drop(connection);

    let err = plane.store().evidence(&record.id).expect_err("corrupt");
    assert!(matches!(err, StoreError::Corrupt(_)));
    assert_eq!(
        plane.get_evidence(&record.id).expect_err("fails closed"),
        zonegate_core::ControlPlaneError::StorageUnavailable
    );
}

// ============================================================================
// SECTION: Audit Queries and Verification
// ============================================================================

#[test]
fn audit_query_filters_orders_and_pages() {
    let dir = TempDir::new().expect("tempdir");
    let clock = clock();
    let plane = plane_for(store_for(&dir.path().join("ledger.sqlite")), &clock);
    for zone in ["Z1", "Z2", "Z3"] {
        plane.create_pre_alert(pre_alert(zone)).expect("pre-alert");
        clock.advance(Duration::from_secs(1));
    }
    plane.create_pre_alert(pre_alert("Z1")).expect_err("already active");

    let page = plane
        .query_audit(&AuditFilter {
            action: Some("create_pre_alert".to_string()),
            limit: Some(2),
            ..AuditFilter::default()
        })
        .expect("page");
    assert_eq!(page.count, 4);
    assert_eq!(page.logs.len(), 2);
    assert_eq!(page.logs[0].entry.result, AuditResult::Failure);
    assert!(page.logs[0].sequence > page.logs[1].sequence);

    let zone = plane
        .query_audit(&AuditFilter {
            zone_id: Some(ZoneId::new("Z2")),
            ..AuditFilter::default()
        })
        .expect("zone");
    assert_eq!(zone.count, 1);

    let window = plane
        .query_audit(&AuditFilter {
            start_time: Some(Timestamp::from_unix_millis(START_MILLIS + 1_000)),
            end_time: Some(Timestamp::from_unix_millis(START_MILLIS + 2_000)),
            ..AuditFilter::default()
        })
        .expect("window");
    assert_eq!(window.count, 1);
    assert_eq!(window.logs[0].entry.zone_id, Some(ZoneId::new("Z2")));
}

#[test]
fn out_of_band_deletion_is_located() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("ledger.sqlite");
    let clock = clock();
    let plane = plane_for(store_for(&path), &clock);
    for zone in ["Z1", "Z2", "Z3"] {
        plane.create_pre_alert(pre_alert(zone)).expect("pre-alert");
        clock.advance(Duration::from_secs(1));
    }
    let d0 = plane.latest_decision(&ZoneId::new("Z1")).expect("latest").expect("active");
    plane.transition(transition(&d0.id, DecisionLevel::D1)).expect("d1");
    assert!(plane.verify_integrity(Timestamp::from_unix_millis(0), far_future()).expect("verify").ok);

    let connection = Connection::open(&path).expect("raw open");
    connection
        .execute_batch("DROP TRIGGER audit_log_no_delete; DELETE FROM audit_log WHERE sequence = 2;")
        .expect("tamper");
    drop(connection);

    let report = plane.verify_integrity(Timestamp::from_unix_millis(0), far_future()).expect("verify");
    assert!(!report.ok);
    assert_eq!(report.total, 3);
    assert_eq!(report.first_break, Some(1));
    assert!(report.violations.iter().any(|v| v.kind == ViolationKind::ChainBreak));
    assert!(report.violations.iter().any(|v| v.kind == ViolationKind::SequenceGap));
}

#[test]
fn verification_window_spans_out_of_order_timestamps() {
    let dir = TempDir::new().expect("tempdir");
    let clock = clock();
    let plane = plane_for(store_for(&dir.path().join("ledger.sqlite")), &clock);
    let at = |offset: i64| Timestamp::from_unix_millis(START_MILLIS + offset);

    clock.set(at(2_000));
    let d0 = plane.create_pre_alert(pre_alert("Z1")).expect("pre-alert z1");
    clock.set(at(1_000));
    plane.create_pre_alert(pre_alert("Z2")).expect("pre-alert z2");
    clock.set(at(3_000));
    plane.transition(transition(&d0.id, DecisionLevel::D1)).expect("d1");

    let report = plane.verify_integrity(at(1_500), far_future()).expect("verify");
    assert!(report.ok);
    assert_eq!(report.total, 3);

    let early = plane.verify_integrity(at(0), at(1_500)).expect("verify early window");
    assert!(early.ok);
    assert_eq!(early.total, 1);
    assert!(plane.verify_integrity(far_future(), far_future()).expect("empty").ok);
}
