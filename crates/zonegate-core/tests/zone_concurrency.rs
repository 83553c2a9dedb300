// crates/zonegate-core/tests/zone_concurrency.rs
// ============================================================================
// Module: Zone Concurrency Tests
// Description: Concurrent operations against shared zones.
// Purpose: Confirm per-zone serialization and a gap-free audit chain.
// Dependencies: zonegate-core
// ============================================================================
//! ## Overview
//! Races writers against one zone and against independent zones, then checks
//! that exactly the expected records exist and the chain still verifies.

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

mod common;

use std::thread;

use zonegate_core::AuditFilter;
use zonegate_core::AuditResult;
use zonegate_core::ControlPlaneError;
use zonegate_core::DecisionLevel;
use zonegate_core::Timestamp;
use zonegate_core::ZoneId;

use crate::common::ZONES;
use crate::common::control_plane;
use crate::common::pre_alert;
use crate::common::start;
use crate::common::transition;

#[test]
fn racing_pre_alerts_declare_exactly_once() {
    let (plane, _clock) = control_plane();
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let plane = &plane;
                scope.spawn(move || plane.create_pre_alert(pre_alert("Z1", &format!("report {i}"))))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().expect("join")).collect()
    });

    let accepted = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(accepted, 1);
    assert!(results.iter().filter_map(|result| result.as_ref().err()).all(|err| matches!(
        err,
        ControlPlaneError::AlreadyActive { .. }
    )));
    assert_eq!(plane.decision_history(&ZoneId::new("Z1")).expect("history").len(), 1);
}

#[test]
fn independent_zones_progress_in_parallel() {
    let (plane, _clock) = control_plane();
    thread::scope(|scope| {
        for zone in ZONES {
            let plane = &plane;
            scope.spawn(move || {
                plane.create_pre_alert(pre_alert(zone, "parallel")).expect("pre-alert");
            });
        }
    });

    for zone in ZONES {
        let latest = plane.latest_decision(&ZoneId::new(zone)).expect("latest").expect("active");
        assert_eq!(latest.sequence, 1);
    }
    let report = plane
        .verify_integrity(start(), Timestamp::from_unix_millis(common::START_MILLIS + 1))
        .expect("verify");
    assert!(report.ok);
    assert_eq!(report.total, ZONES.len());
}

#[test]
fn racing_transitions_apply_each_edge_once() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z1");
    let d0 = plane.create_pre_alert(pre_alert("Z1", "cluster")).expect("pre-alert");
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let plane = &plane;
                let d0 = &d0;
                let target = if i % 2 == 0 { DecisionLevel::D1 } else { DecisionLevel::D6 };
                scope.spawn(move || {
                    plane.transition(transition(&d0.id, target, &format!("operator {i}")))
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().expect("join")).collect()
    });

    let history = plane.decision_history(&zone).expect("history");
    assert_eq!(history.last().map(|record| record.current_state), Some(DecisionLevel::D6));
    for (position, pair) in history.windows(2).enumerate() {
        assert_eq!(pair[1].previous_state, Some(pair[0].current_state));
        assert_eq!(pair[1].sequence, pair[0].sequence + 1);
        assert!(
            history[..=position].iter().all(|earlier| earlier.current_state != pair[1].current_state),
            "a level was declared twice"
        );
    }
    assert!(history.len() == 2 || history.len() == 3);

    let rejected: Vec<&ControlPlaneError> =
        results.iter().filter_map(|result| result.as_ref().err()).collect();
    assert!(rejected.iter().all(|err| matches!(
        err,
        ControlPlaneError::IllegalTransition {
            current: DecisionLevel::D6,
            target: DecisionLevel::D1,
            ..
        }
    )));
    for record in results.iter().filter_map(|result| result.as_ref().ok()) {
        assert!(history.contains(record));
    }

    let applied = plane
        .query_audit(&AuditFilter {
            action: Some("transition".to_string()),
            result: Some(AuditResult::Success),
            ..AuditFilter::default()
        })
        .expect("applied audit");
    assert_eq!(applied.count, history.len() - 1);
    let failed = plane
        .query_audit(&AuditFilter {
            action: Some("transition".to_string()),
            result: Some(AuditResult::Failure),
            ..AuditFilter::default()
        })
        .expect("failed audit");
    assert_eq!(failed.count, rejected.len());

    let report = plane
        .verify_integrity(start(), Timestamp::from_unix_millis(common::START_MILLIS + 1))
        .expect("verify");
    assert!(report.ok);
}
