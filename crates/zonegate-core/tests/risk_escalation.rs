// crates/zonegate-core/tests/risk_escalation.rs
// ============================================================================
// Module: Risk Escalation Tests
// Description: Evaluate-and-decide, forced transitions, and acknowledgment.
// Purpose: Validate that breakpoints drive escalation and mitigations.
// Dependencies: zonegate-core
// ============================================================================
//! ## Overview
//! Feeds signal snapshots through the control plane and checks the forced
//! records, their audit metadata, and the mitigations they activate.

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

use zonegate_core::AuditFilter;
use zonegate_core::AuditResult;
use zonegate_core::Breakpoint;
use zonegate_core::BreakpointKind;
use zonegate_core::ComplexityLevel;
use zonegate_core::ControlPlaneConfig;
use zonegate_core::ControlPlaneError;
use zonegate_core::DecisionLevel;
use zonegate_core::FalseNegativeInputs;
use zonegate_core::InMemoryLedgerStore;
use zonegate_core::MeasureType;
use zonegate_core::OperationType;
use zonegate_core::SignalSnapshot;
use zonegate_core::TransitionOrigin;
use zonegate_core::TriggerType;
use zonegate_core::ZoneId;

use crate::common::control_plane;
use crate::common::control_plane_with;
use crate::common::operator;
use crate::common::pre_alert;

/// Signals that breach only the false-negative prime ceiling.
fn fn_prime_signals() -> SignalSnapshot {
    let mut signals = SignalSnapshot::from_counts(12, 4, 3);
    signals.false_negative = FalseNegativeInputs {
        missed_event_rate: 0.1,
        missed_severity: 0.5,
        detection_delay_secs: 75.0,
    };
    signals
}

/// Builds a breakpoint with a rendered description.
fn breakpoint(kind: BreakpointKind, value: f64, threshold: f64) -> Breakpoint {
    Breakpoint {
        kind,
        value,
        threshold,
        description: format!("{kind} {value:.4} exceeds limit {threshold:.4}"),
    }
}

#[test]
fn fn_prime_breakpoint_escalates_past_operator_level() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z3");
    plane.create_pre_alert(pre_alert("Z3", "watch")).expect("pre-alert");

    let outcome = plane.evaluate_and_decide(&zone, &fn_prime_signals()).expect("decide");
    assert_eq!(outcome.assessment.complexity_level, ComplexityLevel::Medium);
    assert_eq!(outcome.assessment.breakpoints.len(), 1);
    let found = &outcome.assessment.breakpoints[0];
    assert_eq!(found.kind, BreakpointKind::FnPrime);
    assert!((found.value - 0.25).abs() < 1e-12);

    assert!(outcome.escalated);
    let decision = outcome.decision.expect("decision");
    assert_eq!(decision.current_state, DecisionLevel::D2);
    assert_eq!(decision.previous_state, Some(DecisionLevel::D0));
    assert_eq!(decision.origin, TransitionOrigin::Engine);
    assert!(decision.operator_id.is_risk_engine());
    assert_eq!(decision.breakpoint.as_ref().map(|b| b.kind), Some(BreakpointKind::FnPrime));
    assert_eq!(decision.signal_count, Some(12));

    let forced = plane
        .query_audit(&AuditFilter {
            action: Some("force_transition".to_string()),
            ..AuditFilter::default()
        })
        .expect("audit");
    assert_eq!(forced.count, 1);
    let metadata = &forced.logs[0].entry.metadata;
    assert_eq!(metadata["breakpoint"]["type"], "fn_prime");
    assert_eq!(metadata["to"], "D2");
    assert_eq!(forced.logs[0].entry.operation_type, OperationType::DecisionTransition);

    assert_eq!(outcome.mitigations.len(), 1);
    let mitigation = &outcome.mitigations[0];
    assert_eq!(mitigation.measure_type, MeasureType::RefinedContext);
    assert_eq!(mitigation.trigger_type, TriggerType::Automatic);
    assert_eq!(mitigation.decision_id, decision.id);
}

#[test]
fn quiet_signals_change_nothing() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z1");
    let outcome = plane.evaluate_and_decide(&zone, &SignalSnapshot::from_counts(2, 1, 5)).expect("decide");
    assert!(outcome.assessment.breakpoints.is_empty());
    assert!(!outcome.escalated);
    assert_eq!(outcome.decision, None);
    assert!(plane.decision_history(&zone).expect("history").is_empty());
}

#[test]
fn quiet_signals_after_stand_down_report_no_decision() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z2");
    let d0 = plane.create_pre_alert(pre_alert("Z2", "watch")).expect("pre-alert");
    plane.transition(common::transition(&d0.id, DecisionLevel::D6, "all clear")).expect("d6");

    let outcome = plane.evaluate_and_decide(&zone, &SignalSnapshot::from_counts(2, 1, 5)).expect("decide");
    assert!(!outcome.escalated);
    assert_eq!(outcome.decision, None);
    assert_eq!(plane.latest_decision(&zone).expect("latest"), None);
    assert_eq!(plane.decision_history(&zone).expect("history").len(), 2);
}

#[test]
fn repeated_evaluation_does_not_stack_records() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z3");
    let first = plane.evaluate_and_decide(&zone, &fn_prime_signals()).expect("first");
    let second = plane.evaluate_and_decide(&zone, &fn_prime_signals()).expect("second");

    assert!(first.escalated);
    assert!(!second.escalated);
    assert_eq!(first.decision, second.decision);
    assert_eq!(first.mitigations, second.mitigations);
    assert_eq!(plane.decision_history(&zone).expect("history").len(), 1);
}

#[test]
fn force_below_current_level_is_a_no_op() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z1");
    let d3 = plane
        .force_transition(&zone, breakpoint(BreakpointKind::Complexity, 0.9, 0.8))
        .expect("complexity forces d3");
    assert_eq!(d3.current_state, DecisionLevel::D3);
    assert_eq!(d3.previous_state, None);

    let same = plane
        .force_transition(&zone, breakpoint(BreakpointKind::FpPrime, 0.3, 0.15))
        .expect("fp implies d1");
    assert_eq!(same, d3);
    assert_eq!(plane.decision_history(&zone).expect("history").len(), 1);
}

#[test]
fn highest_implied_level_wins_among_breakpoints() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z4");
    let mut signals = fn_prime_signals();
    signals.signal_sources = 40;
    signals.decision_depth = 12;
    signals.context_states = 400;

    let outcome = plane.evaluate_and_decide(&zone, &signals).expect("decide");
    let kinds: Vec<BreakpointKind> = outcome.assessment.breakpoints.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![BreakpointKind::Complexity, BreakpointKind::FnPrime]);
    let decision = outcome.decision.expect("decision");
    assert_eq!(decision.current_state, DecisionLevel::D3);
    assert_eq!(decision.breakpoint.map(|b| b.kind), Some(BreakpointKind::Complexity));

    let measures: Vec<MeasureType> = outcome.mitigations.iter().map(|m| m.measure_type).collect();
    assert_eq!(measures, vec![MeasureType::HumanReview, MeasureType::RefinedContext]);
}

#[test]
fn acknowledgment_policy_blocks_stacked_escalation() {
    let clock = common::clock();
    let config = ControlPlaneConfig {
        require_operator_ack_after_forced: true,
        ..ControlPlaneConfig::default()
    };
    let plane = control_plane_with(InMemoryLedgerStore::new(), config, &clock);
    let zone = ZoneId::new("Z1");

    let d2 = plane
        .force_transition(&zone, breakpoint(BreakpointKind::FnPrime, 0.3, 0.2))
        .expect("first force");
    let err = plane
        .force_transition(&zone, breakpoint(BreakpointKind::Complexity, 0.9, 0.8))
        .expect_err("ack required");
    assert_eq!(
        err,
        ControlPlaneError::AcknowledgementRequired {
            zone: zone.clone(),
            decision_id: d2.id.clone(),
        }
    );
    let blocked = plane
        .query_audit(&AuditFilter {
            action: Some("force_transition".to_string()),
            result: Some(AuditResult::Failure),
            ..AuditFilter::default()
        })
        .expect("audit");
    assert_eq!(blocked.count, 1);

    let acked = plane.acknowledge(&d2.id, &operator("op-7"), "reviewed").expect("ack");
    assert_eq!(acked.current_state, DecisionLevel::D2);
    assert_eq!(acked.origin, TransitionOrigin::Operator);
    assert_eq!(acked.sequence, 2);

    let d3 = plane
        .force_transition(&zone, breakpoint(BreakpointKind::Complexity, 0.9, 0.8))
        .expect("force after ack");
    assert_eq!(d3.current_state, DecisionLevel::D3);
    assert_eq!(d3.previous_state, Some(DecisionLevel::D2));
}

#[test]
fn acknowledging_requires_an_active_decision() {
    let (plane, _clock) = control_plane();
    let d0 = plane.create_pre_alert(pre_alert("Z1", "watch")).expect("pre-alert");
    let same = plane.acknowledge(&d0.id, &operator("op-1"), "seen").expect("operator record");
    assert_eq!(same, d0);

    let d6 = plane
        .transition(common::transition(&d0.id, DecisionLevel::D6, "resolved"))
        .expect("stand down");
    let err = plane.acknowledge(&d6.id, &operator("op-1"), "seen").expect_err("nominal");
    assert_eq!(err, ControlPlaneError::NoActiveDecision(ZoneId::new("Z1")));
}

#[test]
fn invalid_signals_are_rejected_without_writes() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z1");
    let err = plane
        .evaluate_and_decide(&zone, &SignalSnapshot::from_counts(-1, 2, 3))
        .expect_err("negative count");
    assert_eq!(err.kind(), "invalid_input");
    assert!(common::all_audit(&plane).is_empty());
}

#[test]
fn dashboard_reports_latest_evaluation_and_audits_the_read() {
    let (plane, clock) = control_plane();
    let zone = ZoneId::new("Z3");
    plane.create_pre_alert(pre_alert("Z3", "watch")).expect("pre-alert");
    plane.evaluate_and_decide(&zone, &fn_prime_signals()).expect("decide");
    clock.advance(std::time::Duration::from_secs(5));

    let view = plane.dashboard(&zone, &operator("viewer")).expect("dashboard");
    assert_eq!(view.decision_state.map(|d| d.current_state), Some(DecisionLevel::D2));
    assert_eq!(view.complexity_level, Some(ComplexityLevel::Medium));
    assert_eq!(view.breakpoints.len(), 1);
    assert_eq!(view.active_mitigations.len(), 1);
    assert_eq!(view.evaluated_at, Some(common::start()));

    let reads = plane
        .query_audit(&AuditFilter {
            operation_type: Some(OperationType::DataAccess),
            ..AuditFilter::default()
        })
        .expect("audit");
    assert_eq!(reads.count, 1);
    assert_eq!(reads.logs[0].entry.operator_id, operator("viewer"));
}

#[test]
fn dashboard_for_quiet_zone_is_empty() {
    let (plane, _clock) = control_plane();
    let view = plane.dashboard(&ZoneId::new("Z2"), &operator("viewer")).expect("dashboard");
    assert_eq!(view.decision_state, None);
    assert_eq!(view.complexity_metrics, None);
    assert!(view.breakpoints.is_empty());
    assert!(view.active_mitigations.is_empty());
}

#[test]
fn evaluate_records_assessment_without_ledger_writes() {
    let (plane, _clock) = control_plane();
    let zone = ZoneId::new("Z4");
    let assessment = plane.evaluate(&zone, &fn_prime_signals()).expect("evaluate");
    assert_eq!(assessment.breakpoints.len(), 1);

    assert!(plane.decision_history(&zone).expect("history").is_empty());
    assert!(plane.active_mitigations(&zone).expect("mitigations").is_empty());
    assert!(common::all_audit(&plane).is_empty());

    let view = plane.dashboard(&zone, &operator("viewer")).expect("dashboard");
    assert_eq!(view.decision_state, None);
    assert_eq!(view.complexity_level, Some(assessment.complexity_level));
    assert_eq!(view.breakpoints, assessment.breakpoints);
}

#[test]
fn evaluate_rejects_unknown_zone_and_bad_rates() {
    let (plane, _clock) = control_plane();
    let unknown = plane.evaluate(&ZoneId::new("Z9"), &fn_prime_signals());
    assert!(matches!(unknown, Err(ControlPlaneError::UnknownZone(_))));

    let mut signals = fn_prime_signals();
    signals.false_negative.missed_event_rate = 1.5;
    let invalid = plane.evaluate(&ZoneId::new("Z1"), &signals);
    assert!(matches!(invalid, Err(ControlPlaneError::InvalidInput(_))));
}
