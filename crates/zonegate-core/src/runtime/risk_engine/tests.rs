// crates/zonegate-core/src/runtime/risk_engine/tests.rs
// ============================================================================
// Module: Risk Engine Tests
// Description: Unit and property tests for complexity, primes, and breakpoints.
// Purpose: Pin threshold boundaries and the purity of evaluation.
// Dependencies: proptest
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    reason = "Test-only assertions and exact float comparisons are permitted."
)]

use proptest::prelude::*;

use super::*;
use crate::core::FalseNegativeInputs;
use crate::core::IntegrityInputs;

fn primes(fn_prime: f64) -> EthicalPrimes {
    EthicalPrimes {
        fn_prime,
        fp_prime: 0.0,
        bias_prime: 0.0,
        integrity_prime: 0.0,
    }
}

fn quiet_metrics() -> ComplexityMetrics {
    ComplexityMetrics {
        signal_sources: 0,
        decision_depth: 0,
        context_states: 0,
        complexity_total: 0.0,
    }
}

#[test]
fn fn_prime_at_ceiling_is_not_a_breakpoint() {
    let model = RiskModel::default();
    assert!(detect_breakpoints(&model, &quiet_metrics(), &primes(0.2)).is_empty());
    let over = detect_breakpoints(&model, &quiet_metrics(), &primes(0.2 + f64::EPSILON));
    assert_eq!(over.len(), 1);
    assert_eq!(over[0].kind, BreakpointKind::FnPrime);
    assert_eq!(over[0].threshold, 0.2);
}

#[test]
fn complexity_at_critical_threshold_is_not_a_breakpoint() {
    let model = RiskModel::default();
    let mut metrics = quiet_metrics();
    metrics.complexity_total = 0.8;
    assert!(detect_breakpoints(&model, &metrics, &primes(0.0)).is_empty());
    metrics.complexity_total = 0.81;
    let found = detect_breakpoints(&model, &metrics, &primes(0.0));
    assert_eq!(found[0].kind, BreakpointKind::Complexity);
}

#[test]
fn complexity_bands_are_inclusive_low() {
    assert_eq!(complexity_level(0.0), ComplexityLevel::Low);
    assert_eq!(complexity_level(0.299), ComplexityLevel::Low);
    assert_eq!(complexity_level(0.3), ComplexityLevel::Medium);
    assert_eq!(complexity_level(0.6), ComplexityLevel::High);
    assert_eq!(complexity_level(0.8), ComplexityLevel::Critical);
    assert_eq!(complexity_level(1.0), ComplexityLevel::Critical);
}

#[test]
fn fn_prime_estimator_combines_rate_severity_and_delay() {
    let mut signals = SignalSnapshot::from_counts(12, 4, 3);
    signals.false_negative = FalseNegativeInputs {
        missed_event_rate: 0.1,
        missed_severity: 0.5,
        detection_delay_secs: 75.0,
    };
    let assessment =
        evaluate_signals(&RiskModel::default(), &ZoneId::new("Z3"), &signals).expect("evaluate");
    assert!((assessment.ethical_primes.fn_prime - 0.25).abs() < 1e-12);
    let kinds: Vec<BreakpointKind> = assessment.breakpoints.iter().map(|bp| bp.kind).collect();
    assert_eq!(kinds, vec![BreakpointKind::FnPrime]);
    assert_eq!(assessment.complexity_level, ComplexityLevel::Medium);
}

#[test]
fn neutral_inputs_produce_zero_primes() {
    let primes = compute_ethical_primes(&SignalSnapshot::from_counts(1, 1, 1)).expect("primes");
    assert_eq!(primes.fn_prime, 0.0);
    assert_eq!(primes.integrity_prime, 0.0);
}

#[test]
fn weak_verification_raises_integrity_prime() {
    let mut signals = SignalSnapshot::from_counts(1, 1, 1);
    signals.integrity = IntegrityInputs {
        spoofing_detection_rate: 0.9,
        ..IntegrityInputs::default()
    };
    let primes = compute_ethical_primes(&signals).expect("primes");
    assert!((primes.integrity_prime - 0.04).abs() < 1e-12);
}

#[test]
fn negative_counts_are_rejected_not_clamped() {
    let err = compute_complexity(&RiskModel::default(), &SignalSnapshot::from_counts(3, -1, 0))
        .expect_err("negative depth");
    assert_eq!(err, RiskError::InvalidInput("decision_depth must be non-negative, got -1".to_string()));
}

#[test]
fn out_of_range_rates_are_rejected() {
    let mut signals = SignalSnapshot::from_counts(0, 0, 0);
    signals.false_negative.missed_event_rate = 1.5;
    assert!(compute_ethical_primes(&signals).is_err());
    signals.false_negative.missed_event_rate = f64::NAN;
    assert!(compute_ethical_primes(&signals).is_err());
    signals.false_negative.missed_event_rate = 0.0;
    signals.false_negative.detection_delay_secs = -1.0;
    assert!(compute_ethical_primes(&signals).is_err());
}

#[test]
fn saturated_counts_keep_their_raw_values() {
    let metrics = compute_complexity(&RiskModel::default(), &SignalSnapshot::from_counts(500, 60, 9_000))
        .expect("metrics");
    assert_eq!(metrics.complexity_total, 1.0);
    assert_eq!(metrics.signal_sources, 500);
    assert_eq!(metrics.context_states, 9_000);
}

#[test]
fn recommendation_prefers_complexity_then_primes() {
    let model = RiskModel::default();
    let mut metrics = quiet_metrics();
    metrics.complexity_total = 0.85;
    let strict = recommend_mitigation(&model, &metrics, &primes(0.5));
    assert!(strict.condition.as_deref().unwrap_or_default().contains("strict"));
    metrics.complexity_total = 0.1;
    let prime = recommend_mitigation(&model, &metrics, &primes(0.5));
    assert_eq!(prime.trigger_type, Some(TriggerType::Automatic));
    assert!(prime.condition.as_deref().unwrap_or_default().starts_with("fn_prime"));
    let none = recommend_mitigation(&model, &metrics, &primes(0.1));
    assert!(!none.trigger);
    assert_eq!(none.condition, None);
}

#[test]
fn mitigation_effect_weights_improved_metrics() {
    let zone = ZoneId::new("Z1");
    let mut before_signals = SignalSnapshot::from_counts(20, 6, 100);
    before_signals.false_negative.missed_event_rate = 0.6;
    let mut after_signals = SignalSnapshot::from_counts(10, 6, 100);
    after_signals.false_negative.missed_event_rate = 0.2;
    let model = RiskModel::default();
    let before = evaluate_signals(&model, &zone, &before_signals).expect("before");
    let after = evaluate_signals(&model, &zone, &after_signals).expect("after");
    let effect = evaluate_mitigation_effect(&before, &after);
    assert!(effect.complexity_change < 0.0);
    assert!((effect.effectiveness - 0.5).abs() < 1e-12);
}

proptest! {
    #[test]
    fn complexity_is_deterministic_and_bounded(
        sources in 0_i64..1_000,
        depth in 0_i64..50,
        contexts in 0_i64..10_000,
    ) {
        let model = RiskModel::default();
        let signals = SignalSnapshot::from_counts(sources, depth, contexts);
        let first = compute_complexity(&model, &signals).unwrap();
        let second = compute_complexity(&model, &signals).unwrap();
        prop_assert_eq!(first, second);
        prop_assert!((0.0..=1.0).contains(&first.complexity_total));
    }

    #[test]
    fn complexity_is_monotone_in_each_component(
        sources in 0_i64..100,
        depth in 0_i64..10,
        contexts in 0_i64..200,
        bump in 1_i64..10,
    ) {
        let model = RiskModel::default();
        let base = compute_complexity(&model, &SignalSnapshot::from_counts(sources, depth, contexts))
            .unwrap()
            .complexity_total;
        for bumped in [
            SignalSnapshot::from_counts(sources + bump, depth, contexts),
            SignalSnapshot::from_counts(sources, depth + bump, contexts),
            SignalSnapshot::from_counts(sources, depth, contexts + bump),
        ] {
            let next = compute_complexity(&model, &bumped).unwrap().complexity_total;
            prop_assert!(next >= base);
        }
    }

    #[test]
    fn primes_at_or_below_ceiling_never_break(fraction in 0.0_f64..=1.0) {
        let model = RiskModel::default();
        let value = model.ceilings.fn_prime * fraction;
        prop_assert!(detect_breakpoints(&model, &quiet_metrics(), &primes(value)).is_empty());
    }
}
