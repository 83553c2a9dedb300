// crates/zonegate-core/src/runtime/risk_engine.rs
// ============================================================================
// Module: Zonegate Risk Engine
// Description: Complexity scoring, ethical prime estimation, breakpoint detection.
// Purpose: Reduce raw zone signals to metrics and threshold violations.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! Every function here is pure: the output depends only on the arguments,
//! so evaluation runs freely in parallel across zones and repeated calls
//! with the same snapshot agree exactly.
//!
//! `complexity_total` is a weighted sum of three components, each
//! normalized as `min(count / cap, 1)`. Raw counts are preserved in
//! [`ComplexityMetrics`] so saturation never hides the magnitude.
//!
//! Breakpoints fire only when a value is strictly greater than its limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Breakpoint;
use crate::core::BreakpointKind;
use crate::core::ComplexityLevel;
use crate::core::ComplexityMetrics;
use crate::core::EthicalPrimes;
use crate::core::MitigationEffect;
use crate::core::MitigationRecommendation;
use crate::core::RiskAssessment;
use crate::core::RiskModel;
use crate::core::SignalSnapshot;
use crate::core::TriggerType;
use crate::core::ZoneId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lower bound of the `medium` complexity band.
const MEDIUM_COMPLEXITY: f64 = 0.3;
/// Lower bound of the `high` complexity band; also the basic mitigation trigger.
const HIGH_COMPLEXITY: f64 = 0.6;
/// Lower bound of the `critical` complexity band.
const CRITICAL_COMPLEXITY: f64 = 0.8;
/// Detection delay at which the delay term of `fn_prime` saturates.
const DELAY_SATURATION_SECS: f64 = 300.0;
/// Response cost at which the cost term of `fp_prime` saturates.
const COST_SATURATION: f64 = 1_000.0;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Risk engine errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RiskError {
    /// Signal snapshot contains malformed values.
    #[error("invalid risk input: {0}")]
    InvalidInput(String),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Risk engine bound to a model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskEngine {
    /// Model parameters.
    model: RiskModel,
}

impl RiskEngine {
    /// Creates an engine for the given model.
    #[must_use]
    pub const fn new(model: RiskModel) -> Self {
        Self {
            model,
        }
    }

    /// Returns the engine's model.
    #[must_use]
    pub const fn model(&self) -> &RiskModel {
        &self.model
    }

    /// Evaluates a zone's signal snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::InvalidInput`] for negative counts or out-of-range rates.
    pub fn evaluate(
        &self,
        zone_id: &ZoneId,
        signals: &SignalSnapshot,
    ) -> Result<RiskAssessment, RiskError> {
        evaluate_signals(&self.model, zone_id, signals)
    }
}

/// Evaluates a signal snapshot against a model.
///
/// # Errors
///
/// Returns [`RiskError::InvalidInput`] for negative counts or out-of-range rates.
pub fn evaluate_signals(
    model: &RiskModel,
    zone_id: &ZoneId,
    signals: &SignalSnapshot,
) -> Result<RiskAssessment, RiskError> {
    let complexity_metrics = compute_complexity(model, signals)?;
    let ethical_primes = compute_ethical_primes(signals)?;
    let breakpoints = detect_breakpoints(model, &complexity_metrics, &ethical_primes);
    Ok(RiskAssessment {
        zone_id: zone_id.clone(),
        complexity_level: complexity_level(complexity_metrics.complexity_total),
        complexity_metrics,
        ethical_primes,
        breakpoints,
    })
}

// ============================================================================
// SECTION: Complexity
// ============================================================================

/// Computes complexity metrics from the snapshot's counts.
///
/// # Errors
///
/// Returns [`RiskError::InvalidInput`] when any count is negative.
pub fn compute_complexity(
    model: &RiskModel,
    signals: &SignalSnapshot,
) -> Result<ComplexityMetrics, RiskError> {
    let signal_sources = non_negative("signal_sources", signals.signal_sources)?;
    let decision_depth = non_negative("decision_depth", signals.decision_depth)?;
    let context_states = non_negative("context_states", signals.context_states)?;
    let weights = &model.weights;
    let caps = &model.caps;
    let total = weights.signal_sources * saturate(signal_sources, caps.signal_sources)
        + weights.decision_depth * saturate(decision_depth, caps.decision_depth)
        + weights.context_states * saturate(context_states, caps.context_states);
    Ok(ComplexityMetrics {
        signal_sources,
        decision_depth,
        context_states,
        complexity_total: total.clamp(0.0, 1.0),
    })
}

/// Classifies a complexity total into its band.
#[must_use]
pub fn complexity_level(complexity_total: f64) -> ComplexityLevel {
    if complexity_total < MEDIUM_COMPLEXITY {
        ComplexityLevel::Low
    } else if complexity_total < HIGH_COMPLEXITY {
        ComplexityLevel::Medium
    } else if complexity_total < CRITICAL_COMPLEXITY {
        ComplexityLevel::High
    } else {
        ComplexityLevel::Critical
    }
}

/// Normalizes a count against its saturation cap.
#[allow(
    clippy::cast_precision_loss,
    reason = "Ratios are only formed for counts below the cap, well within f64 precision."
)]
fn saturate(count: u64, cap: u64) -> f64 {
    if cap == 0 || count >= cap { 1.0 } else { count as f64 / cap as f64 }
}

/// Converts a signed count, rejecting negatives.
fn non_negative(field: &str, value: i64) -> Result<u64, RiskError> {
    u64::try_from(value)
        .map_err(|_| RiskError::InvalidInput(format!("{field} must be non-negative, got {value}")))
}

// ============================================================================
// SECTION: Ethical Primes
// ============================================================================

/// Computes the four ethical primes from the snapshot's estimator inputs.
///
/// # Errors
///
/// Returns [`RiskError::InvalidInput`] for non-finite values, rates outside
/// `[0, 1]`, or negative delays and costs.
pub fn compute_ethical_primes(signals: &SignalSnapshot) -> Result<EthicalPrimes, RiskError> {
    let fn_inputs = &signals.false_negative;
    let fp_inputs = &signals.false_positive;
    let bias = &signals.bias;
    let integrity = &signals.integrity;

    let fn_prime = rate("missed_event_rate", fn_inputs.missed_event_rate)? * 0.5
        + rate("missed_severity", fn_inputs.missed_severity)? * 0.3
        + (magnitude("detection_delay_secs", fn_inputs.detection_delay_secs)?
            / DELAY_SATURATION_SECS)
            .min(1.0)
            * 0.2;
    let fp_prime = rate("false_alarm_rate", fp_inputs.false_alarm_rate)? * 0.4
        + rate("public_impact", fp_inputs.public_impact)? * 0.4
        + (magnitude("response_cost", fp_inputs.response_cost)? / COST_SATURATION).min(1.0) * 0.2;
    let bias_prime = rate("group_disparity", bias.group_disparity)? * 0.4
        + rate("zone_disparity", bias.zone_disparity)? * 0.4
        + rate("temporal_disparity", bias.temporal_disparity)? * 0.2;
    let integrity_prime = (1.0 - rate("spoofing_detection_rate", integrity.spoofing_detection_rate)?)
        * 0.4
        + (1.0 - rate("intrusion_detection_rate", integrity.intrusion_detection_rate)?) * 0.4
        + (1.0 - rate("command_verification_rate", integrity.command_verification_rate)?) * 0.2;

    Ok(EthicalPrimes {
        fn_prime,
        fp_prime,
        bias_prime,
        integrity_prime,
    })
}

/// Validates a rate in `[0, 1]`.
fn rate(field: &str, value: f64) -> Result<f64, RiskError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(RiskError::InvalidInput(format!("{field} must be within [0, 1], got {value}")))
    }
}

/// Validates a finite, non-negative magnitude.
fn magnitude(field: &str, value: f64) -> Result<f64, RiskError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RiskError::InvalidInput(format!("{field} must be finite and non-negative, got {value}")))
    }
}

// ============================================================================
// SECTION: Breakpoints
// ============================================================================

/// Detects every limit strictly exceeded by the metrics, in detection order.
#[must_use]
pub fn detect_breakpoints(
    model: &RiskModel,
    metrics: &ComplexityMetrics,
    primes: &EthicalPrimes,
) -> Vec<Breakpoint> {
    let ceilings = &model.ceilings;
    let checks = [
        (BreakpointKind::Complexity, metrics.complexity_total, model.critical_threshold),
        (BreakpointKind::FnPrime, primes.fn_prime, ceilings.fn_prime),
        (BreakpointKind::FpPrime, primes.fp_prime, ceilings.fp_prime),
        (BreakpointKind::BiasPrime, primes.bias_prime, ceilings.bias_prime),
        (BreakpointKind::IntegrityPrime, primes.integrity_prime, ceilings.integrity_prime),
    ];
    checks
        .into_iter()
        .filter(|(_, value, threshold)| value > threshold)
        .map(|(kind, value, threshold)| Breakpoint {
            kind,
            value,
            threshold,
            description: format!("{kind} {value:.4} exceeds limit {threshold:.4}"),
        })
        .collect()
}

// ============================================================================
// SECTION: Mitigation Guidance
// ============================================================================

/// Reports whether the metrics call for mitigation and why.
///
/// Complexity is checked first (strict mitigation at the critical threshold,
/// basic mitigation at the high band), then each prime against its ceiling.
#[must_use]
pub fn recommend_mitigation(
    model: &RiskModel,
    metrics: &ComplexityMetrics,
    primes: &EthicalPrimes,
) -> MitigationRecommendation {
    let total = metrics.complexity_total;
    let ceilings = &model.ceilings;
    let condition = if total >= model.critical_threshold {
        Some(format!(
            "complexity_total >= {}: strict mitigation required",
            model.critical_threshold
        ))
    } else if total >= HIGH_COMPLEXITY {
        Some(format!("complexity_total >= {HIGH_COMPLEXITY}: basic mitigation required"))
    } else if primes.fn_prime > ceilings.fn_prime {
        Some(format!("fn_prime > {}: reduce corroboration threshold", ceilings.fn_prime))
    } else if primes.fp_prime > ceilings.fp_prime {
        Some(format!("fp_prime > {}: increase gating requirements", ceilings.fp_prime))
    } else if primes.bias_prime > ceilings.bias_prime {
        Some(format!("bias_prime > {}: balance signal sources", ceilings.bias_prime))
    } else if primes.integrity_prime > ceilings.integrity_prime {
        Some(format!("integrity_prime > {}: strengthen verification", ceilings.integrity_prime))
    } else {
        None
    };
    MitigationRecommendation {
        trigger: condition.is_some(),
        trigger_type: condition.as_ref().map(|_| TriggerType::Automatic),
        condition,
    }
}

/// Scores how much a mitigation improved the metrics.
///
/// Each strictly decreased metric contributes its weight: complexity 0.3,
/// `fn_prime` 0.2, `fp_prime` 0.2, `bias_prime` 0.15, `integrity_prime` 0.15.
#[must_use]
pub fn evaluate_mitigation_effect(
    before: &RiskAssessment,
    after: &RiskAssessment,
) -> MitigationEffect {
    let complexity_change =
        after.complexity_metrics.complexity_total - before.complexity_metrics.complexity_total;
    let fn_prime_change = after.ethical_primes.fn_prime - before.ethical_primes.fn_prime;
    let fp_prime_change = after.ethical_primes.fp_prime - before.ethical_primes.fp_prime;
    let bias_prime_change = after.ethical_primes.bias_prime - before.ethical_primes.bias_prime;
    let integrity_prime_change =
        after.ethical_primes.integrity_prime - before.ethical_primes.integrity_prime;
    let effectiveness = [
        (complexity_change, 0.3),
        (fn_prime_change, 0.2),
        (fp_prime_change, 0.2),
        (bias_prime_change, 0.15),
        (integrity_prime_change, 0.15),
    ]
    .into_iter()
    .filter(|(change, _)| *change < 0.0)
    .map(|(_, weight)| weight)
    .sum();
    MitigationEffect {
        complexity_change,
        fn_prime_change,
        fp_prime_change,
        bias_prime_change,
        integrity_prime_change,
        effectiveness,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
