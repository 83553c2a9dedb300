// crates/zonegate-core/src/core/risk.rs
// ============================================================================
// Module: Zonegate Risk Model
// Description: Signal snapshots, complexity metrics, ethical primes, breakpoints.
// Purpose: Define the inputs, outputs, and tunable parameters of the risk engine.
// Dependencies: serde, crate::core::{identifiers, state}
// ============================================================================

//! ## Overview
//! The risk engine reduces a [`SignalSnapshot`] to [`ComplexityMetrics`],
//! [`EthicalPrimes`], and the [`Breakpoint`]s that exceed configured limits.
//! Every threshold lives in [`RiskModel`] so operators can tune it without
//! code changes; the defaults reproduce the fielded model.
//!
//! Raw counts are signed on the wire so that a negative count from a faulty
//! collector is rejected rather than silently clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ZoneId;
use crate::core::state::DecisionLevel;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Signal Inputs
// ============================================================================

/// Raw observations for one zone at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    /// Number of distinct signal sources reporting.
    pub signal_sources: i64,
    /// Number of decision layers currently engaged.
    pub decision_depth: i64,
    /// Number of tracked context states.
    pub context_states: i64,
    /// Inputs to the false-negative estimator.
    #[serde(default)]
    pub false_negative: FalseNegativeInputs,
    /// Inputs to the false-positive estimator.
    #[serde(default)]
    pub false_positive: FalsePositiveInputs,
    /// Inputs to the bias estimator.
    #[serde(default)]
    pub bias: BiasInputs,
    /// Inputs to the integrity estimator.
    #[serde(default)]
    pub integrity: IntegrityInputs,
}

impl SignalSnapshot {
    /// Creates a snapshot with the three complexity counts and neutral prime inputs.
    #[must_use]
    pub fn from_counts(signal_sources: i64, decision_depth: i64, context_states: i64) -> Self {
        Self {
            signal_sources,
            decision_depth,
            context_states,
            false_negative: FalseNegativeInputs::default(),
            false_positive: FalsePositiveInputs::default(),
            bias: BiasInputs::default(),
            integrity: IntegrityInputs::default(),
        }
    }
}

/// Observations feeding the false-negative prime.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FalseNegativeInputs {
    /// Fraction of confirmed events that were not flagged, in `[0, 1]`.
    pub missed_event_rate: f64,
    /// Mean severity of missed events, in `[0, 1]`.
    pub missed_severity: f64,
    /// Mean detection delay in seconds.
    pub detection_delay_secs: f64,
}

/// Observations feeding the false-positive prime.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FalsePositiveInputs {
    /// Fraction of alerts later judged false, in `[0, 1]`.
    pub false_alarm_rate: f64,
    /// Public impact of false alarms, in `[0, 1]`.
    pub public_impact: f64,
    /// Operational cost of false alarms in cost units.
    pub response_cost: f64,
}

/// Observations feeding the bias prime, each a disparity in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasInputs {
    /// Disparity across population groups.
    pub group_disparity: f64,
    /// Disparity across zones.
    pub zone_disparity: f64,
    /// Disparity across time windows.
    pub temporal_disparity: f64,
}

/// Observations feeding the integrity prime, each a coverage rate in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityInputs {
    /// Fraction of spoofed signals detected.
    pub spoofing_detection_rate: f64,
    /// Fraction of intrusions detected.
    pub intrusion_detection_rate: f64,
    /// Fraction of commands verified end to end.
    pub command_verification_rate: f64,
}

impl Default for IntegrityInputs {
    fn default() -> Self {
        Self {
            spoofing_detection_rate: 1.0,
            intrusion_detection_rate: 1.0,
            command_verification_rate: 1.0,
        }
    }
}

// ============================================================================
// SECTION: Engine Outputs
// ============================================================================

/// Complexity snapshot derived from validated counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    /// Signal source count.
    pub signal_sources: u64,
    /// Decision layer count.
    pub decision_depth: u64,
    /// Context state count.
    pub context_states: u64,
    /// Weighted, saturated combination of the counts, in `[0, 1]`.
    pub complexity_total: f64,
}

/// Coarse classification of `complexity_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// Below 0.3.
    Low,
    /// At least 0.3 and below 0.6.
    Medium,
    /// At least 0.6 and below 0.8.
    High,
    /// 0.8 and above.
    Critical,
}

impl ComplexityLevel {
    /// Returns the stable label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// The four bounded ethical risk indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EthicalPrimes {
    /// False-negative risk.
    pub fn_prime: f64,
    /// False-positive risk.
    pub fp_prime: f64,
    /// Bias risk.
    pub bias_prime: f64,
    /// Integrity risk.
    pub integrity_prime: f64,
}

/// Metric that produced a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointKind {
    /// `complexity_total` above the critical threshold.
    Complexity,
    /// `fn_prime` above its ceiling.
    FnPrime,
    /// `fp_prime` above its ceiling.
    FpPrime,
    /// `bias_prime` above its ceiling.
    BiasPrime,
    /// `integrity_prime` above its ceiling.
    IntegrityPrime,
}

impl BreakpointKind {
    /// All kinds in detection order.
    pub const ALL: [Self; 5] =
        [Self::Complexity, Self::FnPrime, Self::FpPrime, Self::BiasPrime, Self::IntegrityPrime];

    /// Returns the metric name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::FnPrime => "fn_prime",
            Self::FpPrime => "fp_prime",
            Self::BiasPrime => "bias_prime",
            Self::IntegrityPrime => "integrity_prime",
        }
    }
}

impl fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected limit violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Offending metric.
    #[serde(rename = "type")]
    pub kind: BreakpointKind,
    /// Measured value.
    pub value: f64,
    /// Limit that was exceeded.
    pub threshold: f64,
    /// Human-readable explanation.
    pub description: String,
}

/// Full output of one risk evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Evaluated zone.
    pub zone_id: ZoneId,
    /// Complexity snapshot.
    pub complexity_metrics: ComplexityMetrics,
    /// Classification of `complexity_total`.
    pub complexity_level: ComplexityLevel,
    /// Ethical prime values.
    pub ethical_primes: EthicalPrimes,
    /// Breakpoints in detection order.
    pub breakpoints: Vec<Breakpoint>,
}

/// Latest evaluation recorded for a zone, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    /// Evaluation output.
    pub assessment: RiskAssessment,
    /// Evaluation time.
    pub evaluated_at: Timestamp,
}

// ============================================================================
// SECTION: Model Parameters
// ============================================================================

/// Relative weights of the complexity components; they sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityWeights {
    /// Weight of the signal source count.
    pub signal_sources: f64,
    /// Weight of the decision depth.
    pub decision_depth: f64,
    /// Weight of the context state count.
    pub context_states: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            signal_sources: 0.3,
            decision_depth: 0.4,
            context_states: 0.3,
        }
    }
}

/// Counts at which each complexity component saturates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationCaps {
    /// Saturation point for signal sources.
    pub signal_sources: u64,
    /// Saturation point for decision depth.
    pub decision_depth: u64,
    /// Saturation point for context states.
    pub context_states: u64,
}

impl Default for NormalizationCaps {
    fn default() -> Self {
        Self {
            signal_sources: 20,
            decision_depth: 6,
            context_states: 100,
        }
    }
}

/// Target ceilings for the ethical primes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimeCeilings {
    /// Ceiling for `fn_prime`.
    pub fn_prime: f64,
    /// Ceiling for `fp_prime`.
    pub fp_prime: f64,
    /// Ceiling for `bias_prime`.
    pub bias_prime: f64,
    /// Ceiling for `integrity_prime`.
    pub integrity_prime: f64,
}

impl Default for PrimeCeilings {
    fn default() -> Self {
        Self {
            fn_prime: 0.2,
            fp_prime: 0.15,
            bias_prime: 0.1,
            integrity_prime: 0.05,
        }
    }
}

/// Default critical complexity threshold.
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 0.8;

/// Tunable parameters of the risk engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskModel {
    /// Complexity component weights.
    pub weights: ComplexityWeights,
    /// Complexity saturation points.
    pub caps: NormalizationCaps,
    /// Ethical prime ceilings.
    pub ceilings: PrimeCeilings,
    /// `complexity_total` above this value is a breakpoint.
    pub critical_threshold: f64,
}

impl Default for RiskModel {
    fn default() -> Self {
        Self {
            weights: ComplexityWeights::default(),
            caps: NormalizationCaps::default(),
            ceilings: PrimeCeilings::default(),
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

// ============================================================================
// SECTION: Escalation Policy
// ============================================================================

/// Level implied by each breakpoint kind when the engine forces a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Level implied by a complexity breakpoint.
    pub complexity: DecisionLevel,
    /// Level implied by an `fn_prime` breakpoint.
    pub fn_prime: DecisionLevel,
    /// Level implied by an `fp_prime` breakpoint.
    pub fp_prime: DecisionLevel,
    /// Level implied by a `bias_prime` breakpoint.
    pub bias_prime: DecisionLevel,
    /// Level implied by an `integrity_prime` breakpoint.
    pub integrity_prime: DecisionLevel,
}

impl EscalationPolicy {
    /// Returns the level implied by a breakpoint kind.
    #[must_use]
    pub const fn level_for(&self, kind: BreakpointKind) -> DecisionLevel {
        match kind {
            BreakpointKind::Complexity => self.complexity,
            BreakpointKind::FnPrime => self.fn_prime,
            BreakpointKind::FpPrime => self.fp_prime,
            BreakpointKind::BiasPrime => self.bias_prime,
            BreakpointKind::IntegrityPrime => self.integrity_prime,
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            complexity: DecisionLevel::D3,
            fn_prime: DecisionLevel::D2,
            fp_prime: DecisionLevel::D1,
            bias_prime: DecisionLevel::D1,
            integrity_prime: DecisionLevel::D2,
        }
    }
}
