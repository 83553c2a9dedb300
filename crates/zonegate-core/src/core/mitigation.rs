// crates/zonegate-core/src/core/mitigation.rs
// ============================================================================
// Module: Zonegate Mitigations
// Description: Mitigation measures attached to a zone's active declaration.
// Purpose: Model mitigation toggles and the breakpoint-to-measure mapping.
// Dependencies: serde, crate::core::{identifiers, risk, time}
// ============================================================================

//! ## Overview
//! Unlike decision records, a [`Mitigation`] is a toggle: it is created
//! active and later deactivated in place. At most one mitigation per
//! [`MeasureType`] is active in a zone at a time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::DecisionId;
use crate::core::identifiers::MitigationId;
use crate::core::identifiers::ZoneId;
use crate::core::risk::BreakpointKind;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Measure Types
// ============================================================================

/// Kind of mitigation applied to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureType {
    /// Aggregate signals across more sources before acting.
    Aggregation,
    /// Raise corroboration requirements before alerting.
    StricterGating,
    /// Pull additional context into the decision.
    RefinedContext,
    /// Require a human reviewer on every decision.
    HumanReview,
    /// Fall back to a degraded, conservative operating mode.
    Degradation,
}

impl MeasureType {
    /// All measure types.
    pub const ALL: [Self; 5] = [
        Self::Aggregation,
        Self::StricterGating,
        Self::RefinedContext,
        Self::HumanReview,
        Self::Degradation,
    ];

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aggregation => "aggregation",
            Self::StricterGating => "stricter_gating",
            Self::RefinedContext => "refined_context",
            Self::HumanReview => "human_review",
            Self::Degradation => "degradation",
        }
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a measure label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown measure type: {0}")]
pub struct UnknownMeasure(pub String);

impl FromStr for MeasureType {
    type Err = UnknownMeasure;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|measure| measure.as_str() == value)
            .ok_or_else(|| UnknownMeasure(value.to_string()))
    }
}

/// How a mitigation was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Activated by the engine in response to a breakpoint.
    Automatic,
    /// Activated by an operator.
    Manual,
}

impl TriggerType {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }
}

// ============================================================================
// SECTION: Mitigation Records
// ============================================================================

/// A mitigation attached to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mitigation {
    /// Mitigation identifier.
    pub id: MitigationId,
    /// Owning zone.
    pub zone_id: ZoneId,
    /// Decision record that was latest when the mitigation was activated.
    pub decision_id: DecisionId,
    /// Kind of measure.
    pub measure_type: MeasureType,
    /// Trigger kind.
    pub trigger_type: TriggerType,
    /// Condition that triggered activation, e.g. `fn_prime > 0.2`.
    pub trigger_condition: String,
    /// Explanation supplied at activation.
    pub reason: String,
    /// True until deactivated.
    pub active: bool,
    /// Activation time.
    pub activated_at: Timestamp,
    /// Deactivation time, once deactivated.
    pub deactivated_at: Option<Timestamp>,
}

impl Mitigation {
    /// Returns a deactivated copy of this mitigation.
    #[must_use]
    pub fn deactivated(&self, at: Timestamp) -> Self {
        Self {
            active: false,
            deactivated_at: Some(at),
            ..self.clone()
        }
    }
}

// ============================================================================
// SECTION: Mitigation Policy
// ============================================================================

/// Measure applied automatically for each breakpoint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationPolicy {
    /// Measure for complexity breakpoints.
    pub complexity: MeasureType,
    /// Measure for `fn_prime` breakpoints.
    pub fn_prime: MeasureType,
    /// Measure for `fp_prime` breakpoints.
    pub fp_prime: MeasureType,
    /// Measure for `bias_prime` breakpoints.
    pub bias_prime: MeasureType,
    /// Measure for `integrity_prime` breakpoints.
    pub integrity_prime: MeasureType,
}

impl MitigationPolicy {
    /// Returns the measure mapped to a breakpoint kind.
    #[must_use]
    pub const fn measure_for(&self, kind: BreakpointKind) -> MeasureType {
        match kind {
            BreakpointKind::Complexity => self.complexity,
            BreakpointKind::FnPrime => self.fn_prime,
            BreakpointKind::FpPrime => self.fp_prime,
            BreakpointKind::BiasPrime => self.bias_prime,
            BreakpointKind::IntegrityPrime => self.integrity_prime,
        }
    }
}

impl Default for MitigationPolicy {
    fn default() -> Self {
        Self {
            complexity: MeasureType::HumanReview,
            fn_prime: MeasureType::RefinedContext,
            fp_prime: MeasureType::StricterGating,
            bias_prime: MeasureType::Aggregation,
            integrity_prime: MeasureType::Degradation,
        }
    }
}

// ============================================================================
// SECTION: Recommendations
// ============================================================================

/// Outcome of checking whether metrics call for mitigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationRecommendation {
    /// True when mitigation should be triggered.
    pub trigger: bool,
    /// Trigger kind for the recommended mitigation.
    pub trigger_type: Option<TriggerType>,
    /// Condition text explaining the recommendation.
    pub condition: Option<String>,
}

/// Scored comparison of metrics before and after a mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MitigationEffect {
    /// Change in `complexity_total` (negative is an improvement).
    pub complexity_change: f64,
    /// Change in `fn_prime`.
    pub fn_prime_change: f64,
    /// Change in `fp_prime`.
    pub fp_prime_change: f64,
    /// Change in `bias_prime`.
    pub bias_prime_change: f64,
    /// Change in `integrity_prime`.
    pub integrity_prime_change: f64,
    /// Weighted share of improved metrics, in `[0, 1]`.
    pub effectiveness: f64,
}
