// crates/zonegate-core/src/core/dashboard.rs
// ============================================================================
// Module: Zonegate Dashboard View
// Description: Read model combining decision, risk, and mitigation state.
// Purpose: Give the presentation layer one nullable aggregate per zone.
// Dependencies: serde, crate::core::{identifiers, mitigation, risk, state, time}
// ============================================================================

//! ## Overview
//! Each field of [`DashboardView`] is independently nullable: a zone can
//! have risk metrics without an active declaration, and a declaration can
//! briefly exist before the first evaluation is recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ZoneId;
use crate::core::mitigation::Mitigation;
use crate::core::risk::Breakpoint;
use crate::core::risk::ComplexityLevel;
use crate::core::risk::ComplexityMetrics;
use crate::core::risk::EthicalPrimes;
use crate::core::state::DecisionState;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: View
// ============================================================================

/// Aggregate read model for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    /// Zone shown.
    pub zone_id: ZoneId,
    /// Active declaration, if any.
    pub decision_state: Option<DecisionState>,
    /// Last evaluated complexity metrics.
    pub complexity_metrics: Option<ComplexityMetrics>,
    /// Classification of the last complexity total.
    pub complexity_level: Option<ComplexityLevel>,
    /// Last evaluated ethical primes.
    pub ethical_primes: Option<EthicalPrimes>,
    /// Breakpoints from the last evaluation.
    pub breakpoints: Vec<Breakpoint>,
    /// Currently active mitigations.
    pub active_mitigations: Vec<Mitigation>,
    /// Time of the last evaluation.
    pub evaluated_at: Option<Timestamp>,
}
