// crates/zonegate-core/src/core/state.rs
// ============================================================================
// Module: Zonegate Decision State
// Description: Decision levels, the transition graph, and decision records.
// Purpose: Centralize which level changes are legal and for whom.
// Dependencies: serde, crate::core::{identifiers, risk, time}
// ============================================================================

//! ## Overview
//! A zone's posture is an append-only timeline of [`DecisionState`] records.
//! The latest record is the zone's current level; `Nominal` and `D6` are
//! resting levels, everything else is an active declaration.
//!
//! Operator transitions follow a fixed allow-list of edges:
//!
//! ```text
//! D0 -> D1 -> D2 -> D3
//! D0 | D1 | D2 | D3 -> D6 -> Nominal
//! ```
//!
//! Engine-forced transitions may jump straight to any escalation level that
//! is strictly more severe than the current one.
//!
//! # Invariants
//! - `previous_state` equals the `current_state` of the preceding record in
//!   the same zone, and is `None` only for a zone's first record.
//! - `sequence` numbers are dense per zone, starting at 1.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::DecisionId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ZoneId;
use crate::core::risk::Breakpoint;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Decision Levels
// ============================================================================

/// Declared emergency posture of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionLevel {
    /// No active declaration.
    #[serde(rename = "nominal")]
    Nominal,
    /// Pre-alert.
    D0,
    /// First escalation level.
    D1,
    /// Second escalation level.
    D2,
    /// Highest escalation level.
    D3,
    /// Stand-down; returns the zone to `Nominal`.
    D6,
}

impl DecisionLevel {
    /// All levels in graph order.
    pub const ALL: [Self; 6] = [Self::Nominal, Self::D0, Self::D1, Self::D2, Self::D3, Self::D6];

    /// Returns the stable wire label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::D0 => "D0",
            Self::D1 => "D1",
            Self::D2 => "D2",
            Self::D3 => "D3",
            Self::D6 => "D6",
        }
    }

    /// Returns true for levels that constitute an active declaration.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::D0 | Self::D1 | Self::D2 | Self::D3)
    }

    /// Returns the escalation severity (0 for resting levels, 1..=4 for D0..D3).
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Nominal | Self::D6 => 0,
            Self::D0 => 1,
            Self::D1 => 2,
            Self::D2 => 3,
            Self::D3 => 4,
        }
    }

    /// Returns the number of decision layers engaged at this level.
    #[must_use]
    pub const fn decision_depth(self) -> u64 {
        match self {
            Self::Nominal | Self::D0 | Self::D6 => 1,
            Self::D1 => 2,
            Self::D2 => 3,
            Self::D3 => 4,
        }
    }
}

impl fmt::Display for DecisionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown decision level: {0}")]
pub struct UnknownLevel(pub String);

impl FromStr for DecisionLevel {
    type Err = UnknownLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownLevel(value.to_string()))
    }
}

// ============================================================================
// SECTION: Transition Graph
// ============================================================================

/// Operator-initiated edges of the decision graph.
const OPERATOR_EDGES: &[(DecisionLevel, DecisionLevel)] = &[
    (DecisionLevel::D0, DecisionLevel::D1),
    (DecisionLevel::D1, DecisionLevel::D2),
    (DecisionLevel::D2, DecisionLevel::D3),
    (DecisionLevel::D0, DecisionLevel::D6),
    (DecisionLevel::D1, DecisionLevel::D6),
    (DecisionLevel::D2, DecisionLevel::D6),
    (DecisionLevel::D3, DecisionLevel::D6),
    (DecisionLevel::D6, DecisionLevel::Nominal),
];

/// Who initiated a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOrigin {
    /// Human operator request.
    Operator,
    /// Risk engine breakpoint.
    Engine,
}

/// Returns the levels reachable from `current` for the given origin.
#[must_use]
pub fn allowed_targets(current: DecisionLevel, origin: TransitionOrigin) -> Vec<DecisionLevel> {
    match origin {
        TransitionOrigin::Operator => OPERATOR_EDGES
            .iter()
            .filter(|(from, _)| *from == current)
            .map(|(_, to)| *to)
            .collect(),
        TransitionOrigin::Engine => DecisionLevel::ALL
            .into_iter()
            .filter(|target| target.is_active() && target.severity() > current.severity())
            .collect(),
    }
}

/// Returns true when `current -> target` is legal for the given origin.
#[must_use]
pub fn is_transition_allowed(
    current: DecisionLevel,
    target: DecisionLevel,
    origin: TransitionOrigin,
) -> bool {
    allowed_targets(current, origin).contains(&target)
}

// ============================================================================
// SECTION: Decision Records
// ============================================================================

/// Immutable record of one declared posture in a zone's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionState {
    /// Record identifier.
    pub id: DecisionId,
    /// Owning zone.
    pub zone_id: ZoneId,
    /// Dense per-zone position in the timeline (1-based).
    pub sequence: u64,
    /// Level declared by this record.
    pub current_state: DecisionLevel,
    /// Level of the preceding record, absent for the first record.
    pub previous_state: Option<DecisionLevel>,
    /// Explanation supplied with the transition.
    pub reason: String,
    /// Initiator of the transition.
    pub origin: TransitionOrigin,
    /// Operator identity (the reserved engine id for forced transitions).
    pub operator_id: OperatorId,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last update time; equal to `created_at` because records never change.
    pub updated_at: Timestamp,
    /// Aggregate signal count observed at transition time.
    pub signal_count: Option<u64>,
    /// Context state count observed at transition time.
    pub context_states: Option<u64>,
    /// Breakpoint that forced this record, when engine-initiated.
    pub breakpoint: Option<Breakpoint>,
}

impl DecisionState {
    /// Returns true when this record declares an active posture.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.current_state.is_active()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_escalation_is_sequential() {
        let op = TransitionOrigin::Operator;
        assert!(is_transition_allowed(DecisionLevel::D0, DecisionLevel::D1, op));
        assert!(!is_transition_allowed(DecisionLevel::D0, DecisionLevel::D2, op));
        assert!(!is_transition_allowed(DecisionLevel::Nominal, DecisionLevel::D3, op));
        assert!(!is_transition_allowed(DecisionLevel::D3, DecisionLevel::D2, op));
    }

    #[test]
    fn every_active_level_can_stand_down() {
        for level in DecisionLevel::ALL.into_iter().filter(|level| level.is_active()) {
            assert!(is_transition_allowed(level, DecisionLevel::D6, TransitionOrigin::Operator));
        }
        assert_eq!(
            allowed_targets(DecisionLevel::D6, TransitionOrigin::Operator),
            vec![DecisionLevel::Nominal]
        );
    }

    #[test]
    fn engine_may_skip_levels_but_never_de_escalate() {
        let engine = TransitionOrigin::Engine;
        assert!(is_transition_allowed(DecisionLevel::Nominal, DecisionLevel::D3, engine));
        assert!(is_transition_allowed(DecisionLevel::D1, DecisionLevel::D3, engine));
        assert!(!is_transition_allowed(DecisionLevel::D2, DecisionLevel::D1, engine));
        assert!(!is_transition_allowed(DecisionLevel::D1, DecisionLevel::D6, engine));
        assert!(allowed_targets(DecisionLevel::D3, engine).is_empty());
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("d2".parse::<DecisionLevel>(), Ok(DecisionLevel::D2));
        assert_eq!("Nominal".parse::<DecisionLevel>(), Ok(DecisionLevel::Nominal));
        assert!("D4".parse::<DecisionLevel>().is_err());
    }

    #[test]
    fn decision_depth_tracks_escalation() {
        assert_eq!(DecisionLevel::D0.decision_depth(), 1);
        assert_eq!(DecisionLevel::D3.decision_depth(), 4);
        assert_eq!(DecisionLevel::D6.decision_depth(), 1);
    }
}
