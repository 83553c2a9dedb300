// crates/zonegate-core/src/core/alert.rs
// ============================================================================
// Module: Zonegate Alert Notices
// Description: Data handed to the public alert publication collaborator.
// Purpose: Map decision levels onto standard alert severity vocabulary.
// Dependencies: serde, crate::core::{identifiers, state, time}
// ============================================================================

//! ## Overview
//! Zonegate does not format or transport public alerts. After each committed
//! transition it emits an [`AlertNotice`] carrying everything a
//! Common-Alerting-Protocol style formatter needs. Stand-down produces a
//! `Cancel` notice; returning to `Nominal` produces none.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DecisionId;
use crate::core::identifiers::ZoneId;
use crate::core::state::DecisionLevel;
use crate::core::state::DecisionState;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Vocabulary
// ============================================================================

/// Alert message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertMessageType {
    /// First notice of an episode.
    Alert,
    /// Change of level within an episode.
    Update,
    /// Episode ended.
    Cancel,
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    /// Extraordinary threat to life or property.
    Extreme,
    /// Significant threat to life or property.
    Severe,
    /// Possible threat to life or property.
    Moderate,
    /// Minimal to no known threat.
    Minor,
}

/// Alert urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertUrgency {
    /// Act now.
    Immediate,
    /// Act within the next hour.
    Expected,
    /// Act in the near future.
    Future,
    /// No longer required.
    Past,
}

/// Alert certainty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertCertainty {
    /// Determined to have occurred or to be ongoing.
    Observed,
    /// Likely (p > ~50%).
    Likely,
    /// Possible but not likely.
    Possible,
}

// ============================================================================
// SECTION: Notices
// ============================================================================

/// Data required to format and disseminate a public alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertNotice {
    /// Affected zone.
    pub zone_id: ZoneId,
    /// Decision record that produced the notice.
    pub decision_id: DecisionId,
    /// Declared level.
    pub level: DecisionLevel,
    /// Message type.
    pub msg_type: AlertMessageType,
    /// Severity.
    pub severity: AlertSeverity,
    /// Urgency.
    pub urgency: AlertUrgency,
    /// Certainty.
    pub certainty: AlertCertainty,
    /// Short headline.
    pub headline: String,
    /// Description (the transition reason).
    pub description: String,
    /// Recommended public action.
    pub instruction: String,
    /// Notice send time.
    pub sent_at: Timestamp,
    /// Expiry time.
    pub expires_at: Timestamp,
}

impl AlertNotice {
    /// Builds the notice for a committed decision record.
    ///
    /// Returns `None` for records that carry nothing to publish (`Nominal`).
    #[must_use]
    pub fn for_decision(record: &DecisionState, ttl: Duration) -> Option<Self> {
        let (severity, urgency, certainty, instruction) = match record.current_state {
            DecisionLevel::Nominal => return None,
            DecisionLevel::D0 => (
                AlertSeverity::Minor,
                AlertUrgency::Future,
                AlertCertainty::Possible,
                "Stay informed and monitor official channels.",
            ),
            DecisionLevel::D1 => (
                AlertSeverity::Moderate,
                AlertUrgency::Expected,
                AlertCertainty::Likely,
                "Prepare to act and review your emergency plan.",
            ),
            DecisionLevel::D2 => (
                AlertSeverity::Severe,
                AlertUrgency::Expected,
                AlertCertainty::Likely,
                "Take protective action and follow official instructions.",
            ),
            DecisionLevel::D3 => (
                AlertSeverity::Extreme,
                AlertUrgency::Immediate,
                AlertCertainty::Observed,
                "Take protective action immediately.",
            ),
            DecisionLevel::D6 => (
                AlertSeverity::Minor,
                AlertUrgency::Past,
                AlertCertainty::Observed,
                "The emergency has ended. Resume normal activity.",
            ),
        };
        let msg_type = match (record.current_state, record.previous_state) {
            (DecisionLevel::D6, _) => AlertMessageType::Cancel,
            (_, Some(previous)) if previous.is_active() => AlertMessageType::Update,
            _ => AlertMessageType::Alert,
        };
        Some(Self {
            zone_id: record.zone_id.clone(),
            decision_id: record.id.clone(),
            level: record.current_state,
            msg_type,
            severity,
            urgency,
            certainty,
            headline: format!("Zone {} at level {}", record.zone_id, record.current_state),
            description: record.reason.clone(),
            instruction: instruction.to_string(),
            sent_at: record.created_at,
            expires_at: record.created_at.saturating_add(ttl),
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions are permitted.")]

    use super::*;
    use crate::core::identifiers::OperatorId;
    use crate::core::state::TransitionOrigin;
    use crate::core::time::days;

    fn record(current: DecisionLevel, previous: Option<DecisionLevel>) -> DecisionState {
        let zone = ZoneId::new("Z1");
        DecisionState {
            id: DecisionId::for_zone(&zone, 1),
            zone_id: zone,
            sequence: 1,
            current_state: current,
            previous_state: previous,
            reason: "river gauge above flood stage".to_string(),
            origin: TransitionOrigin::Operator,
            operator_id: OperatorId::new("op-1"),
            created_at: Timestamp::from_unix_millis(0),
            updated_at: Timestamp::from_unix_millis(0),
            signal_count: None,
            context_states: None,
            breakpoint: None,
        }
    }

    #[test]
    fn first_declaration_is_an_alert() {
        let notice = AlertNotice::for_decision(&record(DecisionLevel::D0, None), days(1))
            .expect("notice");
        assert_eq!(notice.msg_type, AlertMessageType::Alert);
        assert_eq!(notice.severity, AlertSeverity::Minor);
        assert_eq!(notice.expires_at.as_unix_millis(), 86_400_000);
    }

    #[test]
    fn escalation_is_an_update_and_stand_down_cancels() {
        let update = AlertNotice::for_decision(
            &record(DecisionLevel::D3, Some(DecisionLevel::D2)),
            days(1),
        )
        .expect("notice");
        assert_eq!(update.msg_type, AlertMessageType::Update);
        assert_eq!(update.urgency, AlertUrgency::Immediate);
        let cancel = AlertNotice::for_decision(
            &record(DecisionLevel::D6, Some(DecisionLevel::D3)),
            days(1),
        )
        .expect("notice");
        assert_eq!(cancel.msg_type, AlertMessageType::Cancel);
    }

    #[test]
    fn nominal_publishes_nothing() {
        let notice =
            AlertNotice::for_decision(&record(DecisionLevel::Nominal, Some(DecisionLevel::D6)), days(1));
        assert!(notice.is_none());
    }
}
