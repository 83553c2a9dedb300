// crates/zonegate-core/src/core/identifiers.rs
// ============================================================================
// Module: Zonegate Identifiers
// Description: Opaque identifiers for zones, decisions, mitigations, and ledger rows.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings on the wire. Zone identifiers are checked
//! against [`is_valid_zone_id`] when the registry is built; the remaining
//! identifiers are minted by the control plane in deterministic forms so that
//! replaying a ledger yields the same ids.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a zone identifier.
pub const MAX_ZONE_ID_LENGTH: usize = 64;

/// Operator identifier used for engine-initiated transitions.
pub const RISK_ENGINE_OPERATOR: &str = "system:risk-engine";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Zone identifier naming an isolated decision domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Creates a new zone identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ZoneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ZoneId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Decision state record identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(String);

impl DecisionId {
    /// Creates a new decision identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DecisionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DecisionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Mitigation record identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MitigationId(String);

impl MitigationId {
    /// Creates a new mitigation identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MitigationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for MitigationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MitigationId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Audit log entry identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(String);

impl AuditId {
    /// Creates a new audit identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AuditId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AuditId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Evidence record identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(String);

impl EvidenceId {
    /// Creates a new evidence identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EvidenceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EvidenceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Operator identity recorded on transitions and audit entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(String);

impl OperatorId {
    /// Creates a new operator identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OperatorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OperatorId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Minting
// ============================================================================

impl DecisionId {
    /// Builds the identifier of the `sequence`-th decision record in a zone.
    #[must_use]
    pub fn for_zone(zone_id: &ZoneId, sequence: u64) -> Self {
        Self(format!("dec-{zone_id}-{sequence:06}"))
    }
}

impl MitigationId {
    /// Builds the identifier of the `ordinal`-th mitigation activated in a zone.
    #[must_use]
    pub fn for_zone(zone_id: &ZoneId, ordinal: u64) -> Self {
        Self(format!("mit-{zone_id}-{ordinal:06}"))
    }
}

impl AuditId {
    /// Builds the identifier of the audit entry at `sequence` in the chain.
    #[must_use]
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("audit-{sequence:012}"))
    }
}

impl OperatorId {
    /// Returns the reserved identity of the risk engine.
    #[must_use]
    pub fn risk_engine() -> Self {
        Self::new(RISK_ENGINE_OPERATOR)
    }

    /// Returns true when this is the reserved risk engine identity.
    #[must_use]
    pub fn is_risk_engine(&self) -> bool {
        self.0 == RISK_ENGINE_OPERATOR
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Returns true when `value` is a well-formed zone identifier.
///
/// Zone ids are 1 to [`MAX_ZONE_ID_LENGTH`] characters of ASCII letters,
/// digits, `_`, or `-`.
#[must_use]
pub fn is_valid_zone_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_ZONE_ID_LENGTH
        && value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
