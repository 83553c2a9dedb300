// crates/zonegate-core/src/core/time.rs
// ============================================================================
// Module: Zonegate Time Model
// Description: Explicit millisecond timestamps for ledger records.
// Purpose: Keep time caller-supplied so audit and evidence rows replay exactly.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Zonegate never reads the wall clock from inside the core types. Every
//! timestamp is supplied through the [`crate::interfaces::Clock`] seam and
//! stored as Unix milliseconds (UTC). RFC 3339 rendering is provided for
//! operator-facing output only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when converting timestamps.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    /// Input was not a valid RFC 3339 timestamp.
    #[error("invalid rfc3339 timestamp: {0}")]
    Parse(String),
    /// Timestamp falls outside the representable range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// UTC instant expressed as Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Earliest representable timestamp, used for open-ended ranges.
    pub const MIN: Self = Self(i64::MIN);
    /// Latest representable timestamp, used for open-ended ranges.
    pub const MAX: Self = Self(i64::MAX);

    /// Creates a timestamp from Unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns this timestamp advanced by `duration`, saturating at [`Self::MAX`].
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Parses an RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError`] when the input is malformed or out of range.
    pub fn parse_rfc3339(value: &str) -> Result<Self, TimeError> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339)
            .map_err(|err| TimeError::Parse(err.to_string()))?;
        let millis = parsed.unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis).map(Self).map_err(|_| TimeError::OutOfRange(value.to_string()))
    }

    /// Formats the timestamp as RFC 3339.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the instant cannot be represented.
    pub fn to_rfc3339(self) -> Result<String, TimeError> {
        let nanos = i128::from(self.0) * 1_000_000;
        let instant = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|err| TimeError::OutOfRange(err.to_string()))?;
        instant.format(&Rfc3339).map_err(|err| TimeError::OutOfRange(err.to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}ms", self.0),
        }
    }
}

// ============================================================================
// SECTION: Durations
// ============================================================================

/// Returns a duration spanning `days` whole days.
#[must_use]
pub const fn days(days: u64) -> Duration {
    Duration::from_secs(days * 86_400)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn rfc3339_round_trips_through_millis() {
        let ts = Timestamp::parse_rfc3339("2026-03-01T12:00:00.250Z").expect("parse");
        assert_eq!(ts.as_unix_millis(), 1_772_366_400_250);
        let rendered = ts.to_rfc3339().expect("format");
        assert_eq!(Timestamp::parse_rfc3339(&rendered).expect("reparse"), ts);
    }

    #[test]
    fn saturating_add_clamps_at_max() {
        let near_end = Timestamp::from_unix_millis(i64::MAX - 10);
        assert_eq!(near_end.saturating_add(days(1)), Timestamp::MAX);
        let start = Timestamp::from_unix_millis(0);
        assert_eq!(start.saturating_add(days(1)).as_unix_millis(), 86_400_000);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(Timestamp::parse_rfc3339("yesterday"), Err(TimeError::Parse(_))));
    }
}
