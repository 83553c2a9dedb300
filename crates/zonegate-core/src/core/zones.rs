// crates/zonegate-core/src/core/zones.rs
// ============================================================================
// Module: Zonegate Zone Registry
// Description: Pre-provisioned set of zones the control plane will act on.
// Purpose: Reject operations against unknown or malformed zone identifiers.
// Dependencies: thiserror, crate::core::identifiers
// ============================================================================

//! ## Overview
//! Zones have no lifecycle of their own: they are seeded from configuration
//! and every other component operates per zone. Construction validates the
//! identifier format and rejects duplicates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::identifiers::ZoneId;
use crate::core::identifiers::is_valid_zone_id;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while seeding the registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneRegistryError {
    /// Identifier is malformed.
    #[error("invalid zone id: {0}")]
    InvalidZoneId(String),
    /// Identifier was seeded twice.
    #[error("duplicate zone id: {0}")]
    DuplicateZoneId(String),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Immutable set of known zones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneRegistry {
    /// Known zones in sorted order.
    zones: BTreeSet<ZoneId>,
}

impl ZoneRegistry {
    /// Builds a registry from seed identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneRegistryError`] for malformed or duplicated ids.
    pub fn new<I, Z>(seed: I) -> Result<Self, ZoneRegistryError>
    where
        I: IntoIterator<Item = Z>,
        Z: Into<ZoneId>,
    {
        let mut zones = BTreeSet::new();
        for zone in seed {
            let zone = zone.into();
            if !is_valid_zone_id(zone.as_str()) {
                return Err(ZoneRegistryError::InvalidZoneId(zone.to_string()));
            }
            if !zones.insert(zone.clone()) {
                return Err(ZoneRegistryError::DuplicateZoneId(zone.to_string()));
            }
        }
        Ok(Self {
            zones,
        })
    }

    /// Returns true when the zone is registered.
    #[must_use]
    pub fn contains(&self, zone_id: &ZoneId) -> bool {
        self.zones.contains(zone_id)
    }

    /// Iterates registered zones in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &ZoneId> {
        self.zones.iter()
    }

    /// Returns the number of registered zones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns true when no zones are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
