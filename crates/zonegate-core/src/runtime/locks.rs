// crates/zonegate-core/src/runtime/locks.rs
// ============================================================================
// Module: Zonegate Zone Locks
// Description: Per-zone exclusive sections for state-mutating operations.
// Purpose: Serialize writers within a zone while zones proceed in parallel.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! Each key maps to its own mutex, created on first use and kept for the
//! life of the registry. Holders re-read zone state after acquiring the
//! lock, so a second writer always validates against the first writer's
//! result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

// ============================================================================
// SECTION: Lock Registry
// ============================================================================

/// Key used for evidence that is not scoped to a zone.
pub const GLOBAL_LOCK_KEY: &str = "*";

/// Registry of per-key mutexes.
#[derive(Debug, Default)]
pub struct ZoneLocks {
    /// Lazily created lock per key.
    locks: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

/// Raised when a lock is poisoned by a panicking holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPoisoned;

impl ZoneLocks {
    /// Returns the lock handle for `key`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`LockPoisoned`] when the registry mutex is poisoned.
    pub fn handle(&self, key: &str) -> Result<Arc<Mutex<()>>, LockPoisoned> {
        let mut guard = self.locks.lock().map_err(|_| LockPoisoned)?;
        let handle = guard.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(())));
        Ok(Arc::clone(handle))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn same_key_shares_a_lock_and_keys_are_independent() {
        let locks = ZoneLocks::default();
        let first = locks.handle("Z1").expect("handle");
        let again = locks.handle("Z1").expect("handle");
        let other = locks.handle("Z2").expect("handle");
        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        let _held = first.lock().expect("lock");
        assert!(other.try_lock().is_ok());
        assert!(again.try_lock().is_err());
    }
}
