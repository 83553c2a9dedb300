// crates/zonegate-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Ledger Store
// Description: Durable LedgerStore backend using SQLite WAL.
// Purpose: Provide production-grade persistence for the zone ledger.
// Dependencies: zonegate-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`LedgerStore`] implementation. Decision
//! records and audit entries are append-only at the schema level, sealed
//! evidence rows reject updates, and every stored record carries a digest
//! that loads verify before decoding.
//!
//! [`LedgerStore`]: zonegate_core::LedgerStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteLedgerStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
