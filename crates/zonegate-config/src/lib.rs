// crates/zonegate-config/src/lib.rs
// ============================================================================
// Module: Zonegate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for zonegate.toml semantics.
// Dependencies: zonegate-core, zonegate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `zonegate-config` defines the configuration model for a zonegate
//! deployment: the zone registry seed, risk model parameters, escalation and
//! mitigation policy, evidence limits, ledger store backend, and telemetry
//! sink. Validation is strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
