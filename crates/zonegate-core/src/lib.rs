// crates/zonegate-core/src/lib.rs
// ============================================================================
// Module: Zonegate Core Library
// Description: Public API surface for the Zonegate core.
// Purpose: Expose zone types, ledger interfaces, and the control plane.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Zonegate core tracks per-zone escalation decisions for a public-safety
//! alerting deployment. A pure risk engine turns zone signals into
//! complexity metrics, ethical primes, and breakpoints; the control plane
//! drives the decision state machine and mitigation controller from them;
//! every change lands in an append-only, hash-chained audit ledger.
//!
//! The crate is storage-agnostic and integrates through [`LedgerStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AlertError;
pub use interfaces::AlertSink;
pub use interfaces::Clock;
pub use interfaces::LedgerBatch;
pub use interfaces::LedgerStore;
pub use interfaces::OperationEvent;
pub use interfaces::OperationOutcome;
pub use interfaces::StoreError;
pub use interfaces::TelemetrySink;
pub use runtime::ControlPlaneConfig;
pub use runtime::ControlPlaneError;
pub use runtime::DecideOutcome;
pub use runtime::InMemoryLedgerStore;
pub use runtime::ManualClock;
pub use runtime::MitigationRequest;
pub use runtime::PreAlertRequest;
pub use runtime::RiskEngine;
pub use runtime::RiskError;
pub use runtime::SharedLedgerStore;
pub use runtime::SystemClock;
pub use runtime::TransitionRequest;
pub use runtime::ZoneControlPlane;
