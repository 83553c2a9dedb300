// crates/zonegate-core/src/runtime/mod.rs
// ============================================================================
// Module: Zonegate Runtime
// Description: Risk engine, control plane, ledger store, and runtime helpers.
// Purpose: Execute zone operations against a ledger store.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement risk evaluation and the zone control plane.
//! Every external surface calls into [`ZoneControlPlane`] so state changes
//! and their audit trail share one execution path.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clock;
pub mod engine;
pub mod locks;
pub mod risk_engine;
pub mod store;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::ManualClock;
pub use clock::SystemClock;
pub use engine::ControlPlaneConfig;
pub use engine::ControlPlaneError;
pub use engine::DEFAULT_ALERT_TTL;
pub use engine::DEFAULT_MAX_SNAPSHOT_BYTES;
pub use engine::DecideOutcome;
pub use engine::MitigationRequest;
pub use engine::PreAlertRequest;
pub use engine::TransitionRequest;
pub use engine::ZoneControlPlane;
pub use locks::GLOBAL_LOCK_KEY;
pub use locks::ZoneLocks;
pub use risk_engine::RiskEngine;
pub use risk_engine::RiskError;
pub use risk_engine::complexity_level;
pub use risk_engine::compute_complexity;
pub use risk_engine::compute_ethical_primes;
pub use risk_engine::detect_breakpoints;
pub use risk_engine::evaluate_mitigation_effect;
pub use risk_engine::evaluate_signals;
pub use risk_engine::recommend_mitigation;
pub use store::InMemoryLedgerStore;
pub use store::SharedLedgerStore;
pub use telemetry::FileTelemetry;
pub use telemetry::NoopAlertSink;
pub use telemetry::NoopTelemetry;
pub use telemetry::StderrAlertSink;
pub use telemetry::StderrTelemetry;
