// crates/zonegate-core/src/core/mod.rs
// ============================================================================
// Module: Zonegate Core Types
// Description: Canonical zonegate records, risk model, and ledger structures.
// Purpose: Provide stable, serializable types shared by every crate.
// Dependencies: serde, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! Core types define decision records, the risk model, mitigations, audit
//! entries, and evidence. They carry no I/O; persistence and orchestration
//! live behind [`crate::interfaces`] and in [`crate::runtime`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod alert;
pub mod audit;
pub mod dashboard;
pub mod evidence;
pub mod hashing;
pub mod identifiers;
pub mod mitigation;
pub mod risk;
pub mod state;
pub mod time;
pub mod zones;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use alert::AlertCertainty;
pub use alert::AlertMessageType;
pub use alert::AlertNotice;
pub use alert::AlertSeverity;
pub use alert::AlertUrgency;
pub use audit::AuditEntry;
pub use audit::AuditFilter;
pub use audit::AuditLog;
pub use audit::AuditPage;
pub use audit::AuditResult;
pub use audit::IntegrityReport;
pub use audit::IntegrityViolation;
pub use audit::OperationType;
pub use audit::ViolationKind;
pub use audit::seal_after;
pub use audit::verify_chain;
pub use dashboard::DashboardView;
pub use evidence::ArchiveRequest;
pub use evidence::DECISION_STATE_EVIDENCE;
pub use evidence::DEFAULT_RETENTION;
pub use evidence::EvidenceFilter;
pub use evidence::EvidenceRecord;
pub use evidence::evidence_id_for;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::GENESIS_HASH;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::AuditId;
pub use identifiers::DecisionId;
pub use identifiers::EvidenceId;
pub use identifiers::MitigationId;
pub use identifiers::OperatorId;
pub use identifiers::RISK_ENGINE_OPERATOR;
pub use identifiers::ZoneId;
pub use mitigation::MeasureType;
pub use mitigation::Mitigation;
pub use mitigation::MitigationEffect;
pub use mitigation::MitigationPolicy;
pub use mitigation::MitigationRecommendation;
pub use mitigation::TriggerType;
pub use risk::AssessmentSnapshot;
pub use risk::BiasInputs;
pub use risk::Breakpoint;
pub use risk::BreakpointKind;
pub use risk::ComplexityLevel;
pub use risk::ComplexityMetrics;
pub use risk::ComplexityWeights;
pub use risk::EscalationPolicy;
pub use risk::EthicalPrimes;
pub use risk::FalseNegativeInputs;
pub use risk::FalsePositiveInputs;
pub use risk::IntegrityInputs;
pub use risk::NormalizationCaps;
pub use risk::PrimeCeilings;
pub use risk::RiskAssessment;
pub use risk::RiskModel;
pub use risk::SignalSnapshot;
pub use state::DecisionLevel;
pub use state::DecisionState;
pub use state::TransitionOrigin;
pub use state::allowed_targets;
pub use state::is_transition_allowed;
pub use time::Timestamp;
pub use zones::ZoneRegistry;
pub use zones::ZoneRegistryError;
