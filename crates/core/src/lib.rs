//! Deterministic core of the adweave placement pipeline: configuration,
//! domain types, error taxonomy, and the two pre-flight gates. Everything in
//! this crate is synchronous and free of I/O (config file reading aside), so
//! the decision logic stays exhaustively testable.

pub mod config;
pub mod domain;
pub mod errors;
pub mod gates;

pub use domain::conversation::{recent_turns, ChatRole, ChatTurn};
pub use domain::placement::{
    CandidateProduct, CreativeBrief, GateOutcome, OpportunityAssessment, OrchestrationResult,
    PipelineResult, PlacementDecision,
};
pub use domain::session::SessionState;
pub use domain::vertical::{UnknownVertical, Vertical};
pub use errors::PipelineError;
pub use gates::{FrequencyGate, FrequencyPolicy, SafetyGate};
