//! Monetization decision pipeline: capability contracts for the consumed
//! classification/retrieval/generation services, the finite-state workflow
//! engine that wires them with fail-closed short-circuits, and the
//! controller exposing the two public operations.
//!
//! The pipeline never surfaces upstream failures to its caller. A broken
//! classifier, catalog, or generator degrades to a skip outcome; the only
//! persistent side effect of an invocation is the single session-state
//! update committed after the workflow resolves.

pub mod capabilities;
pub mod catalog;
pub mod controller;
pub mod engine;
pub mod llm;
pub mod prompts;

#[cfg(test)]
pub(crate) mod fakes;

pub use capabilities::{
    NarrativeGenerator, OrchestrationGenerator, ProductRetriever, ReceptivityClassifier,
};
pub use catalog::VectorCatalogClient;
pub use controller::PipelineController;
pub use engine::WorkflowEngine;
pub use llm::ChatCompletionsClient;
