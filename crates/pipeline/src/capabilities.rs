use anyhow::Result;
use async_trait::async_trait;

use adweave_core::{
    CandidateProduct, ChatTurn, CreativeBrief, OpportunityAssessment, Vertical,
};

/// Classifies whether the current conversational moment is receptive to a
/// commercial mention.
#[async_trait]
pub trait ReceptivityClassifier: Send + Sync {
    async fn assess(&self, context_turns: &[ChatTurn]) -> Result<OpportunityAssessment>;
}

/// Semantic search over the product catalog, pre-filtered by vertical.
#[async_trait]
pub trait ProductRetriever: Send + Sync {
    async fn search(
        &self,
        query: &str,
        vertical: Vertical,
        top_k: usize,
    ) -> Result<Vec<CandidateProduct>>;
}

/// Structured-generation capability that filters the candidates and either
/// selects one with a creative brief or declines. Returns raw text; the
/// workflow engine owns schema validation.
#[async_trait]
pub trait OrchestrationGenerator: Send + Sync {
    async fn orchestrate(
        &self,
        history: &[ChatTurn],
        vertical: Vertical,
        candidates: &[CandidateProduct],
    ) -> Result<String>;
}

/// Produces the final reply text, constrained to insert the brief's example
/// narration near-verbatim as a minor detail.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn narrate(
        &self,
        history: &[ChatTurn],
        vertical: Vertical,
        brief: &CreativeBrief,
    ) -> Result<String>;
}
