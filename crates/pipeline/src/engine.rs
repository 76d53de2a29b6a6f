use std::sync::Arc;

use adweave_core::{
    recent_turns, ChatTurn, CreativeBrief, OpportunityAssessment, OrchestrationResult,
    PipelineError, PipelineResult, PlacementDecision, Vertical,
};

use crate::capabilities::{
    NarrativeGenerator, OrchestrationGenerator, ProductRetriever, ReceptivityClassifier,
};
use crate::llm::DECISION_CONTEXT_TURNS;

/// Stages of one pipeline invocation. Every run starts at `DecisionGate` and
/// terminates in `Done` with a fully populated result; a stage that fails or
/// declines falls through to a skip outcome rather than surfacing errors.
#[derive(Debug)]
enum Stage {
    DecisionGate,
    Orchestrate(OpportunityAssessment),
    Generate(CreativeBrief),
    Done(PipelineResult),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Self::DecisionGate => "decision_gate",
            Self::Orchestrate(_) => "orchestrate",
            Self::Generate(_) => "generate",
            Self::Done(_) => "done",
        }
    }
}

/// Finite-state pipeline wiring classification, retrieval/orchestration,
/// and host generation, with skip short-circuits between stages. The
/// branching is four nodes deep, so a plain enum + match dispatcher replaces
/// any generic graph machinery.
///
/// Stage failures carry the error taxonomy: unreachable or erroring
/// capabilities classify as [`PipelineError::Upstream`], non-conforming
/// output and unusable input as [`PipelineError::Validation`]. Both resolve
/// to a skip in [`WorkflowEngine::run`].
pub struct WorkflowEngine {
    classifier: Arc<dyn ReceptivityClassifier>,
    retriever: Arc<dyn ProductRetriever>,
    orchestrator: Arc<dyn OrchestrationGenerator>,
    narrator: Arc<dyn NarrativeGenerator>,
    top_k: usize,
}

impl WorkflowEngine {
    pub fn new(
        classifier: Arc<dyn ReceptivityClassifier>,
        retriever: Arc<dyn ProductRetriever>,
        orchestrator: Arc<dyn OrchestrationGenerator>,
        narrator: Arc<dyn NarrativeGenerator>,
        top_k: usize,
    ) -> Self {
        Self { classifier, retriever, orchestrator, narrator, top_k }
    }

    pub async fn run(
        &self,
        vertical: Vertical,
        history: &[ChatTurn],
        correlation_id: &str,
    ) -> PipelineResult {
        let mut stage = Stage::DecisionGate;
        loop {
            let stage_name = stage.name();
            let resolved = match stage {
                Stage::DecisionGate => self.decision_gate(history, correlation_id).await,
                Stage::Orchestrate(assessment) => {
                    self.orchestrate(vertical, history, assessment, correlation_id).await
                }
                Stage::Generate(brief) => {
                    self.generate(vertical, history, brief, correlation_id).await
                }
                Stage::Done(result) => return result,
            };
            stage = match resolved {
                Ok(next) => next,
                Err(error) => {
                    tracing::warn!(
                        event_name = "pipeline.fail_closed",
                        correlation_id,
                        stage = stage_name,
                        error = %error,
                        "stage failed, skipping placement"
                    );
                    Stage::Done(PipelineResult::skip())
                }
            };
        }
    }

    /// Receptivity check over the recent history. A missed placement is
    /// cheaper than a disruptive one, so classifier failures never escalate.
    async fn decision_gate(
        &self,
        history: &[ChatTurn],
        correlation_id: &str,
    ) -> Result<Stage, PipelineError> {
        let context = recent_turns(history, DECISION_CONTEXT_TURNS);

        let assessment = self
            .classifier
            .assess(context)
            .await
            .map_err(|error| PipelineError::Upstream(error.to_string()))?;

        tracing::info!(
            event_name = "pipeline.decision_gate.assessed",
            correlation_id,
            opportunity = assessment.opportunity,
            reasoning = %assessment.reasoning,
            "receptivity assessed"
        );

        Ok(if assessment.opportunity {
            Stage::Orchestrate(assessment)
        } else {
            Stage::Done(PipelineResult::skip())
        })
    }

    /// Retrieval plus candidate selection. An empty candidate set
    /// short-circuits to skip before any generation call is made.
    async fn orchestrate(
        &self,
        vertical: Vertical,
        history: &[ChatTurn],
        _assessment: OpportunityAssessment,
        correlation_id: &str,
    ) -> Result<Stage, PipelineError> {
        let query = match history.last() {
            Some(turn) if !turn.content.is_empty() => turn.content.as_str(),
            _ => {
                return Err(PipelineError::Validation(
                    "conversation history has no latest utterance".to_string(),
                ))
            }
        };

        let candidates = self
            .retriever
            .search(query, vertical, self.top_k)
            .await
            .map_err(|error| PipelineError::Upstream(error.to_string()))?;

        if candidates.is_empty() {
            tracing::info!(
                event_name = "pipeline.orchestrator.no_candidates",
                correlation_id,
                vertical = vertical.as_str(),
                "no relevant products, skipping without generation"
            );
            return Ok(Stage::Done(PipelineResult::skip()));
        }

        let raw = self
            .orchestrator
            .orchestrate(history, vertical, &candidates)
            .await
            .map_err(|error| PipelineError::Upstream(error.to_string()))?;

        let result = decode_orchestration(&raw)?;

        match result.decision {
            PlacementDecision::Inject => {
                tracing::info!(
                    event_name = "pipeline.orchestrator.selected",
                    correlation_id,
                    product_id = result.product_id.as_deref().unwrap_or_default(),
                    "placement selected"
                );
                match result.creative_brief {
                    Some(brief) => Ok(Stage::Generate(brief)),
                    None => Err(PipelineError::Validation(
                        "inject decision is missing creative_brief".to_string(),
                    )),
                }
            }
            PlacementDecision::Skip => Ok(Stage::Done(PipelineResult::skip())),
        }
    }

    /// Final narration with the brief woven in. A generation failure still
    /// resolves to a well-formed skip.
    async fn generate(
        &self,
        vertical: Vertical,
        history: &[ChatTurn],
        brief: CreativeBrief,
        correlation_id: &str,
    ) -> Result<Stage, PipelineError> {
        let text = self
            .narrator
            .narrate(history, vertical, &brief)
            .await
            .map_err(|error| PipelineError::Upstream(error.to_string()))?;

        Ok(Stage::Done(PipelineResult::inject(text)))
    }
}

/// Strict schema decode of the orchestration capability's raw output. Any
/// non-conforming output is a validation failure; there is no pattern-based
/// salvage of malformed text.
fn decode_orchestration(raw: &str) -> Result<OrchestrationResult, PipelineError> {
    let decoded: OrchestrationResult = serde_json::from_str(raw.trim()).map_err(|error| {
        PipelineError::Validation(format!("orchestration output is not valid JSON: {error}"))
    })?;
    decoded.validate()?;
    Ok(decoded)
}
