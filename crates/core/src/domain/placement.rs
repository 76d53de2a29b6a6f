use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// A ranked catalog hit. Owned by the external catalog; the pipeline only
/// reads filtered copies for the lifetime of one invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProduct {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Receptivity verdict for the current conversational moment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpportunityAssessment {
    pub opportunity: bool,
    pub reasoning: String,
}

/// Structured directive for how the narrative generator must work a product
/// into the reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct CreativeBrief {
    pub placement_type: String,
    pub goal: String,
    pub tone: String,
    pub implementation_details: String,
    pub example_narration: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementDecision {
    Inject,
    Skip,
}

/// Raw orchestration verdict, decoded strictly from capability output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct OrchestrationResult {
    pub decision: PlacementDecision,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub creative_brief: Option<CreativeBrief>,
}

impl OrchestrationResult {
    /// An inject decision without a product id and brief is malformed and
    /// must never reach the generation stage.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.decision == PlacementDecision::Inject {
            if self.product_id.is_none() {
                return Err(PipelineError::Validation(
                    "inject decision is missing product_id".to_string(),
                ));
            }
            if self.creative_brief.is_none() {
                return Err(PipelineError::Validation(
                    "inject decision is missing creative_brief".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The externally visible outcome of one pipeline invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: PlacementDecision,
    pub response_text: Option<String>,
}

impl PipelineResult {
    pub fn inject(response_text: impl Into<String>) -> Self {
        Self { status: PlacementDecision::Inject, response_text: Some(response_text.into()) }
    }

    pub fn skip() -> Self {
        Self { status: PlacementDecision::Skip, response_text: None }
    }
}

/// Pre-flight gate verdict returned to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub proceed: bool,
    pub reason: String,
}

impl GateOutcome {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self { proceed: true, reason: reason.into() }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self { proceed: false, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CreativeBrief, OrchestrationResult, PipelineResult, PlacementDecision,
    };

    fn brief() -> CreativeBrief {
        CreativeBrief {
            placement_type: "Environmental Detail".to_string(),
            goal: "Ground the scene in a gritty mood.".to_string(),
            tone: "Serious and moody".to_string(),
            implementation_details: "Mention the bottle on the bar as scenery.".to_string(),
            example_narration: "A bottle of Jack Daniel's sits on the bar.".to_string(),
        }
    }

    #[test]
    fn skip_decision_validates_without_brief() {
        let result = OrchestrationResult {
            decision: PlacementDecision::Skip,
            product_id: None,
            creative_brief: None,
        };
        assert!(result.validate().is_ok());
    }

    #[test]
    fn inject_decision_requires_product_and_brief() {
        let missing_brief = OrchestrationResult {
            decision: PlacementDecision::Inject,
            product_id: Some("jack-daniels".to_string()),
            creative_brief: None,
        };
        assert!(missing_brief.validate().is_err());

        let missing_product = OrchestrationResult {
            decision: PlacementDecision::Inject,
            product_id: None,
            creative_brief: Some(brief()),
        };
        assert!(missing_product.validate().is_err());

        let complete = OrchestrationResult {
            decision: PlacementDecision::Inject,
            product_id: Some("jack-daniels".to_string()),
            creative_brief: Some(brief()),
        };
        assert!(complete.validate().is_ok());
    }

    #[test]
    fn orchestration_decode_rejects_unknown_fields() {
        let raw = r#"{"decision":"skip","confidence":0.9}"#;
        assert!(serde_json::from_str::<OrchestrationResult>(raw).is_err());
    }

    #[test]
    fn orchestration_decode_accepts_minified_skip() {
        let raw = r#"{"decision":"skip"}"#;
        let decoded: OrchestrationResult = serde_json::from_str(raw).expect("decode");
        assert_eq!(decoded.decision, PlacementDecision::Skip);
        assert!(decoded.product_id.is_none());
    }

    #[test]
    fn pipeline_result_text_is_absent_iff_skip() {
        assert!(PipelineResult::skip().response_text.is_none());
        assert_eq!(
            PipelineResult::inject("The bar is quiet.").response_text.as_deref(),
            Some("The bar is quiet.")
        );
    }
}
