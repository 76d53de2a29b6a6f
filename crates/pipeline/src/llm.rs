use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use adweave_core::config::LlmConfig;
use adweave_core::{
    recent_turns, CandidateProduct, ChatRole, ChatTurn, CreativeBrief, OpportunityAssessment,
    Vertical,
};

use crate::capabilities::{NarrativeGenerator, OrchestrationGenerator, ReceptivityClassifier};
use crate::prompts;

/// Turns of context handed to the receptivity classifier. Kept small so the
/// per-turn check stays cheap.
pub const DECISION_CONTEXT_TURNS: usize = 4;

#[derive(Clone, Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    fn from_turn(turn: &ChatTurn) -> Self {
        let role = match turn.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        };
        Self { role, content: turn.content.clone() }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// OpenAI-compatible chat-completions client backing the classification,
/// orchestration, and narration capabilities. Transient transport failures
/// are retried with a short linear backoff before the engine's fail-closed
/// policy takes over.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    decision_model: String,
    creative_model: String,
    max_retries: u32,
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            decision_model: config.decision_model.clone(),
            creative_model: config.creative_model.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
        });

        let mut attempt = 0;
        loop {
            match self.send(&body).await {
                Ok(content) => return Ok(content),
                Err(error) if attempt < self.max_retries && is_retryable(&error) => {
                    attempt += 1;
                    tracing::warn!(
                        event_name = "llm.retry",
                        attempt,
                        error = %error,
                        "chat completion failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send(&self, body: &serde_json::Value) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut request = self.http.post(&url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("chat completion request to {url} failed"))?
            .error_for_status()
            .context("chat completion returned an error status")?;

        let payload: ChatCompletionResponse =
            response.json().await.context("chat completion body was not valid JSON")?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion returned no choices"))
    }
}

/// Transport failures and server-side errors are worth another attempt; a
/// client error (bad request, rejected credentials) will not improve on
/// retry and fails immediately.
fn is_retryable(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<reqwest::Error>()
        .and_then(|source| source.status())
        .map_or(true, |status| !status.is_client_error())
}

fn history_digest(history: &[ChatTurn]) -> String {
    // The instruction text receives the history as a JSON transcript.
    serde_json::to_string(history).unwrap_or_default()
}

fn format_candidates(candidates: &[CandidateProduct]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let attributes = serde_json::to_string(&candidate.attributes).unwrap_or_default();
            format!(
                "Product {number}:\nID: {id}\nDescription: {document}\nAttributes: {attributes}",
                number = index + 1,
                id = candidate.id,
                document = candidate.document,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl ReceptivityClassifier for ChatCompletionsClient {
    async fn assess(&self, context_turns: &[ChatTurn]) -> Result<OpportunityAssessment> {
        let window = recent_turns(context_turns, DECISION_CONTEXT_TURNS);
        let messages = [
            ChatMessage::system(prompts::DECISION_GATE_PROMPT),
            ChatMessage {
                role: "user",
                content: format!(
                    "Conversation history (last {DECISION_CONTEXT_TURNS} turns):\n{}",
                    history_digest(window)
                ),
            },
        ];

        let content = self.chat(&self.decision_model, &messages, 0.0).await?;
        serde_json::from_str::<OpportunityAssessment>(content.trim())
            .with_context(|| format!("classifier output did not match schema: {content}"))
    }
}

#[async_trait]
impl OrchestrationGenerator for ChatCompletionsClient {
    async fn orchestrate(
        &self,
        history: &[ChatTurn],
        vertical: Vertical,
        candidates: &[CandidateProduct],
    ) -> Result<String> {
        let messages = [
            ChatMessage::system(prompts::orchestrator_prompt(vertical)),
            ChatMessage {
                role: "user",
                content: format!(
                    "Conversation history:\n{}\n\nCandidate products:\n{}",
                    history_digest(history),
                    format_candidates(candidates)
                ),
            },
        ];

        self.chat(&self.creative_model, &messages, 0.7).await
    }
}

#[async_trait]
impl NarrativeGenerator for ChatCompletionsClient {
    async fn narrate(
        &self,
        history: &[ChatTurn],
        vertical: Vertical,
        brief: &CreativeBrief,
    ) -> Result<String> {
        let mut messages = vec![
            ChatMessage::system(prompts::host_prompt(vertical)),
            ChatMessage::system(prompts::brief_instruction(brief)),
        ];
        messages.extend(history.iter().map(ChatMessage::from_turn));

        self.chat(&self.creative_model, &messages, 0.7).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use adweave_core::CandidateProduct;

    use super::{format_candidates, is_retryable};

    #[test]
    fn candidates_are_numbered_with_ids_and_documents() {
        let candidates = vec![
            CandidateProduct {
                id: "jack-daniels".to_string(),
                document: "A bottle of Tennessee whiskey.".to_string(),
                attributes: BTreeMap::from([(
                    "target_vertical".to_string(),
                    "gaming".to_string(),
                )]),
            },
            CandidateProduct {
                id: "red-bull".to_string(),
                document: "An energy drink.".to_string(),
                attributes: BTreeMap::new(),
            },
        ];

        let formatted = format_candidates(&candidates);

        assert!(formatted.contains("Product 1:\nID: jack-daniels"));
        assert!(formatted.contains("Product 2:\nID: red-bull"));
        assert!(formatted.contains("target_vertical"));
    }

    fn status_error(status: http::StatusCode) -> anyhow::Error {
        let response = http::Response::builder().status(status).body("body").expect("response");
        let error = reqwest::Response::from(response)
            .error_for_status()
            .expect_err("status should be an error");
        anyhow::Error::new(error)
    }

    #[test]
    fn client_error_statuses_are_not_retried() {
        assert!(!is_retryable(&status_error(http::StatusCode::UNAUTHORIZED)));
        assert!(!is_retryable(&status_error(http::StatusCode::BAD_REQUEST)));
    }

    #[test]
    fn server_error_statuses_are_retried() {
        assert!(is_retryable(&status_error(http::StatusCode::SERVICE_UNAVAILABLE)));
    }

    #[test]
    fn transport_failures_are_retried() {
        assert!(is_retryable(&anyhow::anyhow!("connection reset by peer")));
    }
}
