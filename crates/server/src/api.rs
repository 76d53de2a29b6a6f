use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use adweave_core::{ChatTurn, PlacementDecision, Vertical};
use adweave_pipeline::PipelineController;

#[derive(Clone)]
pub struct ApiState {
    pub controller: Arc<PipelineController>,
}

/// Payload for the per-turn pre-flight check.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckRequest {
    pub session_id: String,
    #[serde(default)]
    pub last_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckResponse {
    pub proceed: bool,
    pub reason: String,
}

/// Payload for the full monetized-response generation call.
#[derive(Clone, Debug, Deserialize)]
pub struct AdRequest {
    pub session_id: String,
    pub app_vertical: String,
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdResponse {
    pub status: PlacementDecision,
    pub response_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn router(controller: Arc<PipelineController>) -> Router {
    Router::new()
        .route("/v1/check-opportunity", post(check_opportunity))
        .route("/v1/get-response", post(get_response))
        .with_state(ApiState { controller })
}

/// Fast, deterministic pre-flight. Intended to be called on every
/// conversational turn before the expensive generation call.
pub async fn check_opportunity(
    State(state): State<ApiState>,
    Json(request): Json<CheckRequest>,
) -> Json<CheckResponse> {
    let outcome = state
        .controller
        .check_opportunity(&request.session_id, request.last_message.as_deref())
        .await;

    Json(CheckResponse { proceed: outcome.proceed, reason: outcome.reason })
}

/// Runs the full placement workflow. An unsupported vertical is the single
/// caller-visible error; everything downstream fails closed to a skip.
pub async fn get_response(
    State(state): State<ApiState>,
    Json(request): Json<AdRequest>,
) -> Result<Json<AdResponse>, (StatusCode, Json<ErrorBody>)> {
    let vertical: Vertical = request
        .app_vertical
        .parse()
        .map_err(|error: adweave_core::UnknownVertical| {
            (StatusCode::BAD_REQUEST, Json(ErrorBody { error: error.to_string() }))
        })?;

    let result = state
        .controller
        .get_response(&request.session_id, vertical, &request.conversation_history)
        .await;

    Ok(Json(AdResponse { status: result.status, response_text: result.response_text }))
}
