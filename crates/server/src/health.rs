use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use adweave_store::MemorySessionStore;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<MemorySessionStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub sessions: usize,
    pub checked_at: String,
}

pub fn router(store: Arc<MemorySessionStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "adweave-server",
        sessions: state.store.session_count().await,
        checked_at: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, Json};

    use adweave_core::FrequencyPolicy;
    use adweave_store::{MemorySessionStore, SessionStore};

    use super::{health, HealthState};

    #[tokio::test]
    async fn health_reports_the_session_count() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        store.update("s1", false).await;
        store.update("s2", true).await;

        let Json(payload) = health(State(HealthState { store })).await;

        assert_eq!(payload.status, "ok");
        assert_eq!(payload.service, "adweave-server");
        assert_eq!(payload.sessions, 2);
    }
}
