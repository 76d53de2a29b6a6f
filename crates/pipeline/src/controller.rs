use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use adweave_core::{
    ChatTurn, FrequencyGate, GateOutcome, PipelineResult, PlacementDecision, SafetyGate, Vertical,
};
use adweave_store::SessionStore;

use crate::engine::WorkflowEngine;

/// Composes the pre-flight gates and the workflow engine into the two public
/// operations of the service. All collaborators are injected at
/// construction; there is no process-wide state.
pub struct PipelineController {
    store: Arc<dyn SessionStore>,
    safety_gate: SafetyGate,
    frequency_gate: FrequencyGate,
    engine: WorkflowEngine,
}

impl PipelineController {
    pub fn new(
        store: Arc<dyn SessionStore>,
        safety_gate: SafetyGate,
        frequency_gate: FrequencyGate,
        engine: WorkflowEngine,
    ) -> Self {
        Self { store, safety_gate, frequency_gate, engine }
    }

    /// Cheap per-turn pre-flight: safety first, then frequency/cooldown,
    /// short-circuiting on the first failure. Reads session state but never
    /// writes it.
    pub async fn check_opportunity(
        &self,
        session_id: &str,
        last_message: Option<&str>,
    ) -> GateOutcome {
        let safety = self.safety_gate.evaluate(last_message);
        if !safety.proceed {
            tracing::info!(
                event_name = "gates.safety_rejected",
                session_id,
                reason = %safety.reason,
                "pre-flight rejected"
            );
            return safety;
        }

        let state = self.store.get(session_id).await;
        let outcome = self.frequency_gate.evaluate(state.as_ref(), Utc::now().timestamp());
        if !outcome.proceed {
            tracing::info!(
                event_name = "gates.frequency_rejected",
                session_id,
                reason = %outcome.reason,
                "pre-flight rejected"
            );
        }
        outcome
    }

    /// Runs the full workflow to completion, then commits exactly one
    /// session-state update. Every completed invocation counts as a turn,
    /// whether the outcome was an injection, a creative skip, or a
    /// fail-closed skip; a caller that cancels mid-flight commits nothing.
    pub async fn get_response(
        &self,
        session_id: &str,
        vertical: Vertical,
        history: &[ChatTurn],
    ) -> PipelineResult {
        let correlation_id = Uuid::new_v4().to_string();

        let result = self.engine.run(vertical, history, &correlation_id).await;

        let ad_shown = result.status == PlacementDecision::Inject;
        let state = self.store.update(session_id, ad_shown).await;

        tracing::info!(
            event_name = "pipeline.completed",
            session_id,
            correlation_id = %correlation_id,
            status = match result.status {
                PlacementDecision::Inject => "inject",
                PlacementDecision::Skip => "skip",
            },
            total_turns = state.total_turns,
            ads_shown = state.ads_shown,
            "pipeline invocation resolved"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use adweave_core::{
        ChatTurn, FrequencyGate, FrequencyPolicy, PlacementDecision, SafetyGate, Vertical,
    };
    use adweave_store::{MemorySessionStore, SessionStore};

    use super::PipelineController;
    use crate::engine::WorkflowEngine;
    use crate::fakes::{FakeClassifier, FakeNarrator, FakeOrchestrator, FakeRetriever};

    const NARRATION: &str = "A bottle of Jack Daniel's sits on the bar.";

    fn inject_payload() -> String {
        format!(
            r#"{{"decision":"inject","product_id":"jack-daniels","creative_brief":{{"placement_type":"Environmental Detail","goal":"Ground the scene","tone":"gritty","implementation_details":"background scenery","example_narration":"{NARRATION}"}}}}"#
        )
    }

    fn history() -> Vec<ChatTurn> {
        vec![ChatTurn::user("I sit down at the bar and order a drink.")]
    }

    fn controller_with(
        store: Arc<MemorySessionStore>,
        classifier: Arc<FakeClassifier>,
        orchestration: String,
    ) -> PipelineController {
        let engine = WorkflowEngine::new(
            classifier,
            FakeRetriever::with_candidates(vec![FakeRetriever::candidate("jack-daniels")]),
            FakeOrchestrator::returning(orchestration),
            FakeNarrator::returning(format!("You take a seat. {NARRATION}")),
            5,
        );
        PipelineController::new(
            store,
            SafetyGate::default(),
            FrequencyGate::new(FrequencyPolicy::default()),
            engine,
        )
    }

    fn fresh_controller(store: Arc<MemorySessionStore>) -> PipelineController {
        controller_with(store, FakeClassifier::opportunity(true), inject_payload())
    }

    #[tokio::test]
    async fn safety_rejection_short_circuits_check() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        let controller = fresh_controller(store);

        let outcome = controller.check_opportunity("s1", Some("I am stuck")).await;

        assert!(!outcome.proceed);
        assert!(outcome.reason.contains("High-consequence keyword"));
    }

    #[tokio::test]
    async fn new_session_with_safe_message_proceeds() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        let controller = fresh_controller(store);

        let outcome = controller.check_opportunity("s1", Some("I look around the room")).await;

        assert!(outcome.proceed);
        assert!(outcome.reason.contains("new session"));
    }

    #[tokio::test]
    async fn successful_injection_returns_narration_and_records_the_ad() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        let controller = fresh_controller(store.clone());

        let result = controller.get_response("s1", Vertical::Gaming, &history()).await;

        assert_eq!(result.status, PlacementDecision::Inject);
        assert!(result.response_text.expect("text").contains(NARRATION));

        let state = store.get("s1").await.expect("state");
        assert_eq!(state.total_turns, 1);
        assert_eq!(state.ads_shown, 1);
        assert_eq!(state.last_ad_turn, 1);
    }

    #[tokio::test]
    async fn each_completed_invocation_commits_exactly_one_turn() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        let controller =
            controller_with(store.clone(), FakeClassifier::opportunity(false), inject_payload());

        for _ in 0..3 {
            controller.get_response("s1", Vertical::Gaming, &history()).await;
        }

        let state = store.get("s1").await.expect("state");
        assert_eq!(state.total_turns, 3);
        assert_eq!(state.ads_shown, 0);
    }

    #[tokio::test]
    async fn fail_closed_skip_still_consumes_a_turn() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        let controller =
            controller_with(store.clone(), FakeClassifier::failing(), inject_payload());

        let result = controller.get_response("s1", Vertical::Gaming, &history()).await;

        assert_eq!(result.status, PlacementDecision::Skip);
        let state = store.get("s1").await.expect("state");
        assert_eq!(state.total_turns, 1);
        assert_eq!(state.ads_shown, 0);
    }

    #[tokio::test]
    async fn frequency_gate_blocks_the_turn_after_an_injection() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        let controller = fresh_controller(store);

        let result = controller.get_response("s1", Vertical::Gaming, &history()).await;
        assert_eq!(result.status, PlacementDecision::Inject);

        let outcome = controller.check_opportunity("s1", Some("I keep exploring")).await;

        assert!(!outcome.proceed);
        assert!(outcome.reason.contains("turn frequency cap not met"));
    }

    #[tokio::test]
    async fn gated_sequences_saturate_ads_shown_at_the_ceiling() {
        // spacing and cooldown zeroed out so only the ad ceiling can block
        let policy = FrequencyPolicy {
            min_turns_between_ads: 0,
            cooldown_seconds: 0,
            ..FrequencyPolicy::default()
        };
        let store = Arc::new(MemorySessionStore::new(policy));
        let engine = WorkflowEngine::new(
            FakeClassifier::opportunity(true),
            FakeRetriever::with_candidates(vec![FakeRetriever::candidate("jack-daniels")]),
            FakeOrchestrator::returning(inject_payload()),
            FakeNarrator::returning(format!("You take a seat. {NARRATION}")),
            5,
        );
        let controller = PipelineController::new(
            store.clone(),
            SafetyGate::default(),
            FrequencyGate::new(policy),
            engine,
        );

        for _ in 0..40 {
            let outcome = controller.check_opportunity("s1", Some("I look around the bar")).await;
            if outcome.proceed {
                controller.get_response("s1", Vertical::Gaming, &history()).await;
            }
        }

        let state = store.get("s1").await.expect("state");
        assert_eq!(state.ads_shown, policy.max_ads_per_session);

        let blocked = controller.check_opportunity("s1", Some("still exploring")).await;
        assert!(!blocked.proceed);
        assert!(blocked.reason.contains("session ad limit reached"));
    }

    #[tokio::test]
    async fn sessions_are_isolated_from_each_other() {
        let store = Arc::new(MemorySessionStore::new(FrequencyPolicy::default()));
        let controller = fresh_controller(store.clone());

        controller.get_response("busy", Vertical::Gaming, &history()).await;

        let outcome = controller.check_opportunity("idle", Some("hello there")).await;
        assert!(outcome.proceed);
        assert!(store.get("idle").await.is_none());
    }
}
