use serde::{Deserialize, Serialize};

use crate::domain::placement::GateOutcome;
use crate::domain::session::SessionState;

/// Keywords signalling frustration or a request for help. Any hit blocks a
/// placement for the current turn.
pub const DEFAULT_BLOCKED_KEYWORDS: [&str; 5] = ["help", "stuck", "hint", "rule", "confused"];

/// Stateless keyword filter over the user's latest message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafetyGate {
    keywords: Vec<String>,
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKED_KEYWORDS.iter().map(|keyword| keyword.to_string()).collect())
    }
}

impl SafetyGate {
    pub fn new(keywords: Vec<String>) -> Self {
        let keywords =
            keywords.into_iter().map(|keyword| keyword.to_ascii_lowercase()).collect();
        Self { keywords }
    }

    /// Case-insensitive substring scan. Absent or empty messages pass
    /// trivially. O(keywords x message length), no I/O.
    pub fn evaluate(&self, last_message: Option<&str>) -> GateOutcome {
        let message = match last_message {
            Some(message) if !message.is_empty() => message.to_ascii_lowercase(),
            _ => return GateOutcome::pass("Safety gate: passed (no message)"),
        };

        if self.keywords.iter().any(|keyword| message.contains(keyword.as_str())) {
            return GateOutcome::reject(
                "Safety gate: rejected (High-consequence keyword detected)",
            );
        }

        GateOutcome::pass("Safety gate: passed")
    }
}

/// Frequency and cooldown knobs, shared by the gate and the session store's
/// fresh-state defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FrequencyPolicy {
    pub max_ads_per_session: u32,
    pub min_turns_between_ads: u32,
    pub cooldown_seconds: i64,
    pub session_ttl_secs: u64,
}

impl Default for FrequencyPolicy {
    fn default() -> Self {
        Self {
            max_ads_per_session: 15,
            min_turns_between_ads: 3,
            cooldown_seconds: 15,
            session_ttl_secs: 7_200,
        }
    }
}

/// Stateful rate/cooldown policy. The caller supplies the session state read
/// from the store (or `None` for an unseen session) and the current unix
/// time, keeping this a pure decision function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrequencyGate {
    pub policy: FrequencyPolicy,
}

impl FrequencyGate {
    pub fn new(policy: FrequencyPolicy) -> Self {
        Self { policy }
    }

    /// Checks run in fixed priority order, returning on the first failure:
    /// session ad ceiling, then turn spacing, then time cooldown.
    pub fn evaluate(&self, state: Option<&SessionState>, now_unix: i64) -> GateOutcome {
        let state = match state {
            Some(state) => state,
            None => return GateOutcome::pass("Frequency gate: passed (new session)"),
        };

        if state.ads_shown >= self.policy.max_ads_per_session {
            return GateOutcome::reject("Frequency gate: rejected (session ad limit reached)");
        }

        if (state.total_turns as i64 - state.last_ad_turn)
            < self.policy.min_turns_between_ads as i64
        {
            return GateOutcome::reject("Frequency gate: rejected (turn frequency cap not met)");
        }

        if (now_unix - state.last_ad_timestamp) < self.policy.cooldown_seconds {
            return GateOutcome::reject("Frequency gate: rejected (cooldown period active)");
        }

        GateOutcome::pass("Frequency gate: passed")
    }
}
