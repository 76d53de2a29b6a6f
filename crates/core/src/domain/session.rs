use serde::{Deserialize, Serialize};

/// Per-session placement counters. This is the wire format of the TTL
/// key-value entry keyed by session id.
///
/// Invariants maintained by [`SessionState::record_turn`]:
/// - `total_turns` increases by exactly 1 per completed pipeline invocation
/// - `last_ad_turn` is monotonically non-decreasing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionState {
    pub total_turns: u32,
    pub ads_shown: u32,
    pub last_ad_turn: i64,
    pub last_ad_timestamp: i64,
}

impl SessionState {
    /// State of a session that has never been written. `last_ad_turn` starts
    /// at `-min_turns_between_ads` so the spacing check never blocks the
    /// first placement.
    pub fn fresh(min_turns_between_ads: u32) -> Self {
        Self {
            total_turns: 0,
            ads_shown: 0,
            last_ad_turn: -(min_turns_between_ads as i64),
            last_ad_timestamp: 0,
        }
    }

    /// The single mutator. Applied exactly once per completed pipeline
    /// invocation, whether the outcome was an injection or a skip.
    pub fn record_turn(&mut self, ad_shown: bool, now_unix: i64) {
        self.total_turns += 1;
        if ad_shown {
            self.ads_shown += 1;
            self.last_ad_turn = self.total_turns as i64;
            self.last_ad_timestamp = now_unix;
        }
    }
}
