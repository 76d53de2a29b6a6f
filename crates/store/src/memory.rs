use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use adweave_core::gates::FrequencyPolicy;
use adweave_core::SessionState;

use crate::SessionStore;

struct Entry {
    state: SessionState,
    expires_at: Instant,
}

/// In-memory TTL-backed session store. Each write refreshes the sliding
/// expiry window; a session untouched for the full window is evicted and
/// becomes indistinguishable from a new one.
///
/// `update` performs the whole read-modify-write under one lock guard, so
/// concurrent invocations for the same session serialize and cannot lose an
/// increment or mis-order `last_ad_turn`.
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    min_turns_between_ads: u32,
}

impl MemorySessionStore {
    pub fn new(policy: FrequencyPolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(policy.session_ttl_secs),
            min_turns_between_ads: policy.min_turns_between_ads,
        }
    }

    /// Number of live (unexpired) sessions, for health reporting.
    pub async fn session_count(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| entry.expires_at > now).count()
    }

    /// Drops expired entries. Reads already treat them as absent; this keeps
    /// the map from accumulating dead sessions between reads.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            tracing::debug!(event_name = "store.sessions_purged", purged, "evicted expired sessions");
        }
        purged
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<SessionState> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(session_id) {
            Some(entry) if entry.expires_at > now => Some(entry.state.clone()),
            Some(_) => {
                entries.remove(session_id);
                None
            }
            None => None,
        }
    }

    async fn update(&self, session_id: &str, ad_shown: bool) -> SessionState {
        let now = Instant::now();
        let now_unix = Utc::now().timestamp();
        let mut entries = self.entries.lock().await;

        // Created lazily on first update, never on read. An expired entry is
        // reset in place rather than evicted first.
        let entry = entries
            .entry(session_id.to_string())
            .and_modify(|entry| {
                if entry.expires_at <= now {
                    entry.state = SessionState::fresh(self.min_turns_between_ads);
                }
            })
            .or_insert_with(|| Entry {
                state: SessionState::fresh(self.min_turns_between_ads),
                expires_at: now + self.ttl,
            });

        entry.state.record_turn(ad_shown, now_unix);
        entry.expires_at = now + self.ttl;
        entry.state.clone()
    }
}
