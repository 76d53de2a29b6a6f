//! Session-state persistence for the placement pipeline: a TTL-backed
//! counter store keyed by session id, with exactly one mutating operation.

use async_trait::async_trait;

use adweave_core::SessionState;

pub mod memory;

pub use memory::MemorySessionStore;

/// Keyed, TTL-backed counter store consulted by the frequency gate and
/// written exactly once per completed pipeline invocation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current state, or `None` for a session that was never written or
    /// whose TTL window has lapsed.
    async fn get(&self, session_id: &str) -> Option<SessionState>;

    /// The single mutator: always advances `total_turns` by one; when
    /// `ad_shown` also records the placement. Returns the updated state.
    /// Must be atomic per session id.
    async fn update(&self, session_id: &str, ad_shown: bool) -> SessionState;
}
