//! Volatile per-user sessions. Lost on restart; only the store is durable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::state::SessionState;

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    state: SessionState,
    last_active: Instant,
}

/// Maps user id → session state.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; `Fresh` for users without a session.
    pub async fn state(&self, user_id: &str) -> SessionState {
        self.sessions
            .read()
            .await
            .get(user_id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Set the state and mark the session active.
    pub async fn set(&self, user_id: &str, state: SessionState) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            user_id.to_string(),
            SessionEntry {
                state,
                last_active: Instant::now(),
            },
        );
    }

    /// Mark the session active without changing its state.
    pub async fn touch(&self, user_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id.to_string())
            .and_modify(|entry| entry.last_active = Instant::now())
            .or_insert(SessionEntry {
                state: SessionState::Fresh,
                last_active: Instant::now(),
            });
    }

    /// Drop sessions idle for at least `idle_timeout`. Returns how many were
    /// removed.
    pub async fn prune_stale_sessions(&self, idle_timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_active.elapsed() < idle_timeout);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned idle sessions");
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
