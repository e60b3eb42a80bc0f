use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::fsm::State;

/// Conversation state per user, keyed by the user's external id. Holding a
/// session's lock serializes that user's messages; users never block each
/// other.
#[derive(Debug, Default)]
pub struct Sessions {
    sessions: DashMap<i64, Arc<Mutex<State>>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, user_id: i64) -> Arc<Mutex<State>> {
        self.sessions.entry(user_id).or_default().clone()
    }

    /// Drops the user's session once it is back to [`State::Idle`] and no
    /// message of that user holds or waits for it. A missing session reads
    /// as idle, so this only bounds memory.
    pub fn release(&self, user_id: i64) {
        self.sessions.remove_if(&user_id, |_, session| {
            Arc::strong_count(session) == 1
                && session
                    .try_lock()
                    .map(|state| *state == State::Idle)
                    .unwrap_or(false)
        });
    }

    pub async fn state(&self, user_id: i64) -> State {
        let session = self.sessions.get(&user_id).map(|s| s.clone());
        match session {
            Some(session) => session.lock().await.clone(),
            None => State::Idle,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let sessions = Sessions::new();
        *sessions.session(1).lock().await = State::AwaitingOrgName;

        assert_eq!(sessions.state(1).await, State::AwaitingOrgName);
        assert_eq!(sessions.state(2).await, State::Idle);
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_release_drops_idle_sessions_only() {
        let sessions = Sessions::new();
        *sessions.session(1).lock().await = State::AwaitingOrgName;
        sessions.session(2);

        sessions.release(1);
        sessions.release(2);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.state(1).await, State::AwaitingOrgName);
    }

    #[tokio::test]
    async fn test_release_keeps_sessions_in_use() {
        let sessions = Sessions::new();
        let held = sessions.session(1);

        sessions.release(1);

        assert_eq!(sessions.len(), 1);
        drop(held);
        sessions.release(1);
        assert!(sessions.is_empty());
    }
}
