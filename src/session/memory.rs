use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Session, SessionStateMap, SessionStore, StoreKind};

type ScopeKey = (String, String);

/// Volatile session storage; sessions are lost when the process exits
#[derive(Default)]
pub struct InMemoryStore {
    /// Sessions per (app, user), in creation order
    sessions: RwLock<HashMap<ScopeKey, Vec<Session>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn scope(app_name: &str, user_id: &str) -> ScopeKey {
    (app_name.to_string(), user_id.to_string())
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&scope(app_name, user_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: SessionStateMap,
    ) -> Result<Session> {
        let session = Session::new(app_name, user_id, state);

        self.sessions
            .write()
            .await
            .entry(scope(app_name, user_id))
            .or_default()
            .push(session.clone());

        debug!(id = %session.id, user_id, "created in-memory session");
        Ok(session)
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(&scope(app_name, user_id))
            .and_then(|list| list.iter().find(|s| s.id == session_id))
            .cloned())
    }

    async fn update_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(&scope(&session.app_name, &session.user_id))
            .and_then(|list| list.iter_mut().find(|s| s.id == session.id))
            .ok_or_else(|| anyhow::anyhow!("session not found: {}", session.id))?;

        stored.state = session.state.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(list) = sessions.get_mut(&scope(app_name, user_id)) {
            list.retain(|s| s.id != session_id);
        }
        debug!(id = %session_id, "deleted in-memory session");
        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Volatile
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::session::initial_state;

    #[tokio::test]
    async fn list_returns_sessions_in_creation_order() {
        let store = InMemoryStore::new();
        let first = store
            .create_session("app", "alice", initial_state())
            .await
            .unwrap();
        let second = store
            .create_session("app", "alice", initial_state())
            .await
            .unwrap();

        let listed = store.list_sessions("app", "alice").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[tokio::test]
    async fn sessions_are_scoped_by_app_and_user() {
        let store = InMemoryStore::new();
        let session = store
            .create_session("app", "alice", initial_state())
            .await
            .unwrap();

        assert!(store.list_sessions("app", "bob").await.unwrap().is_empty());
        assert!(store.list_sessions("other", "alice").await.unwrap().is_empty());
        assert!(
            store
                .get_session("app", "bob", &session.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_replaces_state() {
        let store = InMemoryStore::new();
        let mut session = store
            .create_session("app", "alice", initial_state())
            .await
            .unwrap();

        session
            .state
            .insert("context".to_string(), json!({"topic": "rust"}));
        store.update_session(&session).await.unwrap();

        let loaded = store
            .get_session("app", "alice", &session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.state["context"]["topic"], "rust");
        assert!(loaded.updated_at >= loaded.created_at);
    }

    #[tokio::test]
    async fn update_of_unknown_session_fails() {
        let store = InMemoryStore::new();
        let ghost = Session::new("app", "alice", initial_state());
        assert!(store.update_session(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = InMemoryStore::new();
        let session = store
            .create_session("app", "alice", initial_state())
            .await
            .unwrap();

        store
            .delete_session("app", "alice", &session.id)
            .await
            .unwrap();
        assert!(store.list_sessions("app", "alice").await.unwrap().is_empty());

        // deleting again is fine
        store
            .delete_session("app", "alice", &session.id)
            .await
            .unwrap();
    }
}
