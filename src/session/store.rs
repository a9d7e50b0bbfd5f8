use anyhow::Result;
use async_trait::async_trait;

use super::{Session, SessionStateMap, StoreKind};

/// Storage backend for sessions.
///
/// Every operation is scoped by `(app_name, user_id)`; a session is never
/// visible under another pair.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// List sessions for a user, oldest first
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>>;

    /// Create a session with the given initial state
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: SessionStateMap,
    ) -> Result<Session>;

    /// Load a session by ID
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>>;

    /// Replace the stored state of an existing session
    async fn update_session(&self, session: &Session) -> Result<()>;

    /// Delete a session (no-op if it does not exist)
    async fn delete_session(&self, app_name: &str, user_id: &str, session_id: &str)
    -> Result<()>;

    /// Whether sessions survive a restart
    fn kind(&self) -> StoreKind;

    /// Short backend name for logs
    fn name(&self) -> &str;
}
