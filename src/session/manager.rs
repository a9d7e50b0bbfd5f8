use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use super::{
    InMemoryStore, PostgresStore, Session, SessionStore, SqliteStore, StoreKind, initial_state,
};
use crate::config::{AppSettings, DatabaseSettings, Settings};
use crate::error::AgentError;

/// Open the durable store named by the database settings.
///
/// The URL scheme picks the backend: `postgres://` / `postgresql://` or
/// `sqlite://` / `sqlite:`. Any other scheme is a storage error.
pub async fn open_durable_store(
    db: &DatabaseSettings,
) -> Result<Arc<dyn SessionStore>, AgentError> {
    let url = db.url();
    let connect_timeout = Duration::from_secs(db.connect_timeout_secs);

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PostgresStore::connect(&url, connect_timeout)
            .await
            .map_err(|e| AgentError::Storage(format!("{:#}", e)))?;
        Ok(Arc::new(store))
    } else if url.starts_with("sqlite:") {
        let store = tokio::task::spawn_blocking(move || SqliteStore::from_url(&url))
            .await
            .map_err(|e| AgentError::Storage(format!("spawn_blocking failed: {}", e)))?
            .map_err(|e| AgentError::Storage(format!("{:#}", e)))?;
        Ok(Arc::new(store))
    } else {
        Err(AgentError::Storage(format!(
            "unsupported database URL: {}",
            db.redacted_url()
        )))
    }
}

/// Resolves the session a user's conversation continues in.
///
/// Holds exactly one store for its whole lifetime. Calls for the same user
/// are serialized, so one manager never creates two sessions for a user.
/// Managers in different processes sharing a durable store can still race.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    app_name: String,
    default_user_id: String,
    user_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionManager {
    /// Create a manager over an explicit store
    pub fn new(
        store: Arc<dyn SessionStore>,
        app_name: impl Into<String>,
        default_user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            app_name: app_name.into(),
            default_user_id: default_user_id.into(),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open the durable store, falling back to an in-memory store.
    ///
    /// Never fails: any error opening the durable store is logged and the
    /// manager continues with volatile sessions.
    pub async fn connect(settings: &Settings) -> Self {
        Self::connect_with(&settings.database, &settings.app).await
    }

    pub async fn connect_with(db: &DatabaseSettings, app: &AppSettings) -> Self {
        let store: Arc<dyn SessionStore> = match open_durable_store(db).await {
            Ok(store) => {
                info!(url = %db.redacted_url(), backend = store.name(), "connected to database");
                store
            }
            Err(e) => {
                warn!(error = %e, "database connection failed, using in-memory sessions");
                Arc::new(InMemoryStore::new())
            }
        };

        Self::new(store, &app.name, &app.default_user_id)
    }

    /// Which kind of store is active
    pub fn backend(&self) -> StoreKind {
        self.store.kind()
    }

    /// The active store
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn default_user_id(&self) -> &str {
        &self.default_user_id
    }

    /// Get or create the session for the configured default user
    pub async fn get_or_create_default_session(&self) -> Result<String> {
        self.get_or_create_session(&self.default_user_id).await
    }

    /// Return the first existing session for `user_id`, or create one.
    ///
    /// Store errors are logged and returned unchanged.
    pub async fn get_or_create_session(&self, user_id: &str) -> Result<String> {
        let lock = self.user_lock(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.resolve_session(user_id).await
        };
        self.release_user_lock(user_id, lock);

        result.inspect_err(|e| {
            error!(user_id, error = %e, "session management error");
        })
    }

    /// List all sessions for `user_id`
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        self.store.list_sessions(&self.app_name, user_id).await
    }

    /// Load a session owned by `user_id`
    pub async fn load_session(&self, user_id: &str, session_id: &str) -> Result<Option<Session>> {
        self.store
            .get_session(&self.app_name, user_id, session_id)
            .await
    }

    /// Persist a modified session
    pub async fn save_session(&self, session: &Session) -> Result<()> {
        self.store.update_session(session).await
    }

    async fn resolve_session(&self, user_id: &str) -> Result<String> {
        let sessions = self.store.list_sessions(&self.app_name, user_id).await?;

        if let Some(session) = sessions.into_iter().next() {
            info!(session_id = %session.id, user_id, "resuming session");
            return Ok(session.id);
        }

        let session = self
            .store
            .create_session(&self.app_name, user_id, initial_state())
            .await?;
        info!(session_id = %session.id, user_id, "created new session");
        Ok(session.id)
    }

    fn user_lock(&self, user_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    /// Drop the user's lock entry once no other call holds or awaits it
    fn release_user_lock(&self, user_id: &str, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Clones are taken and released only under `user_locks`, so the count is stable here
        let idle = locks
            .get(user_id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        drop(lock);
        if idle {
            locks.remove(user_id);
        }
    }
}
