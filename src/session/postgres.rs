//! PostgreSQL session storage.
//!
//! Uses an sqlx connection pool. The `agent_sessions` table is created on
//! connect if it does not exist.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use tracing::{debug, instrument};

use super::{Session, SessionStateMap, SessionStore, StoreKind};

const MAX_CONNECTIONS: u32 = 5;

/// Oldest first; `seq` keeps insertion order among equal timestamps
const LIST_SESSIONS_SQL: &str = r#"
    SELECT id, app_name, user_id, state, created_at, updated_at
    FROM agent_sessions
    WHERE app_name = $1 AND user_id = $2
    ORDER BY created_at ASC, seq ASC
"#;

/// Durable session store backed by PostgreSQL
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect to `url` and make sure the schema exists.
    ///
    /// Fails if the server cannot be reached within `connect_timeout`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        let pool = tokio::time::timeout(
            connect_timeout,
            PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .acquire_timeout(connect_timeout)
                .connect(url),
        )
        .await
        .context("timed out connecting to PostgreSQL")?
        .context("failed to connect to PostgreSQL")?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool (schema must already exist)
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_sessions (
                id TEXT PRIMARY KEY,
                seq BIGSERIAL NOT NULL,
                app_name TEXT NOT NULL,
                user_id TEXT NOT NULL,
                state JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create agent_sessions table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_agent_sessions_scope ON agent_sessions(app_name, user_id)",
        )
        .execute(&self.pool)
        .await
        .context("failed to create scope index")?;

        debug!("initialized PostgreSQL store");
        Ok(())
    }

    fn row_to_session(row: PgRow) -> Result<Session> {
        let state: Json<SessionStateMap> = row.try_get("state")?;
        Ok(Session {
            id: row.try_get("id")?,
            app_name: row.try_get("app_name")?,
            user_id: row.try_get("user_id")?,
            state: state.0,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    #[instrument(skip(self))]
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let rows = sqlx::query(LIST_SESSIONS_SQL)
            .bind(app_name)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to list sessions")?;

        rows.into_iter().map(Self::row_to_session).collect()
    }

    #[instrument(skip(self, state))]
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: SessionStateMap,
    ) -> Result<Session> {
        let session = Session::new(app_name, user_id, state);

        sqlx::query(
            r#"
            INSERT INTO agent_sessions (id, app_name, user_id, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&session.id)
        .bind(&session.app_name)
        .bind(&session.user_id)
        .bind(Json(&session.state))
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to create session")?;

        debug!(id = %session.id, "created session");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, app_name, user_id, state, created_at, updated_at
            FROM agent_sessions
            WHERE id = $1 AND app_name = $2 AND user_id = $3
            "#,
        )
        .bind(session_id)
        .bind(app_name)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load session")?;

        row.map(Self::row_to_session).transpose()
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    async fn update_session(&self, session: &Session) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE agent_sessions SET state = $1, updated_at = $2
            WHERE id = $3 AND app_name = $4 AND user_id = $5
            "#,
        )
        .bind(Json(&session.state))
        .bind(Utc::now())
        .bind(&session.id)
        .bind(&session.app_name)
        .bind(&session.user_id)
        .execute(&self.pool)
        .await
        .context("failed to update session")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("session not found: {}", session.id);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<()> {
        sqlx::query("DELETE FROM agent_sessions WHERE id = $1 AND app_name = $2 AND user_id = $3")
            .bind(session_id)
            .bind(app_name)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Durable
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
