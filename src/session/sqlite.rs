use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use tokio::task;
use tracing::debug;

use super::{Session, SessionStateMap, SessionStore, StoreKind};

/// SQLite-based session storage
pub struct SqliteStore {
    /// Path to the SQLite database file
    db_path: PathBuf,
}

/// Open a SQLite connection with standard pragmas (busy_timeout).
fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;
    conn.execute_batch("PRAGMA busy_timeout=5000;")
        .context("failed to set busy_timeout")?;
    Ok(conn)
}

/// Fixed-width timestamps so text ordering matches time ordering
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp in database: {}", raw))?
        .with_timezone(&Utc))
}

type SessionRow = (String, String, String, String, String, String);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn row_to_session(row: SessionRow) -> Result<Session> {
    let (id, app_name, user_id, state, created_at, updated_at) = row;
    let state: SessionStateMap = serde_json::from_str(&state)
        .with_context(|| format!("invalid state for session {}", id))?;
    Ok(Session {
        id,
        app_name,
        user_id,
        state,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

impl SqliteStore {
    /// Create a new SQLite store at the given path
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let store = Self { db_path };
        store.init_schema()?;

        Ok(store)
    }

    /// Open a store from a `sqlite://<path>` or `sqlite:<path>` URL
    pub fn from_url(url: &str) -> Result<Self> {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .with_context(|| format!("not a sqlite URL: {}", url))?;

        if path.is_empty() || path == ":memory:" {
            anyhow::bail!("sqlite URL must name a database file: {}", url);
        }

        Self::new(path)
    }

    /// Path to the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;

        // Enable WAL mode for better concurrent read/write performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("failed to set WAL mode")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                app_name TEXT NOT NULL,
                user_id TEXT NOT NULL,
                state TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create sessions table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_scope ON sessions(app_name, user_id)",
            [],
        )
        .context("failed to create scope index")?;

        debug!(path = %self.db_path.display(), "initialized SQLite store");

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let app_name = app_name.to_string();
        let user_id = user_id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            let mut stmt = conn.prepare(
                "SELECT id, app_name, user_id, state, created_at, updated_at
                 FROM sessions
                 WHERE app_name = ?1 AND user_id = ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([&app_name, &user_id], read_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(row_to_session)
                .collect::<Result<Vec<_>>>()
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        state: SessionStateMap,
    ) -> Result<Session> {
        let session = Session::new(app_name, user_id, state);
        let db_path = self.db_path.clone();
        let row = session.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            let state = serde_json::to_string(&row.state)?;

            conn.execute(
                "INSERT INTO sessions (id, app_name, user_id, state, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    row.id,
                    row.app_name,
                    row.user_id,
                    state,
                    timestamp(&row.created_at),
                    timestamp(&row.updated_at),
                ],
            )?;

            debug!(id = %row.id, user_id = %row.user_id, "created session");

            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(session)
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Session>> {
        let app_name = app_name.to_string();
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            let mut stmt = conn.prepare(
                "SELECT id, app_name, user_id, state, created_at, updated_at
                 FROM sessions
                 WHERE id = ?1 AND app_name = ?2 AND user_id = ?3",
            )?;

            let result = stmt.query_row([&session_id, &app_name, &user_id], read_row);

            match result {
                Ok(row) => row_to_session(row).map(Some),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn update_session(&self, session: &Session) -> Result<()> {
        let session = session.clone();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            let state = serde_json::to_string(&session.state)?;

            conn.execute(
                "UPDATE sessions SET state = ?1, updated_at = ?2
                 WHERE id = ?3 AND app_name = ?4 AND user_id = ?5",
                rusqlite::params![
                    state,
                    timestamp(&Utc::now()),
                    session.id,
                    session.app_name,
                    session.user_id,
                ],
            )?;

            if conn.changes() == 0 {
                anyhow::bail!("session not found: {}", session.id);
            }

            debug!(id = %session.id, "updated session");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn delete_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<()> {
        let app_name = app_name.to_string();
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            conn.execute(
                "DELETE FROM sessions WHERE id = ?1 AND app_name = ?2 AND user_id = ?3",
                [&session_id, &app_name, &user_id],
            )?;
            debug!(id = %session_id, "deleted session");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")?
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Durable
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
