use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Mutable state carried by a session
pub type SessionStateMap = Map<String, Value>;

/// Key holding the recorded conversation turns
pub const CONVERSATIONS_KEY: &str = "conversations";
/// Key holding free-form conversation context
pub const CONTEXT_KEY: &str = "context";
/// Key holding user preferences
pub const PREFERENCES_KEY: &str = "preferences";

/// State every new session starts with.
pub fn initial_state() -> SessionStateMap {
    let mut state = Map::new();
    state.insert(CONVERSATIONS_KEY.to_string(), json!([]));
    state.insert(CONTEXT_KEY.to_string(), json!({}));
    state.insert(PREFERENCES_KEY.to_string(), json!({}));
    state
}

/// One user's ongoing conversation, scoped by application name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque identifier assigned by the store
    pub id: String,

    /// Application the session belongs to
    pub app_name: String,

    /// Owner of the session
    pub user_id: String,

    /// Session state
    pub state: SessionStateMap,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a fresh identifier
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        state: SessionStateMap,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            app_name: app_name.into(),
            user_id: user_id.into(),
            state,
            created_at: now,
            updated_at: now,
        }
    }

    /// Conversation turns recorded in the state.
    ///
    /// Entries that do not parse as turns are skipped.
    pub fn conversations(&self) -> Vec<ConversationTurn> {
        self.state
            .get(CONVERSATIONS_KEY)
            .and_then(Value::as_array)
            .map(|turns| {
                turns
                    .iter()
                    .filter_map(|t| serde_json::from_value(t.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a conversation turn, creating the list if it is missing
    pub fn push_conversation(&mut self, turn: ConversationTurn) -> anyhow::Result<()> {
        let value = serde_json::to_value(turn)?;
        let entry = self
            .state
            .entry(CONVERSATIONS_KEY.to_string())
            .or_insert_with(|| json!([]));

        match entry.as_array_mut() {
            Some(turns) => turns.push(value),
            None => *entry = Value::Array(vec![value]),
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// One exchange between the user and the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// What the user said
    pub user: String,
    /// What the agent replied
    pub agent: String,
    /// Name of the agent that replied
    pub author: String,
    /// When the turn completed
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        user: impl Into<String>,
        agent: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            agent: agent.into(),
            author: author.into(),
            at: Utc::now(),
        }
    }
}

/// Whether a store survives process restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// Sessions persist in an external database
    Durable,
    /// Sessions live only as long as the process
    Volatile,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Durable => write!(f, "durable"),
            Self::Volatile => write!(f, "volatile"),
        }
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let turns = self
            .state
            .get(CONVERSATIONS_KEY)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        write!(
            f,
            "{:<38} {:<12} {:>5} turns  created {}",
            self.id,
            self.user_id,
            turns,
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
