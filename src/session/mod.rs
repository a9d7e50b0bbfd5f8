mod manager;
mod memory;
mod postgres;
mod sqlite;
mod state;
mod store;

pub use manager::{SessionManager, open_durable_store};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
pub use state::{
    CONTEXT_KEY, CONVERSATIONS_KEY, ConversationTurn, PREFERENCES_KEY, Session, SessionStateMap,
    StoreKind, initial_state,
};
pub use store::SessionStore;
