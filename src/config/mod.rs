mod settings;

pub use settings::{
    AgentSettings, ApiKeys, AppSettings, DEFAULT_CONFIG_FILE, DatabaseSettings, LoggingSettings,
    Settings,
};
