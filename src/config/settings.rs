use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AgentError;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "agent.toml";

const DEFAULT_INSTRUCTION: &str = r#"You are a helpful AI assistant.

Replace this with your agent's specific instructions.
Define its expertise, personality, and capabilities:
- What the agent specializes in
- How it should interact with users
- Any specific guidelines or constraints
- Tone and communication style
"#;

/// Top-level settings.
///
/// Precedence: environment variables > TOML file > defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub agent: AgentSettings,
    pub api_keys: ApiKeys,
}

/// Application identity used to namespace sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Application name sessions are scoped under
    pub name: String,
    /// User identity used when the caller does not supply one
    pub default_user_id: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "my_agent".to_string(),
            default_user_id: "default_user".to_string(),
        }
    }
}

/// Connection descriptor for the durable session store
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: String,
    pub name: String,
    pub user: String,
    pub password: String,
    /// Full connection URL; when set it replaces the composed one
    pub url: Option<String>,
    /// How long to wait for the durable store before falling back
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: "5432".to_string(),
            name: "agent_db".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            url: None,
            connect_timeout_secs: 5,
        }
    }
}

impl DatabaseSettings {
    /// Connection URL for the durable store
    pub fn url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }

    /// Connection URL with the password masked, for logs
    pub fn redacted_url(&self) -> String {
        redact_password(&self.url())
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let password = if self.password.is_empty() { "" } else { "****" };
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &password)
            .field("url", &self.url.as_deref().map(redact_password))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default severity threshold (overridden by RUST_LOG)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Settings for the root agent produced by `create_my_agent`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub model: String,
    pub description: String,
    pub instruction: String,
    pub max_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            description: "A helpful AI assistant".to_string(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            max_iterations: 10,
        }
    }
}

/// API keys for the model backends. Empty means not configured.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub google: String,
    pub openai: String,
    pub anthropic: String,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |key: &str| if key.is_empty() { "" } else { "****" };
        f.debug_struct("ApiKeys")
            .field("google", &mask(&self.google))
            .field("openai", &mask(&self.openai))
            .field("anthropic", &mask(&self.anthropic))
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// `path` names an explicit config file; otherwise `AGENT_CONFIG`, then
    /// `agent.toml` in the working directory (if present) are used.
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load settings using `env` to look up environment variables.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env("AGENT_CONFIG").map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.apply_env(env);
        Ok(settings)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, AgentError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let settings = toml::from_str(&content).map_err(|e| {
            AgentError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(settings)
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if let Some(v) = env("DB_HOST") {
            db.host = v;
        }
        if let Some(v) = env("DB_PORT") {
            db.port = v;
        }
        if let Some(v) = env("DB_NAME") {
            db.name = v;
        }
        if let Some(v) = env("DB_USER") {
            db.user = v;
        }
        if let Some(v) = env("DB_PASSWORD") {
            db.password = v;
        }
        if let Some(v) = env("DATABASE_URL").filter(|v| !v.is_empty()) {
            db.url = Some(v);
        }
        if let Some(v) = env("DB_CONNECT_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => db.connect_timeout_secs = secs,
                Err(_) => warn!(value = %v, "ignoring invalid DB_CONNECT_TIMEOUT_SECS"),
            }
        }

        if let Some(v) = env("LOG_LEVEL") {
            self.logging.level = v.to_lowercase();
        }

        if let Some(v) = env("GOOGLE_API_KEY") {
            self.api_keys.google = v;
        }
        if let Some(v) = env("OPENAI_API_KEY") {
            self.api_keys.openai = v;
        }
        if let Some(v) = env("ANTHROPIC_API_KEY") {
            self.api_keys.anthropic = v;
        }
    }
}

fn redact_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let (prefix, rest) = url.split_at(scheme_end + 3);
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let Some(at) = rest[..authority_end].rfind('@') else {
        return url.to_string();
    };
    match rest[..at].find(':') {
        Some(colon) => format!("{}{}:****{}", prefix, &rest[..colon], &rest[at..]),
        None => url.to_string(),
    }
}
