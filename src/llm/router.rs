use std::sync::Arc;

use tracing::debug;

use super::{LlmProvider, ModelBackend, ModelProvider};
use crate::config::ApiKeys;
use crate::error::AgentError;

/// Maps the model name an agent was configured with to a provider
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, model: &str) -> Result<Arc<dyn LlmProvider>, AgentError>;
}

/// Resolves model names to hosted backends by prefix, using configured API keys.
///
/// `gpt-*`, `o1*`, `o3*`, `openai/*` go to OpenAI; `claude*`, `anthropic/*`
/// to Anthropic; `gemini*`, `google/*` to Google. A `vendor/` prefix is
/// stripped before the model name is sent.
pub struct ModelRouter {
    keys: ApiKeys,
}

impl ModelRouter {
    pub fn new(keys: ApiKeys) -> Self {
        Self { keys }
    }

    /// Which backend serves `model`, and the name to send it
    pub fn route(model: &str) -> Option<(ModelBackend, &str)> {
        if let Some((vendor, name)) = model.split_once('/') {
            let backend = match vendor {
                "openai" => ModelBackend::OpenAI,
                "anthropic" => ModelBackend::Anthropic,
                "google" | "gemini" => ModelBackend::Google,
                _ => return None,
            };
            return Some((backend, name));
        }

        let backend = if model.starts_with("gpt-")
            || model.starts_with("o1")
            || model.starts_with("o3")
        {
            ModelBackend::OpenAI
        } else if model.starts_with("claude") {
            ModelBackend::Anthropic
        } else if model.starts_with("gemini") {
            ModelBackend::Google
        } else {
            return None;
        };
        Some((backend, model))
    }

    fn key_for(&self, backend: ModelBackend) -> (&str, &'static str) {
        match backend {
            ModelBackend::OpenAI => (self.keys.openai.as_str(), "OPENAI_API_KEY"),
            ModelBackend::Anthropic => (self.keys.anthropic.as_str(), "ANTHROPIC_API_KEY"),
            ModelBackend::Google => (self.keys.google.as_str(), "GOOGLE_API_KEY"),
        }
    }
}

impl ModelResolver for ModelRouter {
    fn resolve(&self, model: &str) -> Result<Arc<dyn LlmProvider>, AgentError> {
        let (backend, name) = Self::route(model)
            .ok_or_else(|| AgentError::Provider(format!("unknown model: {}", model)))?;

        let (key, env_name) = self.key_for(backend);
        if key.is_empty() {
            return Err(AgentError::Provider(format!(
                "{} is not set (needed for model '{}')",
                env_name, model
            )));
        }

        debug!(model, backend = backend.as_str(), "resolved model");
        Ok(Arc::new(ModelProvider::new(backend, name, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_prefix() {
        assert_eq!(
            ModelRouter::route("gpt-4"),
            Some((ModelBackend::OpenAI, "gpt-4"))
        );
        assert_eq!(
            ModelRouter::route("gpt-3.5-turbo"),
            Some((ModelBackend::OpenAI, "gpt-3.5-turbo"))
        );
        assert_eq!(
            ModelRouter::route("claude-sonnet-4-20250514"),
            Some((ModelBackend::Anthropic, "claude-sonnet-4-20250514"))
        );
        assert_eq!(
            ModelRouter::route("gemini-2.0-flash"),
            Some((ModelBackend::Google, "gemini-2.0-flash"))
        );
        assert_eq!(
            ModelRouter::route("anthropic/claude-3-5-haiku-20241022"),
            Some((ModelBackend::Anthropic, "claude-3-5-haiku-20241022"))
        );
        assert_eq!(ModelRouter::route("llama3"), None);
        assert_eq!(ModelRouter::route("mistral/large"), None);
    }

    #[test]
    fn missing_key_is_a_provider_error() {
        let router = ModelRouter::new(ApiKeys::default());
        let err = router.resolve("gpt-4").err().unwrap();
        assert!(matches!(err, AgentError::Provider(ref m) if m.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn unknown_model_is_a_provider_error() {
        let router = ModelRouter::new(ApiKeys::default());
        let err = router.resolve("llama3").err().unwrap();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[test]
    fn resolves_with_key() {
        let router = ModelRouter::new(ApiKeys {
            anthropic: "sk-ant".to_string(),
            ..Default::default()
        });
        let provider = router.resolve("claude-sonnet-4-20250514").unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
