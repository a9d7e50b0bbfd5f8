use anyhow::Result;
use async_trait::async_trait;

use super::{Message, ToolCall};
use crate::tools::Tool;

/// One model turn
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// The message content
    pub message: Message,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    /// A plain text reply with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            tool_calls: Vec::new(),
        }
    }

    /// Whether the model is done (requested no tools)
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// A chat model an agent can talk to
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and get a response
    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[&dyn Tool],
    ) -> Result<LlmResponse>;

    /// Get the provider name
    fn name(&self) -> &str;
}
