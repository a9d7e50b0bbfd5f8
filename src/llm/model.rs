use anyhow::{Context, Result};
use async_trait::async_trait;
use llm::builder::{FunctionBuilder, LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatRole, FunctionTool, MessageType, Tool as LlmTool};
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use super::{LlmProvider, LlmResponse, Message, MessageRole, ToolCall};
use crate::tools::Tool;

const API_TIMEOUT_SECS: u64 = 120;
const MAX_TOKENS: u32 = 8192;

/// Hosted model families a [`ModelProvider`] can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    OpenAI,
    Anthropic,
    Google,
}

impl ModelBackend {
    fn llm_backend(self) -> LLMBackend {
        match self {
            Self::OpenAI => LLMBackend::OpenAI,
            Self::Anthropic => LLMBackend::Anthropic,
            Self::Google => LLMBackend::Google,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }
}

/// LLM provider for one model on one backend, using the llm crate
pub struct ModelProvider {
    backend: ModelBackend,
    model: String,
    api_key: String,
}

impl ModelProvider {
    pub fn new(backend: ModelBackend, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn backend(&self) -> ModelBackend {
        self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn to_chat_message(msg: &Message) -> Option<ChatMessage> {
    match msg.role {
        MessageRole::User => Some(ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: msg.content.clone(),
        }),
        MessageRole::Assistant if msg.tool_calls.is_empty() => Some(ChatMessage {
            role: ChatRole::Assistant,
            message_type: MessageType::Text,
            content: msg.content.clone(),
        }),
        MessageRole::Assistant => {
            let tool_calls: Vec<llm::ToolCall> = msg
                .tool_calls
                .iter()
                .map(|tc| llm::ToolCall {
                    id: tc.id.clone(),
                    call_type: "function".to_string(),
                    function: llm::FunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect();
            Some(ChatMessage {
                role: ChatRole::Assistant,
                message_type: MessageType::ToolUse(tool_calls),
                content: msg.content.clone(),
            })
        }
        MessageRole::Tool => msg.tool_result.as_ref().map(|result| {
            let tool_call = llm::ToolCall {
                id: result.tool_call_id.clone(),
                call_type: "function".to_string(),
                function: llm::FunctionCall {
                    // Not needed for results
                    name: String::new(),
                    arguments: result.result.clone(),
                },
            };
            ChatMessage {
                role: ChatRole::User,
                message_type: MessageType::ToolResult(vec![tool_call]),
                content: String::new(),
            }
        }),
        // System prompt is passed to the builder
        MessageRole::System => None,
    }
}

#[async_trait]
impl LlmProvider for ModelProvider {
    fn name(&self) -> &str {
        self.backend.as_str()
    }

    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[&dyn Tool],
    ) -> Result<LlmResponse> {
        let llm_tools: Vec<LlmTool> = tools.iter().map(|t| to_llm_tool(*t)).collect();

        // The llm crate takes tools at build time, so the client is rebuilt per call.
        let builder = llm_tools.iter().fold(
            LLMBuilder::new()
                .backend(self.backend.llm_backend())
                .api_key(&self.api_key)
                .model(&self.model)
                .system(system)
                .max_tokens(MAX_TOKENS),
            |builder, tool| {
                builder.function(
                    FunctionBuilder::new(&tool.function.name)
                        .description(&tool.function.description)
                        .json_schema(tool.function.parameters.clone()),
                )
            },
        );
        let llm = builder.build().context("failed to build LLM client")?;

        let chat_messages: Vec<ChatMessage> = messages.iter().filter_map(to_chat_message).collect();
        let backend = self.backend.as_str();

        debug!(
            backend,
            model = %self.model,
            messages = chat_messages.len(),
            tools = llm_tools.len(),
            "calling model"
        );

        let offered = (!llm_tools.is_empty()).then_some(llm_tools.as_slice());
        let response = timeout(
            Duration::from_secs(API_TIMEOUT_SECS),
            llm.chat_with_tools(&chat_messages, offered),
        )
        .await
        .with_context(|| format!("{} API call timed out after {}s", backend, API_TIMEOUT_SECS))?
        .with_context(|| format!("failed to call {} API", backend))?;

        let content = response.text().unwrap_or_else(|| {
            warn!(backend, "API returned empty or missing response text");
            String::new()
        });
        let tool_calls = response
            .tool_calls()
            .map(|calls| calls.iter().map(from_llm_tool_call).collect())
            .unwrap_or_default();

        Ok(LlmResponse {
            message: Message::assistant(content),
            tool_calls,
        })
    }
}

fn to_llm_tool(tool: &dyn Tool) -> LlmTool {
    LlmTool {
        tool_type: "function".to_string(),
        function: FunctionTool {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.schema(),
        },
        cache_control: None,
    }
}

/// Arguments that are not valid JSON become `null` rather than failing the turn
fn from_llm_tool_call(call: &llm::ToolCall) -> ToolCall {
    let arguments = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
        warn!(tool = %call.function.name, error = %e, "tool call arguments are not JSON");
        serde_json::Value::Null
    });
    ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments,
    }
}
