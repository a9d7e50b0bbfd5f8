#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use agent_scaffold::{
    AgentError, LlmProvider, LlmResponse, Message, MessageRole, ModelResolver, Tool, ToolCall,
};

/// A mock LLM provider that replays scripted responses in order and records
/// every conversation it was sent.
pub struct MockLlmProvider {
    responses: Mutex<VecDeque<LlmResponse>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmProvider {
    /// Create a mock that returns a single text response with no tool calls.
    pub fn single_response(text: &str) -> Self {
        Self::with_responses(vec![LlmResponse::text(text)])
    }

    /// Create a mock from a sequence of responses (popped in order).
    pub fn with_responses(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Conversations received so far, one per chat call
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn chat(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[&dyn Tool],
    ) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut queue = self.responses.lock().unwrap();
        queue
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("MockLlmProvider: no more responses in queue"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Answers every call with `<first line of system prompt>` followed by the
/// last user message, so tests can see which agent handled what.
pub struct EchoProvider;

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn chat(
        &self,
        system: &str,
        messages: &[Message],
        _tools: &[&dyn Tool],
    ) -> Result<LlmResponse> {
        let heading = system.lines().next().unwrap_or_default();
        let request = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(LlmResponse::text(format!("<{}>\n{}", heading, request)))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Resolves model names to the providers registered for them
#[derive(Default)]
pub struct MockModels {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl MockModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, model: &str, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(model.to_string(), provider);
        self
    }

    pub fn shared(self) -> Arc<dyn ModelResolver> {
        Arc::new(self)
    }
}

impl ModelResolver for MockModels {
    fn resolve(&self, model: &str) -> Result<Arc<dyn LlmProvider>, AgentError> {
        self.providers
            .get(model)
            .cloned()
            .ok_or_else(|| AgentError::Provider(format!("unknown model: {}", model)))
    }
}

/// A response asking for one tool call
pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> LlmResponse {
    LlmResponse {
        message: Message::assistant(""),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }],
    }
}

/// Result text of the tool message answering `tool_call_id`
pub fn tool_result_for<'a>(messages: &'a [Message], tool_call_id: &str) -> Option<&'a str> {
    messages
        .iter()
        .filter_map(|m| m.tool_result.as_ref())
        .find(|r| r.tool_call_id == tool_call_id)
        .map(|r| r.result.as_str())
}
