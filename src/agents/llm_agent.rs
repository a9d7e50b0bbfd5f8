use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, instrument};

use super::Agent;
use super::runner::agent_loop;
use crate::llm::{Message, ModelResolver};
use crate::tools::{Tool, ToolRegistry};

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Everything needed to build an [`LlmAgent`]
#[derive(Clone)]
pub struct AgentConfig {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    pub tools: ToolRegistry,
    pub sub_agents: Vec<Arc<dyn Agent>>,
    pub max_iterations: usize,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: String::new(),
            instruction: String::new(),
            tools: ToolRegistry::new(),
            sub_agents: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn sub_agent(mut self, agent: impl Agent + 'static) -> Self {
        self.sub_agents.push(Arc::new(agent));
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("description", &self.description)
            .field("tools", &self.tools)
            .field(
                "sub_agents",
                &self.sub_agents.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

/// Agent backed by a model, with optional tools and sub-agents.
///
/// Sub-agents are offered to the model as tools named after the sub-agent, so
/// the model decides when to delegate. A sub-agent shadows a tool of the same
/// name.
#[derive(Debug, Clone)]
pub struct LlmAgent {
    config: AgentConfig,
}

impl LlmAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn instruction(&self) -> &str {
        &self.config.instruction
    }

    pub fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &self.config.sub_agents
    }

    fn system_prompt(&self) -> String {
        let mut prompt = self.config.instruction.clone();
        if !self.config.sub_agents.is_empty() {
            prompt.push_str(
                "\n\nYou can hand work to these specialists by calling the tool with their name:\n",
            );
            for agent in &self.config.sub_agents {
                let _ = writeln!(prompt, "- {}: {}", agent.name(), agent.description());
            }
        }
        prompt
    }

    fn toolset(&self, models: &Arc<dyn ModelResolver>) -> ToolRegistry {
        let mut tools = self.config.tools.clone();
        for agent in &self.config.sub_agents {
            tools.register(AgentTool::new(Arc::clone(agent), Arc::clone(models)));
        }
        tools
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    #[instrument(skip_all, fields(agent = %self.config.name, model = %self.config.model))]
    async fn run(&self, messages: &[Message], models: &Arc<dyn ModelResolver>) -> Result<String> {
        info!("starting agent");

        let provider = models.resolve(&self.config.model)?;
        let tools = self.toolset(models);

        agent_loop(
            &self.config.name,
            &self.system_prompt(),
            messages.to_vec(),
            provider.as_ref(),
            &tools,
            self.config.max_iterations,
        )
        .await
    }
}

/// Presents an agent to another agent's model as a callable tool
pub struct AgentTool {
    agent: Arc<dyn Agent>,
    models: Arc<dyn ModelResolver>,
}

impl AgentTool {
    pub fn new(agent: Arc<dyn Agent>, models: Arc<dyn ModelResolver>) -> Self {
        Self { agent, models }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        self.agent.name()
    }

    fn description(&self) -> &str {
        self.agent.description()
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "request": {
                    "type": "string",
                    "description": "What the specialist should do, with any context it needs"
                }
            },
            "required": ["request"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let request = params["request"]
            .as_str()
            .context("missing 'request' parameter")?;

        info!(agent = self.agent.name(), "delegating to sub-agent");
        self.agent
            .run(&[Message::user(request)], &self.models)
            .await
            .with_context(|| format!("sub-agent '{}' failed", self.agent.name()))
    }
}
