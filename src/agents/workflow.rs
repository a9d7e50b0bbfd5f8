use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{info, instrument};

use super::Agent;
use crate::error::AgentError;
use crate::llm::{Message, MessageRole, ModelResolver};

/// Runs its agents one after another, each building on the last one's output
pub struct SequentialAgent {
    name: String,
    description: String,
    agents: Vec<Arc<dyn Agent>>,
}

impl SequentialAgent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agents: Vec::new(),
        }
    }

    pub fn then(mut self, agent: impl Agent + 'static) -> Self {
        self.agents.push(Arc::new(agent));
        self
    }

    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }
}

/// Content of the last user message, which is the request being worked on
fn request_of(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

#[async_trait]
impl Agent for SequentialAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    #[instrument(skip_all, fields(workflow = %self.name))]
    async fn run(&self, messages: &[Message], models: &Arc<dyn ModelResolver>) -> Result<String> {
        let (first, rest) = self.agents.split_first().ok_or_else(|| AgentError::Agent {
            agent_name: self.name.clone(),
            message: "sequential workflow has no agents".to_string(),
        })?;

        let request = request_of(messages);

        info!(step = first.name(), "workflow step");
        let mut output = first
            .run(messages, models)
            .await
            .with_context(|| format!("{}: step '{}' failed", self.name, first.name()))?;
        let mut previous = first.name();

        for agent in rest {
            info!(step = agent.name(), "workflow step");
            let step_input = format!(
                "## Original Request\n{}\n\n## Output from {}\n{}",
                request, previous, output
            );
            output = agent
                .run(&[Message::user(step_input)], models)
                .await
                .with_context(|| format!("{}: step '{}' failed", self.name, agent.name()))?;
            previous = agent.name();
        }

        info!("workflow completed");
        Ok(output)
    }
}

/// Runs its agents concurrently on the same input and collects every answer
pub struct ParallelAgent {
    name: String,
    description: String,
    agents: Vec<Arc<dyn Agent>>,
}

impl ParallelAgent {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agents: Vec::new(),
        }
    }

    pub fn with(mut self, agent: impl Agent + 'static) -> Self {
        self.agents.push(Arc::new(agent));
        self
    }

    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }
}

#[async_trait]
impl Agent for ParallelAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    #[instrument(skip_all, fields(workflow = %self.name))]
    async fn run(&self, messages: &[Message], models: &Arc<dyn ModelResolver>) -> Result<String> {
        if self.agents.is_empty() {
            return Err(AgentError::Agent {
                agent_name: self.name.clone(),
                message: "parallel workflow has no agents".to_string(),
            }
            .into());
        }

        info!(branches = self.agents.len(), "fanning out");

        let runs = self.agents.iter().map(|agent| async move {
            agent
                .run(messages, models)
                .await
                .with_context(|| format!("{}: branch '{}' failed", self.name, agent.name()))
        });
        let outputs = try_join_all(runs).await?;

        let sections: Vec<String> = self
            .agents
            .iter()
            .zip(outputs)
            .map(|(agent, output)| format!("## {}\n{}", agent.name(), output))
            .collect();

        info!("fan-out completed");
        Ok(sections.join("\n\n"))
    }
}
