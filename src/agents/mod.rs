mod llm_agent;
mod root;
mod runner;
mod sub_agents;
mod workflow;

pub use llm_agent::{AgentConfig, AgentTool, LlmAgent};
pub use root::{create_coordinator_agent, create_my_agent};
pub use sub_agents::{
    create_content_workflow, create_parallel_analysis, create_research_agent,
    create_reviewer_agent, create_writer_agent,
};
pub use workflow::{ParallelAgent, SequentialAgent};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::{Message, ModelResolver};

/// Something that turns a conversation into a reply
#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique name, also used as the delegation tool name
    fn name(&self) -> &str;

    /// What this agent is good at (shown to a coordinating agent)
    fn description(&self) -> &str;

    /// Run the agent on a conversation whose last message is the request
    async fn run(&self, messages: &[Message], models: &Arc<dyn ModelResolver>) -> Result<String>;
}
