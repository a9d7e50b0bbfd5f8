pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod runtime;
pub mod session;
pub mod tools;

pub use agents::{
    Agent, AgentConfig, LlmAgent, ParallelAgent, SequentialAgent, create_content_workflow,
    create_coordinator_agent, create_my_agent, create_parallel_analysis,
};
pub use config::Settings;
pub use error::AgentError;
pub use llm::{LlmProvider, LlmResponse, Message, MessageRole, ModelResolver, ModelRouter, ToolCall};
pub use runtime::{RunOutput, Runner};
pub use session::{Session, SessionManager, SessionStore, StoreKind};
pub use tools::{Tool, ToolRegistry, example_tools};
