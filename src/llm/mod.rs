mod message;
mod model;
mod provider;
mod router;

pub use message::{Message, MessageRole, ToolCall, ToolResult};
pub use model::{ModelBackend, ModelProvider};
pub use provider::{LlmProvider, LlmResponse};
pub use router::{ModelResolver, ModelRouter};
