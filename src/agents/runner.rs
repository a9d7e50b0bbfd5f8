use anyhow::{Context, Result};
use tokio::time::{Duration, sleep};
use tracing::{debug, info};

use crate::error::AgentError;
use crate::llm::{LlmProvider, Message, ToolCall};
use crate::tools::ToolRegistry;

/// Pause between model round-trips
const ITERATION_DELAY_MS: u64 = 100;

/// Shared agent execution loop.
///
/// Calls the model, executes any requested tool calls, feeds the results back
/// and repeats until the model answers without tool calls.
///
/// - `agent_name`: For logging and errors
/// - `system_prompt`: The system prompt for this agent
/// - `messages`: Conversation so far, ending with the request
/// - `provider`: Model to talk to
/// - `tools`: Tools offered to the model
/// - `max_iterations`: Maximum number of model round-trips before failing
///   with [`AgentError::MaxIterations`]
pub async fn agent_loop(
    agent_name: &str,
    system_prompt: &str,
    mut messages: Vec<Message>,
    provider: &dyn LlmProvider,
    tools: &ToolRegistry,
    max_iterations: usize,
) -> Result<String> {
    let tool_refs = tools.all();

    for iteration in 0..max_iterations {
        debug!(agent = agent_name, iteration, "agent iteration");

        if iteration > 0 {
            sleep(Duration::from_millis(ITERATION_DELAY_MS)).await;
        }

        let response = provider
            .chat(system_prompt, &messages, &tool_refs)
            .await
            .with_context(|| format!("{} agent: LLM chat failed", agent_name))?;

        debug!(agent = agent_name, content = %response.message.content, "llm response");

        if response.is_final() {
            info!(agent = agent_name, "agent completed");
            return Ok(response.message.content);
        }

        let tool_calls = response.tool_calls;

        let mut tool_results = Vec::with_capacity(tool_calls.len());
        for tool_call in &tool_calls {
            debug!(agent = agent_name, tool = %tool_call.name, "executing tool");
            let result = execute_tool_call(tools, tool_call).await;
            debug!(agent = agent_name, tool = %tool_call.name, result = %result, "tool result");
            tool_results.push((tool_call.id.clone(), result));
        }

        messages.push(Message::assistant_with_tools(
            &response.message.content,
            tool_calls,
        ));

        for (id, result) in tool_results {
            messages.push(Message::tool_result(&id, result));
        }
    }

    Err(AgentError::MaxIterations {
        agent_name: agent_name.to_string(),
        iterations: max_iterations,
    }
    .into())
}

/// Tool failures are reported back to the model rather than aborting the loop
async fn execute_tool_call(tools: &ToolRegistry, tool_call: &ToolCall) -> String {
    match tools.get(&tool_call.name) {
        Some(tool) => match tool.execute(tool_call.arguments.clone()).await {
            Ok(output) => output,
            Err(e) => format!("Error: {:#}", e),
        },
        None => format!("Error: unknown tool '{}'", tool_call.name),
    }
}
