//! Specialist agents and the two example ways of combining them.

use super::{AgentConfig, LlmAgent, ParallelAgent, SequentialAgent};

const RESEARCH_INSTRUCTION: &str = "\
You are a research specialist. Your role is to:
- Find relevant information on topics
- Analyze and summarize findings
- Identify credible sources
- Highlight key insights
Be thorough but concise in your research.";

const WRITER_INSTRUCTION: &str = "\
You are a professional writer. Your role is to:
- Create clear, engaging content
- Adapt tone and style as needed
- Ensure proper grammar and structure
- Make complex topics accessible
Focus on clarity and impact.";

const REVIEWER_INSTRUCTION: &str = "\
You are a content reviewer. Your role is to:
- Check for accuracy and clarity
- Suggest improvements
- Ensure consistency
- Verify completeness
Be constructive and specific in your feedback.";

pub fn create_research_agent() -> LlmAgent {
    LlmAgent::new(
        AgentConfig::new("researcher", "gpt-4")
            .description("Specializes in researching and gathering information")
            .instruction(RESEARCH_INSTRUCTION),
    )
}

pub fn create_writer_agent() -> LlmAgent {
    LlmAgent::new(
        AgentConfig::new("writer", "gpt-4")
            .description("Specializes in creating well-written content")
            .instruction(WRITER_INSTRUCTION),
    )
}

/// Reviewing is cheaper work, so this one runs on a lighter model
pub fn create_reviewer_agent() -> LlmAgent {
    LlmAgent::new(
        AgentConfig::new("reviewer", "gpt-3.5-turbo")
            .description("Reviews and improves content quality")
            .instruction(REVIEWER_INSTRUCTION),
    )
}

/// Research, then write, then review
pub fn create_content_workflow() -> SequentialAgent {
    SequentialAgent::new("content_workflow", "Research, write, and review content")
        .then(create_research_agent())
        .then(create_writer_agent())
        .then(create_reviewer_agent())
}

/// Technical and business analysis of the same request, side by side
pub fn create_parallel_analysis() -> ParallelAgent {
    ParallelAgent::new(
        "parallel_analysis",
        "Analyze from multiple perspectives simultaneously",
    )
    .with(LlmAgent::new(
        AgentConfig::new("technical_analyzer", "gpt-4")
            .description("Analyzes technical aspects")
            .instruction("Focus on technical accuracy and feasibility."),
    ))
    .with(LlmAgent::new(
        AgentConfig::new("business_analyzer", "gpt-4")
            .description("Analyzes business implications")
            .instruction("Focus on business value and ROI."),
    ))
}
