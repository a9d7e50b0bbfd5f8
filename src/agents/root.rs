use super::sub_agents::{create_research_agent, create_writer_agent};
use super::{AgentConfig, LlmAgent};
use crate::config::{AgentSettings, AppSettings};

/// The application's main agent, named after the application.
///
/// Starts with no tools or sub-agents; add them to the returned agent's config
/// or build an [`AgentConfig`] directly.
pub fn create_my_agent(agent: &AgentSettings, app: &AppSettings) -> LlmAgent {
    LlmAgent::new(
        AgentConfig::new(&app.name, &agent.model)
            .description(&agent.description)
            .instruction(&agent.instruction)
            .max_iterations(agent.max_iterations),
    )
}

/// A main agent that delegates to the researcher and writer
pub fn create_coordinator_agent() -> LlmAgent {
    LlmAgent::new(
        AgentConfig::new("coordinator", "gpt-4")
            .description("Coordinates specialized sub-agents")
            .instruction("You coordinate different specialists to complete complex tasks.")
            .sub_agent(create_research_agent())
            .sub_agent(create_writer_agent()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Agent;
    use crate::config::Settings;

    #[test]
    fn my_agent_follows_settings() {
        let settings = Settings::default();
        let agent = create_my_agent(&settings.agent, &settings.app);

        assert_eq!(agent.name(), "my_agent");
        assert_eq!(agent.model(), "gpt-4");
        assert_eq!(agent.description(), "A helpful AI assistant");
        assert!(agent.instruction().starts_with("You are a helpful AI assistant."));
        assert!(agent.sub_agents().is_empty());
        assert!(agent.config().tools.is_empty());
        assert_eq!(agent.config().max_iterations, 10);
    }

    #[test]
    fn coordinator_has_specialists() {
        let agent = create_coordinator_agent();
        let names: Vec<&str> = agent.sub_agents().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["researcher", "writer"]);
    }
}
