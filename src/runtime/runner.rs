use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, instrument};

use crate::agents::Agent;
use crate::error::AgentError;
use crate::llm::{Message, ModelResolver};
use crate::session::{ConversationTurn, SessionManager};

/// Result of one conversational turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Session the turn was recorded in
    pub session_id: String,
    /// The agent's reply
    pub reply: String,
}

/// Runs an agent inside a user's persistent session.
///
/// Each turn resumes the user's session, replays its recorded conversation as
/// chat history, and records the new exchange.
pub struct Runner {
    agent: Arc<dyn Agent>,
    sessions: Arc<SessionManager>,
    models: Arc<dyn ModelResolver>,
}

impl Runner {
    pub fn new(
        agent: Arc<dyn Agent>,
        sessions: Arc<SessionManager>,
        models: Arc<dyn ModelResolver>,
    ) -> Self {
        Self {
            agent,
            sessions,
            models,
        }
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Run one turn for the configured default user
    pub async fn run_default(&self, input: &str) -> Result<RunOutput> {
        let user_id = self.sessions.default_user_id().to_string();
        self.run(&user_id, input).await
    }

    /// Run one turn for `user_id`
    #[instrument(skip(self, input), fields(agent = self.agent.name()))]
    pub async fn run(&self, user_id: &str, input: &str) -> Result<RunOutput> {
        let session_id = self.sessions.get_or_create_session(user_id).await?;

        let mut session = self
            .sessions
            .load_session(user_id, &session_id)
            .await?
            .ok_or_else(|| AgentError::Session(format!("session not found: {}", session_id)))?;

        let mut messages = Message::history(&session.conversations());
        messages.push(Message::user(input));

        info!(session_id = %session_id, history = messages.len() - 1, "running agent");

        let reply = match self.agent.run(&messages, &self.models).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "agent run failed");
                return Err(e);
            }
        };

        session.push_conversation(ConversationTurn::new(input, &reply, self.agent.name()))?;
        self.sessions.save_session(&session).await?;

        info!(session_id = %session_id, "turn recorded");
        Ok(RunOutput { session_id, reply })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::llm::LlmProvider;
    use crate::session::InMemoryStore;

    /// Replies with how many messages it was given
    struct Counter;

    #[async_trait]
    impl Agent for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn description(&self) -> &str {
            "Counts messages"
        }

        async fn run(&self, messages: &[Message], _: &Arc<dyn ModelResolver>) -> Result<String> {
            Ok(messages.len().to_string())
        }
    }

    struct NoModels;

    impl ModelResolver for NoModels {
        fn resolve(&self, model: &str) -> Result<Arc<dyn LlmProvider>, AgentError> {
            Err(AgentError::Provider(model.to_string()))
        }
    }

    fn runner() -> Runner {
        let sessions = SessionManager::new(Arc::new(InMemoryStore::new()), "app", "default_user");
        Runner::new(Arc::new(Counter), Arc::new(sessions), Arc::new(NoModels))
    }

    #[tokio::test]
    async fn history_grows_each_turn() {
        let runner = runner();

        let first = runner.run("alice", "hi").await.unwrap();
        assert_eq!(first.reply, "1");

        let second = runner.run("alice", "again").await.unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.reply, "3");

        let session = runner
            .sessions()
            .load_session("alice", &first.session_id)
            .await
            .unwrap()
            .unwrap();
        let turns = session.conversations();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].user, "hi");
        assert_eq!(turns[0].agent, "1");
        assert_eq!(turns[1].author, "counter");
    }

    #[tokio::test]
    async fn default_user_is_used() {
        let runner = runner();
        let out = runner.run_default("hello").await.unwrap();
        let sessions = runner.sessions().list_sessions("default_user").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, out.session_id);
    }
}
