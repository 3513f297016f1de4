//! Inner agents: the systems under evaluation.
//!
//! The harness treats an agent as a black box answering one operation,
//! [`InnerAgent::respond`]. Two adapters ship with the crate:
//! 1. [`CommandAgent`] runs an external program per turn (a coding agent CLI)
//! 2. [`LlmAgent`] sends the history to a chat model

pub mod command;
pub mod llm;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::ConversationHistory;
use crate::error::LlmError;

pub use command::CommandAgent;
pub use llm::LlmAgent;

/// Error type for inner agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Agent returned no response")]
    EmptyResponse,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability answering user utterances.
///
/// `history` already ends with the user message whose text is `prompt`.
#[async_trait]
pub trait InnerAgent: Send + Sync {
    /// Name recorded in trajectory metadata.
    fn name(&self) -> &str;

    /// Produces the agent's reply to `prompt`.
    async fn respond(&self, prompt: &str, history: &ConversationHistory)
        -> Result<String, AgentError>;
}

#[async_trait]
impl<T: InnerAgent + ?Sized> InnerAgent for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn respond(
        &self,
        prompt: &str,
        history: &ConversationHistory,
    ) -> Result<String, AgentError> {
        (**self).respond(prompt, history).await
    }
}

#[async_trait]
impl<T: InnerAgent + ?Sized> InnerAgent for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn respond(
        &self,
        prompt: &str,
        history: &ConversationHistory,
    ) -> Result<String, AgentError> {
        (**self).respond(prompt, history).await
    }
}
