//! Simulated users that drive the user side of a conversation.
//!
//! A simulated user is one owned instance per run. Each call to
//! [`SimulatedUser::next_message`] sees the full history so far and either
//! produces the next utterance or signals that the conversation is over.
//!
//! # Example
//!
//! ```ignore
//! use multiturn_harness::simulated_user::{ScriptedUser, SimulatedUser, UserTurn};
//!
//! let mut user = ScriptedUser::new(["hello", "thanks"]);
//! let turn = user.next_message(&history).await?;
//! ```

pub mod llm;
pub mod scripted;

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::ConversationHistory;
use crate::error::LlmError;

pub use llm::{LlmSimulatedUser, DEFAULT_DONE_TOKEN};
pub use scripted::ScriptedUser;

/// Closing note recorded when a done signal carries none.
pub const DEFAULT_DONE_NOTE: &str = "Conversation complete";

/// Outcome of asking the simulated user for its next move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserTurn {
    /// The next user utterance. May be empty.
    Message(String),
    /// The conversation is complete, with an optional closing note.
    Done(Option<String>),
}

impl UserTurn {
    pub fn message(text: impl Into<String>) -> Self {
        UserTurn::Message(text.into())
    }

    pub fn done(note: impl Into<String>) -> Self {
        UserTurn::Done(Some(note.into()))
    }
}

/// Errors a simulated user can raise.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("No goal set: provide one at construction or via set_instruction()")]
    MissingGoal,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("{0}")]
    Other(String),
}

/// Capability producing the user side of a conversation.
#[async_trait]
pub trait SimulatedUser: Send {
    /// Name recorded in trajectory metadata.
    fn name(&self) -> &str {
        "simulated-user"
    }

    /// Receives the task instruction before the loop starts.
    fn set_instruction(&mut self, _instruction: &str) {}

    /// Produces the next utterance, or signals completion.
    async fn next_message(&mut self, history: &ConversationHistory)
        -> Result<UserTurn, UserError>;
}

#[async_trait]
impl<T: SimulatedUser + ?Sized> SimulatedUser for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn set_instruction(&mut self, instruction: &str) {
        (**self).set_instruction(instruction)
    }

    async fn next_message(
        &mut self,
        history: &ConversationHistory,
    ) -> Result<UserTurn, UserError> {
        (**self).next_message(history).await
    }
}
