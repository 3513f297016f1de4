//! Scripted simulated user.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::{SimulatedUser, UserError, UserTurn};
use crate::conversation::ConversationHistory;

/// Replays a fixed list of utterances, then signals done.
#[derive(Debug, Clone)]
pub struct ScriptedUser {
    remaining: VecDeque<String>,
}

impl ScriptedUser {
    pub fn new<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remaining: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of utterances not yet sent.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

#[async_trait]
impl SimulatedUser for ScriptedUser {
    fn name(&self) -> &str {
        "scripted-user"
    }

    async fn next_message(
        &mut self,
        _history: &ConversationHistory,
    ) -> Result<UserTurn, UserError> {
        Ok(match self.remaining.pop_front() {
            Some(message) => UserTurn::Message(message),
            None => UserTurn::done("All messages sent"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_messages_in_order() {
        let mut user = ScriptedUser::new(["first", "second", "third"]);
        let history = ConversationHistory::new();

        for expected in ["first", "second", "third"] {
            let turn = user.next_message(&history).await.unwrap();
            assert_eq!(turn, UserTurn::message(expected));
        }
        assert_eq!(user.remaining(), 0);
    }

    #[tokio::test]
    async fn test_done_when_exhausted() {
        let mut user = ScriptedUser::new(["only one"]);
        let history = ConversationHistory::new();

        user.next_message(&history).await.unwrap();
        let turn = user.next_message(&history).await.unwrap();
        assert_eq!(turn, UserTurn::done("All messages sent"));
    }

    #[tokio::test]
    async fn test_empty_script_is_done_immediately() {
        let mut user = ScriptedUser::new(Vec::<String>::new());
        let turn = user.next_message(&ConversationHistory::new()).await.unwrap();
        assert!(matches!(turn, UserTurn::Done(_)));
    }
}
