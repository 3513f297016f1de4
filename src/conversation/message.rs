//! Conversation message and history types.
//!
//! A [`ConversationHistory`] is append-only: every pushed message receives
//! `turn_index == len()` at the time of the push, so indices are strictly
//! increasing from 0 with no gaps.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The simulated user.
    User,
    /// The inner agent under evaluation.
    Agent,
    /// Framing text injected by the caller.
    System,
}

impl Role {
    /// Label used when rendering a history as a plain-text transcript.
    pub fn transcript_label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Agent => "Assistant",
            Role::System => "System",
        }
    }

    /// Role name used by OpenAI-compatible chat APIs.
    pub fn chat_role(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

/// One utterance in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    role: Role,
    content: String,
    turn_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<BTreeMap<String, Value>>,
}

impl ConversationMessage {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Position of this message in its history (0-based).
    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, Value>> {
        self.metadata.as_ref()
    }
}

/// Ordered, append-only sequence of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from `(role, content)` pairs, assigning indices in order.
    pub fn from_turns<I, S>(turns: I) -> Self
    where
        I: IntoIterator<Item = (Role, S)>,
        S: Into<String>,
    {
        let mut history = Self::new();
        for (role, content) in turns {
            history.push(role, content, None);
        }
        history
    }

    /// Appends a message and returns it.
    pub fn push(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: Option<BTreeMap<String, Value>>,
    ) -> &ConversationMessage {
        let turn_index = self.messages.len();
        self.messages.push(ConversationMessage {
            role,
            content: content.into(),
            turn_index,
            metadata,
        });
        &self.messages[turn_index]
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConversationMessage> {
        self.messages.iter()
    }

    /// Renders the history as `"{Role}: {content}"` lines.
    ///
    /// Returns `None` for an empty history so callers can pick their own
    /// placeholder.
    pub fn transcript(&self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role.transcript_label(), m.content))
            .collect();
        Some(lines.join("\n"))
    }

    pub(crate) fn into_messages(self) -> Vec<ConversationMessage> {
        self.messages
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a ConversationMessage;
    type IntoIter = std::slice::Iter<'a, ConversationMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_assigns_sequential_indices() {
        let mut history = ConversationHistory::new();
        history.push(Role::User, "hi", None);
        history.push(Role::Agent, "hello", None);
        history.push(Role::User, "", None);

        let indices: Vec<usize> = history.iter().map(|m| m.turn_index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(history.last().map(|m| m.content()), Some(""));
    }

    #[test]
    fn test_from_turns_continues_indexing() {
        let mut history =
            ConversationHistory::from_turns([(Role::System, "be brief"), (Role::User, "hi")]);
        let pushed = history.push(Role::Agent, "ok", None);
        assert_eq!(pushed.turn_index(), 2);
        assert_eq!(pushed.role(), Role::Agent);
    }

    #[test]
    fn test_transcript_labels() {
        let history = ConversationHistory::from_turns([(Role::User, "hi"), (Role::Agent, "hello!")]);
        assert_eq!(
            history.transcript().as_deref(),
            Some("User: hi\nAssistant: hello!")
        );
        assert!(ConversationHistory::new().transcript().is_none());
    }

    #[test]
    fn test_message_serialization_shape() {
        let mut history = ConversationHistory::new();
        let mut meta = BTreeMap::new();
        meta.insert("turn".to_string(), json!(1));
        history.push(Role::User, "step 1", Some(meta));
        history.push(Role::Agent, "ack 1", None);

        let value = serde_json::to_value(&history).expect("serialization should work");
        assert_eq!(value[0]["role"], "user");
        assert_eq!(value[0]["turn_index"], 0);
        assert_eq!(value[0]["metadata"]["turn"], 1);
        assert_eq!(value[1]["role"], "agent");
        assert!(value[1].get("metadata").is_none());

        let parsed: ConversationHistory =
            serde_json::from_value(value).expect("deserialization should work");
        assert_eq!(parsed, history);
    }
}
