//! Trajectory data types for conversation recording.
//!
//! A [`Trajectory`] is the single artifact produced by one orchestrator run:
//! the ordered messages, why the loop stopped, how many turns ran and the
//! run-level metadata needed to interpret it later.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ConversationMessage;

/// Why a conversation loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The simulated user signalled completion.
    UserDone {
        /// Closing note carried by the done signal.
        message: String,
    },

    /// The turn bound was reached.
    MaxTurnsReached {
        /// The configured bound.
        limit: u32,
    },

    /// The inner agent failed; the run's last user message has no reply.
    AgentFailure {
        /// Error text, or "timeout".
        cause: String,
    },

    /// The simulated user failed to produce an utterance.
    UserFailure {
        /// Error text, or "timeout".
        cause: String,
    },

    /// The caller cancelled the run.
    Cancelled,
}

impl TerminationReason {
    /// Short tag for logs and summaries.
    pub fn tag(&self) -> &'static str {
        match self {
            TerminationReason::UserDone { .. } => "user_done",
            TerminationReason::MaxTurnsReached { .. } => "max_turns_reached",
            TerminationReason::AgentFailure { .. } => "agent_failure",
            TerminationReason::UserFailure { .. } => "user_failure",
            TerminationReason::Cancelled => "cancelled",
        }
    }

    /// True for the failure variants.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TerminationReason::AgentFailure { .. } | TerminationReason::UserFailure { .. }
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::UserDone { message } => write!(f, "user done: {}", message),
            TerminationReason::MaxTurnsReached { limit } => {
                write!(f, "max turns reached ({})", limit)
            }
            TerminationReason::AgentFailure { cause } => write!(f, "agent failure: {}", cause),
            TerminationReason::UserFailure { cause } => write!(f, "user failure: {}", cause),
            TerminationReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Configuration in effect for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Turn bound.
    pub max_turns: u32,

    /// Per-call timeout for the simulated user, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_timeout_ms: Option<u64>,

    /// Per-call timeout for the inner agent, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_timeout_ms: Option<u64>,

    /// Name reported by the simulated user.
    pub simulated_user: String,

    /// Name reported by the inner agent.
    pub inner_agent: String,
}

/// Run-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// When the loop started.
    pub started_at: DateTime<Utc>,

    /// When the loop stopped.
    pub ended_at: DateTime<Utc>,

    /// Configuration snapshot.
    pub config: ConfigSnapshot,
}

impl RunMetadata {
    /// Wall-clock duration of the run.
    pub fn duration(&self) -> Duration {
        (self.ended_at - self.started_at).to_std().unwrap_or_default()
    }
}

/// The structured record of one conversation run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    id: Uuid,
    messages: Vec<ConversationMessage>,
    termination_reason: TerminationReason,
    turn_count: u32,
    metadata: RunMetadata,
}

impl Trajectory {
    pub(crate) fn new(
        id: Uuid,
        messages: Vec<ConversationMessage>,
        termination_reason: TerminationReason,
        turn_count: u32,
        metadata: RunMetadata,
    ) -> Self {
        Self {
            id,
            messages,
            termination_reason,
            turn_count,
            metadata,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn termination_reason(&self) -> &TerminationReason {
        &self.termination_reason
    }

    /// Turns in which a user utterance was produced, partial turns included.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }
}
