//! Trajectory recorder for conversation runs.
//!
//! The `TrajectoryRecorder` owns the history while a run is in progress and
//! assembles the final [`Trajectory`] whichever way the run ends.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::types::{ConfigSnapshot, RunMetadata, TerminationReason, Trajectory};
use crate::conversation::{ConversationHistory, Role};

/// Accumulates the messages of one run.
///
/// # Usage Pattern
///
/// For each turn:
/// 1. Call `record_user()` with the simulated user's utterance
/// 2. Call `record_agent()` with the inner agent's reply
///
/// When the loop stops, call `finalize()` with the termination reason.
#[derive(Debug)]
pub struct TrajectoryRecorder {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: ConfigSnapshot,
    history: ConversationHistory,
    turn_count: u32,
    awaiting_agent: bool,
}

impl TrajectoryRecorder {
    /// Starts recording with an empty history.
    pub fn new(config: ConfigSnapshot) -> Self {
        Self::with_history(config, ConversationHistory::new())
    }

    /// Starts recording on top of a caller-supplied history.
    pub fn with_history(config: ConfigSnapshot, history: ConversationHistory) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            config,
            history,
            turn_count: 0,
            awaiting_agent: false,
        }
    }

    /// Records the user utterance opening turn `turn` (1-based).
    pub fn record_user(&mut self, turn: u32, content: impl Into<String>) {
        debug_assert!(!self.awaiting_agent, "user message recorded twice in one turn");
        self.history
            .push(Role::User, content, Some(turn_metadata(turn, true)));
        self.turn_count += 1;
        self.awaiting_agent = true;
    }

    /// Records the agent reply closing turn `turn`.
    pub fn record_agent(&mut self, turn: u32, content: impl Into<String>) {
        debug_assert!(self.awaiting_agent, "agent reply recorded without a user message");
        self.history
            .push(Role::Agent, content, Some(turn_metadata(turn, false)));
        self.awaiting_agent = false;
    }

    /// Read-only view of the history so far.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Turns started so far.
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn trajectory_id(&self) -> Uuid {
        self.id
    }

    /// Finalizes the trajectory and returns it.
    pub fn finalize(self, reason: TerminationReason) -> Trajectory {
        let metadata = RunMetadata {
            started_at: self.started_at,
            ended_at: Utc::now(),
            config: self.config,
        };
        Trajectory::new(
            self.id,
            self.history.into_messages(),
            reason,
            self.turn_count,
            metadata,
        )
    }
}

fn turn_metadata(turn: u32, simulated: bool) -> BTreeMap<String, Value> {
    let mut metadata = BTreeMap::new();
    metadata.insert("turn".to_string(), json!(turn));
    if simulated {
        metadata.insert("simulated".to_string(), json!(true));
    }
    metadata
}
