//! Configuration for orchestrator runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds applied to a single conversation run.
///
/// `max_turns` has no default here; callers decide the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of turns. Zero ends the run before any actor is called.
    pub max_turns: u32,
    /// Timeout for each simulated-user call.
    pub user_timeout: Option<Duration>,
    /// Timeout for each inner-agent call.
    pub agent_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    pub fn new(max_turns: u32) -> Self {
        Self {
            max_turns,
            user_timeout: None,
            agent_timeout: None,
        }
    }

    pub fn with_user_timeout(mut self, timeout: Duration) -> Self {
        self.user_timeout = Some(timeout);
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }
}
