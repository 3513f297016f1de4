//! Agent Trajectory Interchange Format (ATIF) export.
//!
//! Converts a [`Trajectory`] into the `ATIF-v1.5` document consumed by
//! evaluation dashboards: one numbered step per message plus session-level
//! metrics.
//!
//! Step `extra.turn` is 0-based, matching ATIF files written by other
//! harnesses; the native trajectory keeps 1-based turn numbers. Steps carry
//! no `timestamp` since messages are recorded without one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::types::Trajectory;

/// Schema version written into every document.
pub const ATIF_SCHEMA_VERSION: &str = "ATIF-v1.5";

/// Agent name reported for the multi-turn harness itself.
pub const HARNESS_AGENT_NAME: &str = "multi-turn-agent";

/// Top-level ATIF document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtifDocument {
    pub schema_version: String,
    pub session_id: String,
    pub agent: AtifAgent,
    pub steps: Vec<AtifStep>,
    pub final_metrics: AtifMetrics,
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtifAgent {
    pub name: String,
    pub version: String,
}

/// One message of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtifStep {
    /// 1-based step number.
    pub step_id: usize,
    /// "user", "agent" or "system".
    pub source: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtifMetrics {
    pub total_steps: usize,
}

impl AtifDocument {
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let steps: Vec<AtifStep> = trajectory
            .messages()
            .iter()
            .enumerate()
            .map(|(i, message)| AtifStep {
                step_id: i + 1,
                source: message.role().to_string(),
                message: message.content().to_string(),
                extra: step_extra(message.metadata()),
            })
            .collect();

        let config = &trajectory.metadata().config;
        let mut extra = BTreeMap::new();
        extra.insert("inner_agent".to_string(), json!(config.inner_agent));
        extra.insert("simulated_user".to_string(), json!(config.simulated_user));
        extra.insert("max_turns".to_string(), json!(config.max_turns));
        extra.insert("turn_count".to_string(), json!(trajectory.turn_count()));
        extra.insert(
            "termination".to_string(),
            serde_json::to_value(trajectory.termination_reason()).unwrap_or(Value::Null),
        );

        Self {
            schema_version: ATIF_SCHEMA_VERSION.to_string(),
            session_id: trajectory.id().to_string(),
            agent: AtifAgent {
                name: HARNESS_AGENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            final_metrics: AtifMetrics {
                total_steps: steps.len(),
            },
            steps,
            extra,
        }
    }
}

/// Copies message metadata, shifting `turn` to 0-based.
fn step_extra(metadata: Option<&BTreeMap<String, Value>>) -> BTreeMap<String, Value> {
    let mut extra = metadata.cloned().unwrap_or_default();
    if let Some(turn) = extra.get("turn").and_then(Value::as_u64) {
        extra.insert("turn".to_string(), json!(turn.saturating_sub(1)));
    }
    extra
}
