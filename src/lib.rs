//! multiturn-harness: multi-turn conversation orchestration for agent evaluation.
//!
//! A simulated user and an inner agent take turns until the user is done,
//! the turn limit is reached, an actor fails or the run is cancelled. Every
//! run produces a [`Trajectory`] that can be stored as JSON or exported in
//! ATIF form.

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod simulated_user;
pub mod skills;
pub mod trajectory;

pub use agent::{AgentError, InnerAgent};
pub use conversation::{
    ConversationHistory, ConversationMessage, ConversationOrchestrator, OrchestratorConfig, Role,
};
pub use error::{ConfigError, LlmError, SkillError};
pub use simulated_user::{SimulatedUser, UserError, UserTurn};
pub use trajectory::{TerminationReason, Trajectory, TrajectoryRecorder, TrajectoryStorage};
