//! Multi-turn conversation orchestration.
//!
//! The orchestrator alternates between a [`SimulatedUser`] and an
//! [`InnerAgent`] until the user is done, the turn bound is hit, an actor
//! fails or the caller cancels.
//!
//! # Example
//!
//! ```ignore
//! use multiturn_harness::conversation::{ConversationOrchestrator, OrchestratorConfig};
//! use multiturn_harness::simulated_user::ScriptedUser;
//!
//! let orchestrator = ConversationOrchestrator::new(OrchestratorConfig::new(10));
//! let mut user = ScriptedUser::new(["Write a haiku", "Make it rhyme"]);
//! let trajectory = orchestrator.run(&mut user, &agent).await;
//! println!("{}", trajectory.termination_reason());
//! ```
//!
//! [`SimulatedUser`]: crate::simulated_user::SimulatedUser
//! [`InnerAgent`]: crate::agent::InnerAgent

pub mod config;
pub mod message;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use message::{ConversationHistory, ConversationMessage, Role};
pub use orchestrator::{ConversationOrchestrator, TIMEOUT_CAUSE};
