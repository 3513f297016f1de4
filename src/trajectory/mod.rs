//! Trajectory recording for conversation runs.
//!
//! # Overview
//!
//! A trajectory is the complete record of one run:
//! - **Messages**: every user utterance and agent reply, in order
//! - **Termination reason**: why the loop stopped
//! - **Turn count**: how many turns ran, partial ones included
//! - **Metadata**: start/end timestamps and a configuration snapshot
//!
//! # Usage
//!
//! ```rust,ignore
//! use multiturn_harness::trajectory::{TrajectoryStorage, TerminationReason};
//!
//! let trajectory = orchestrator.run(&mut user, &agent).await;
//! if let TerminationReason::AgentFailure { cause } = trajectory.termination_reason() {
//!     eprintln!("agent failed: {cause}");
//! }
//!
//! let storage = TrajectoryStorage::new("./trajectories");
//! storage.save(&trajectory).await?;
//! storage.save_atif(&trajectory).await?;
//! ```

pub mod atif;
pub mod recorder;
pub mod storage;
pub mod types;

pub use atif::{AtifDocument, ATIF_SCHEMA_VERSION};
pub use recorder::TrajectoryRecorder;
pub use storage::{load_file, StorageError, TrajectoryStorage};
pub use types::{ConfigSnapshot, RunMetadata, TerminationReason, Trajectory};
