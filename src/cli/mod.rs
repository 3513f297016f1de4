//! Command-line interface for multiturn-harness.
//!
//! Provides commands for running conversations, previewing skills and
//! inspecting stored trajectories.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
