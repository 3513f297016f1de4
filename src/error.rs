//! Error types for multiturn-harness operations.
//!
//! Defines the error types shared across subsystems:
//! - LLM API interactions
//! - Run configuration loading and actor construction
//! - Skill discovery and installation
//!
//! Actor-side errors (`UserError`, `AgentError`) live next to their traits and
//! trajectory persistence errors live in `trajectory::storage`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API base URL: LITELLM_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while loading a run configuration or building the
/// actors it describes.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("max_turns must be a positive integer, got {0}")]
    InvalidMaxTurns(u32),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("LLM client unavailable: {0}")]
    Llm(#[from] LlmError),
}

/// Errors that can occur while discovering or installing skills.
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("Failed to copy skill '{name}': {reason}")]
    CopyFailed { name: String, reason: String },

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
