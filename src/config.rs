//! YAML run configuration.
//!
//! A [`RunSpec`] describes one conversation run: the turn bound, the task
//! instruction, per-actor timeouts, which simulated user and inner agent to
//! build, optional skills to install and where artifacts go.
//!
//! ```yaml
//! max_turns: 8
//! instruction: "Create hello.txt containing 'Hello, world!'"
//! agent_timeout_secs: 600
//! simulated_user:
//!   kind: scripted
//!   messages:
//!     - "Create hello.txt"
//!     - "Now print it"
//! agent:
//!   kind: command
//!   program: ./my-agent
//!   args: ["--quiet"]
//!   logs_dir: ./logs
//! skills:
//!   dir: ./skills
//!   filter: "pdf,docx"
//!   target: ./workspace/.claude/skills
//! output_dir: ./trajectories
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{CommandAgent, InnerAgent, LlmAgent};
use crate::conversation::OrchestratorConfig;
use crate::error::ConfigError;
use crate::llm::{LiteLlmClient, LlmProvider, DEFAULT_MODEL};
use crate::simulated_user::{LlmSimulatedUser, ScriptedUser, SimulatedUser};
use crate::skills::SkillFilter;

/// Turn bound used when the file does not set one.
pub const DEFAULT_MAX_TURNS: u32 = 50;

/// Artifact directory used when the file does not set one.
pub const DEFAULT_OUTPUT_DIR: &str = "./trajectories";

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Complete description of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Task instruction handed to the simulated user before the loop.
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub user_timeout_secs: Option<f64>,
    #[serde(default)]
    pub agent_timeout_secs: Option<f64>,
    pub simulated_user: UserSpec,
    pub agent: AgentSpec,
    #[serde(default)]
    pub skills: Option<SkillsSpec>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// Simulated-user variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserSpec {
    /// Fixed utterances sent in order.
    Scripted { messages: Vec<String> },
    /// Model-backed user pursuing a goal.
    Llm {
        #[serde(default)]
        goal: String,
        model: Option<String>,
        done_token: Option<String>,
        system_prompt: Option<String>,
        temperature: Option<f64>,
    },
}

/// Inner-agent variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentSpec {
    /// External program invoked once per turn.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        name: Option<String>,
        working_dir: Option<PathBuf>,
        logs_dir: Option<PathBuf>,
        #[serde(default)]
        include_history: bool,
        #[serde(default)]
        env: BTreeMap<String, String>,
    },
    /// Chat model answering from the conversation history.
    Llm {
        model: Option<String>,
        system_prompt: Option<String>,
        temperature: Option<f64>,
        max_tokens: Option<u32>,
    },
}

/// Skills installed before the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkillsSpec {
    pub dir: PathBuf,
    /// Comma-separated names. Absent installs all, empty installs none.
    #[serde(default)]
    pub filter: Option<String>,
    pub target: PathBuf,
}

impl SkillsSpec {
    pub fn skill_filter(&self) -> SkillFilter {
        SkillFilter::parse(self.filter.as_deref())
    }
}

impl RunSpec {
    /// Reads and validates a run file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parses and validates YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let spec: RunSpec = serde_yaml::from_str(content)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::InvalidMaxTurns(self.max_turns));
        }
        check_timeout("user_timeout_secs", self.user_timeout_secs)?;
        check_timeout("agent_timeout_secs", self.agent_timeout_secs)?;

        if let UserSpec::Llm {
            done_token: Some(token),
            ..
        } = &self.simulated_user
        {
            if token.trim().is_empty() {
                return Err(invalid("simulated_user.done_token", "must not be blank"));
            }
        }

        if let AgentSpec::Command { program, .. } = &self.agent {
            if program.trim().is_empty() {
                return Err(invalid("agent.program", "must not be empty"));
            }
        }

        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_turns: self.max_turns,
            user_timeout: self.user_timeout_secs.map(Duration::from_secs_f64),
            agent_timeout: self.agent_timeout_secs.map(Duration::from_secs_f64),
        }
    }

    /// Whether either actor talks to a model.
    pub fn needs_llm(&self) -> bool {
        matches!(self.simulated_user, UserSpec::Llm { .. }) || matches!(self.agent, AgentSpec::Llm { .. })
    }

    /// Builds the simulated user and hands it the instruction.
    pub fn build_simulated_user(
        &self,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Box<dyn SimulatedUser>, ConfigError> {
        let mut user: Box<dyn SimulatedUser> = match &self.simulated_user {
            UserSpec::Scripted { messages } => Box::new(ScriptedUser::new(messages.iter().cloned())),
            UserSpec::Llm {
                goal,
                model,
                done_token,
                system_prompt,
                temperature,
            } => {
                let provider = provider.ok_or_else(|| missing_provider("simulated_user"))?;
                let mut user = LlmSimulatedUser::new(provider, goal.clone());
                if let Some(token) = done_token {
                    user = user
                        .with_done_token(token.clone())
                        .map_err(|e| invalid("simulated_user.done_token", &e.to_string()))?;
                }
                if let Some(prompt) = system_prompt {
                    user = user.with_system_prompt(prompt.clone());
                }
                if let Some(model) = model {
                    user = user.with_model(model.clone());
                }
                if let Some(temperature) = temperature {
                    user = user.with_temperature(*temperature);
                }
                Box::new(user)
            }
        };

        if !self.instruction.is_empty() {
            user.set_instruction(&self.instruction);
        }
        Ok(user)
    }

    pub fn build_agent(
        &self,
        provider: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Box<dyn InnerAgent>, ConfigError> {
        let agent: Box<dyn InnerAgent> = match &self.agent {
            AgentSpec::Command {
                program,
                args,
                name,
                working_dir,
                logs_dir,
                include_history,
                env,
            } => {
                let mut agent = CommandAgent::new(program.clone())
                    .with_args(args.iter().cloned())
                    .with_history(*include_history);
                if let Some(name) = name {
                    agent = agent.with_name(name.clone());
                }
                if let Some(dir) = working_dir {
                    agent = agent.with_working_dir(dir.clone());
                }
                if let Some(dir) = logs_dir {
                    agent = agent.with_logs_dir(dir.clone());
                }
                for (key, value) in env {
                    agent = agent.with_env(key.clone(), value.clone());
                }
                Box::new(agent)
            }
            AgentSpec::Llm {
                model,
                system_prompt,
                temperature,
                max_tokens,
            } => {
                let provider = provider.ok_or_else(|| missing_provider("agent"))?;
                let mut agent = LlmAgent::new(provider);
                if let Some(model) = model {
                    agent = agent.with_model(model.clone());
                }
                if let Some(prompt) = system_prompt {
                    agent = agent.with_system_prompt(prompt.clone());
                }
                if let Some(temperature) = temperature {
                    agent = agent.with_temperature(*temperature);
                }
                if let Some(max_tokens) = max_tokens {
                    agent = agent.with_max_tokens(*max_tokens);
                }
                Box::new(agent)
            }
        };
        Ok(agent)
    }
}

/// Resolves an LLM client.
///
/// An explicit key, `OPENROUTER_API_KEY` or `LITELLM_API_KEY` selects
/// OpenRouter; otherwise the LiteLLM environment (`LITELLM_API_BASE`) is used.
pub fn build_llm_provider(
    api_key: Option<String>,
    model: Option<String>,
) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    let resolved_api_key = api_key
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .or_else(|| std::env::var("LITELLM_API_KEY").ok());

    if let Some(key) = resolved_api_key {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        info!(model = %model, "Using OpenRouter with specified API key");
        Ok(Arc::new(LiteLlmClient::new_with_defaults(key, model)))
    } else {
        info!("Using LiteLLM client from environment");
        Ok(Arc::new(LiteLlmClient::from_env()?))
    }
}

fn check_timeout(field: &str, value: Option<f64>) -> Result<(), ConfigError> {
    match value {
        Some(secs) if !secs.is_finite() || secs <= 0.0 => {
            Err(invalid(field, "must be a positive number of seconds"))
        }
        _ => Ok(()),
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn missing_provider(field: &str) -> ConfigError {
    invalid(field, "an LLM provider is required for kind 'llm'")
}
