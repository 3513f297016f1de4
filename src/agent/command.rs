//! Process-backed inner agent.
//!
//! Launches a program once per turn, feeds the turn input on stdin and takes
//! the trimmed stdout as the reply.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{AgentError, InnerAgent};
use crate::conversation::ConversationHistory;

/// Adapter for agents driven through a command line.
#[derive(Debug)]
pub struct CommandAgent {
    name: String,
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    logs_dir: Option<PathBuf>,
    include_history: bool,
    invocations: AtomicUsize,
}

impl CommandAgent {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            name: program.clone(),
            program,
            args: Vec::new(),
            working_dir: None,
            env_vars: Vec::new(),
            logs_dir: None,
            include_history: false,
            invocations: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Persists each invocation's output under `command-{n}/`.
    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(dir.into());
        self
    }

    /// Sends the prior conversation ahead of the prompt on stdin.
    pub fn with_history(mut self, include: bool) -> Self {
        self.include_history = include;
        self
    }

    /// Number of times the program has been launched.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn render_input(&self, prompt: &str, history: &ConversationHistory) -> String {
        if !self.include_history {
            return prompt.to_string();
        }
        // The last message is the prompt itself.
        let prior = ConversationHistory::from_turns(
            history
                .iter()
                .take(history.len().saturating_sub(1))
                .map(|m| (m.role(), m.content().to_string())),
        );
        match prior.transcript() {
            Some(transcript) => format!(
                "Conversation so far:\n{}\n\nUser: {}",
                transcript, prompt
            ),
            None => prompt.to_string(),
        }
    }

    async fn write_logs(
        &self,
        dir: &Path,
        invocation: usize,
        stdout: &str,
        stderr: &str,
    ) -> Result<(), AgentError> {
        let command_dir = dir.join(format!("command-{}", invocation));
        tokio::fs::create_dir_all(&command_dir).await?;
        tokio::fs::write(command_dir.join("stdout.txt"), stdout).await?;
        tokio::fs::write(command_dir.join("stderr.txt"), stderr).await?;
        Ok(())
    }
}

#[async_trait]
impl InnerAgent for CommandAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(
        &self,
        prompt: &str,
        history: &ConversationHistory,
    ) -> Result<String, AgentError> {
        let invocation = self.invocations.fetch_add(1, Ordering::SeqCst);
        let input = self.render_input(prompt, history);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        debug!(program = %self.program, invocation, "Launching agent command");

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AgentError::NotFound(self.program.clone()),
            _ => AgentError::ExecutionFailed(format!("Failed to spawn {}: {}", self.program, e)),
        })?;

        // stdin is fed while stdout and stderr drain, so neither side can
        // stall on a full pipe.
        let stdin = child.stdin.take();
        let writer = async move {
            match stdin {
                Some(mut stdin) => {
                    let written = stdin.write_all(input.as_bytes()).await;
                    drop(stdin);
                    written
                }
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(writer, child.wait_with_output());

        // Programs that ignore stdin may exit before reading it.
        if let Err(e) = written {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
        }
        let output = output?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if let Some(ref dir) = self.logs_dir {
            if let Err(e) = self.write_logs(dir, invocation, &stdout, &stderr).await {
                warn!(agent = %self.name, invocation, error = %e, "Failed to write command logs");
            }
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(AgentError::ExecutionFailed(format!(
                "{} exited with code {}: {}",
                self.program,
                code,
                stderr.trim()
            )));
        }

        let response = stdout.trim().to_string();
        if response.is_empty() {
            warn!(agent = %self.name, invocation, "No response from inner agent");
        }
        info!(agent = %self.name, invocation, chars = response.len(), "Agent command completed");
        Ok(response)
    }
}
