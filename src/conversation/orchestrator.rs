//! Turn-taking loop between a simulated user and an inner agent.
//!
//! Each turn:
//! 1. Ask the simulated user for the next utterance (or a done signal)
//! 2. Append the utterance to the history
//! 3. Ask the inner agent to respond, given the full history
//! 4. Append the reply
//! 5. Stop when the turn bound is reached
//!
//! Actor errors, timeouts and cancellation end the run with a
//! [`TerminationReason`]; they never escape as errors.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::OrchestratorConfig;
use super::message::ConversationHistory;
use crate::agent::InnerAgent;
use crate::simulated_user::{SimulatedUser, UserTurn, DEFAULT_DONE_NOTE};
use crate::trajectory::{ConfigSnapshot, TerminationReason, Trajectory, TrajectoryRecorder};

/// Cause recorded when an actor call exceeds its timeout.
pub const TIMEOUT_CAUSE: &str = "timeout";

/// Outcome of one awaited actor call.
enum ActorCall<T> {
    Ready(T),
    Failed(String),
    Cancelled,
}

/// Awaits an actor future under an optional timeout, racing cancellation.
///
/// A pending cancellation wins before the actor future is first polled.
async fn call_actor<T, E, F>(
    call: F,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> ActorCall<T>
where
    E: Display,
    F: Future<Output = Result<T, E>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(TIMEOUT_CAUSE.to_string()),
            },
            None => call.await.map_err(|e| e.to_string()),
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => ActorCall::Cancelled,
        result = bounded => match result {
            Ok(value) => ActorCall::Ready(value),
            Err(cause) => ActorCall::Failed(cause),
        },
    }
}

/// Drives one conversation at a time.
///
/// The orchestrator holds configuration only; every run owns its own history
/// and recorder, so one orchestrator can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct ConversationOrchestrator {
    config: OrchestratorConfig,
}

impl ConversationOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    /// Orchestrator with a turn bound and no timeouts.
    pub fn with_max_turns(max_turns: u32) -> Self {
        Self::new(OrchestratorConfig::new(max_turns))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs a conversation from an empty history.
    pub async fn run<U, A>(&self, user: &mut U, agent: &A) -> Trajectory
    where
        U: SimulatedUser + ?Sized,
        A: InnerAgent + ?Sized,
    {
        self.run_from(user, agent, ConversationHistory::new(), &CancellationToken::new())
            .await
    }

    /// Runs a conversation that stops early once `cancel` fires.
    pub async fn run_with_cancellation<U, A>(
        &self,
        user: &mut U,
        agent: &A,
        cancel: &CancellationToken,
    ) -> Trajectory
    where
        U: SimulatedUser + ?Sized,
        A: InnerAgent + ?Sized,
    {
        self.run_from(user, agent, ConversationHistory::new(), cancel)
            .await
    }

    /// Runs a conversation on top of `initial` history.
    ///
    /// Cancellation is observed at every turn boundary and while waiting on
    /// either actor. An in-flight actor call is dropped and contributes
    /// nothing; messages already appended stay in the trajectory.
    pub async fn run_from<U, A>(
        &self,
        user: &mut U,
        agent: &A,
        initial: ConversationHistory,
        cancel: &CancellationToken,
    ) -> Trajectory
    where
        U: SimulatedUser + ?Sized,
        A: InnerAgent + ?Sized,
    {
        let snapshot = ConfigSnapshot {
            max_turns: self.config.max_turns,
            user_timeout_ms: self.config.user_timeout.map(duration_ms),
            agent_timeout_ms: self.config.agent_timeout.map(duration_ms),
            simulated_user: user.name().to_string(),
            inner_agent: agent.name().to_string(),
        };
        let mut recorder = TrajectoryRecorder::with_history(snapshot, initial);

        info!(
            trajectory_id = %recorder.trajectory_id(),
            max_turns = self.config.max_turns,
            simulated_user = user.name(),
            inner_agent = agent.name(),
            "Starting conversation"
        );

        let reason = self.drive(user, agent, &mut recorder, cancel).await;

        match &reason {
            TerminationReason::AgentFailure { cause } | TerminationReason::UserFailure { cause } => {
                warn!(
                    trajectory_id = %recorder.trajectory_id(),
                    reason = reason.tag(),
                    cause = %cause,
                    turns = recorder.turn_count(),
                    "Conversation ended by actor failure"
                );
            }
            _ => {
                info!(
                    trajectory_id = %recorder.trajectory_id(),
                    reason = reason.tag(),
                    turns = recorder.turn_count(),
                    messages = recorder.history().len(),
                    "Conversation finished"
                );
            }
        }

        recorder.finalize(reason)
    }

    async fn drive<U, A>(
        &self,
        user: &mut U,
        agent: &A,
        recorder: &mut TrajectoryRecorder,
        cancel: &CancellationToken,
    ) -> TerminationReason
    where
        U: SimulatedUser + ?Sized,
        A: InnerAgent + ?Sized,
    {
        let max_turns = self.config.max_turns;

        for turn in 1..=max_turns {
            if cancel.is_cancelled() {
                return TerminationReason::Cancelled;
            }

            let utterance = match call_actor(
                user.next_message(recorder.history()),
                self.config.user_timeout,
                cancel,
            )
            .await
            {
                ActorCall::Ready(UserTurn::Message(text)) => text,
                ActorCall::Ready(UserTurn::Done(note)) => {
                    return TerminationReason::UserDone {
                        message: note.unwrap_or_else(|| DEFAULT_DONE_NOTE.to_string()),
                    };
                }
                ActorCall::Failed(cause) => return TerminationReason::UserFailure { cause },
                ActorCall::Cancelled => return TerminationReason::Cancelled,
            };

            debug!(turn, chars = utterance.len(), "Simulated user spoke");
            recorder.record_user(turn, utterance.clone());

            let reply = match call_actor(
                agent.respond(&utterance, recorder.history()),
                self.config.agent_timeout,
                cancel,
            )
            .await
            {
                ActorCall::Ready(reply) => reply,
                ActorCall::Failed(cause) => return TerminationReason::AgentFailure { cause },
                ActorCall::Cancelled => return TerminationReason::Cancelled,
            };

            debug!(turn, chars = reply.len(), "Inner agent replied");
            recorder.record_agent(turn, reply);
        }

        TerminationReason::MaxTurnsReached { limit: max_turns }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
