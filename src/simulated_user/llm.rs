//! Model-backed simulated user.
//!
//! Asks an LLM to play a human pursuing a goal. The model replies with the
//! next user message, or with a done token once the goal is met.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{SimulatedUser, UserError, UserTurn};
use crate::conversation::ConversationHistory;
use crate::llm::{GenerationRequest, LlmProvider, Message};

/// Token the model emits to end the conversation.
pub const DEFAULT_DONE_TOKEN: &str = "<<DONE>>";

const NO_PRIOR_MESSAGES: &str = "(no prior messages)";

/// Simulated user that delegates each turn to an [`LlmProvider`].
pub struct LlmSimulatedUser {
    provider: Arc<dyn LlmProvider>,
    goal: String,
    done_token: String,
    system_prompt: String,
    model: String,
    temperature: Option<f64>,
}

impl std::fmt::Debug for LlmSimulatedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSimulatedUser")
            .field("goal", &self.goal)
            .field("done_token", &self.done_token)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LlmSimulatedUser {
    /// Creates a user with the default done token and system prompt.
    ///
    /// An empty `goal` is allowed; it can be filled later through
    /// [`SimulatedUser::set_instruction`].
    pub fn new(provider: Arc<dyn LlmProvider>, goal: impl Into<String>) -> Self {
        Self {
            provider,
            goal: goal.into(),
            done_token: DEFAULT_DONE_TOKEN.to_string(),
            system_prompt: default_system_prompt(DEFAULT_DONE_TOKEN),
            model: String::new(),
            temperature: None,
        }
    }

    /// Replaces the done token. The default system prompt is rebuilt around
    /// it unless a custom prompt was already set.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Config` if the token is blank.
    pub fn with_done_token(mut self, token: impl Into<String>) -> Result<Self, UserError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(UserError::Config(
                "done_token must be a non-empty string".to_string(),
            ));
        }
        if self.system_prompt == default_system_prompt(&self.done_token) {
            self.system_prompt = default_system_prompt(&token);
        }
        self.done_token = token;
        Ok(self)
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Model to request; empty uses the provider default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn done_token(&self) -> &str {
        &self.done_token
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn build_prompt(&self, history: &ConversationHistory) -> String {
        let transcript = history
            .transcript()
            .unwrap_or_else(|| NO_PRIOR_MESSAGES.to_string());
        format!(
            "User goal:\n{}\n\nConversation so far:\n{}\n\nNext user message:",
            self.goal, transcript
        )
    }

    fn is_done_response(&self, response: &str) -> bool {
        let normalized = response.trim();
        normalized == self.done_token
            || normalized.starts_with(&format!("{} ", self.done_token))
            || normalized.starts_with(&format!("{}\n", self.done_token))
    }
}

fn default_system_prompt(done_token: &str) -> String {
    format!(
        "You are simulating a human user in a multi-turn conversation with an \
         assistant. Provide only the next user message, based on the user's goal \
         and the conversation so far. Do not include analysis or meta-commentary. \
         If the user's goal is complete, respond with the exact token \
         {done_token} and nothing else."
    )
}

#[async_trait]
impl SimulatedUser for LlmSimulatedUser {
    fn name(&self) -> &str {
        "llm-simulated-user"
    }

    fn set_instruction(&mut self, instruction: &str) {
        if self.goal.is_empty() {
            self.goal = instruction.to_string();
        }
    }

    async fn next_message(
        &mut self,
        history: &ConversationHistory,
    ) -> Result<UserTurn, UserError> {
        if self.goal.is_empty() {
            return Err(UserError::MissingGoal);
        }

        let mut request = GenerationRequest::new(
            self.model.clone(),
            vec![
                Message::system(&self.system_prompt),
                Message::user(self.build_prompt(history)),
            ],
        );
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.provider.generate(request).await?;
        let text = response.first_content().unwrap_or_default().trim().to_string();
        debug!(chars = text.len(), "Simulated user response received");

        if text.is_empty() {
            return Ok(UserTurn::done("No assistant text returned"));
        }
        if self.is_done_response(&text) {
            return Ok(UserTurn::done("simulated user signaled completion"));
        }
        Ok(UserTurn::Message(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationResponse, Usage};
    use std::sync::Mutex;

    /// Replies with a fixed text and remembers every request.
    struct RecordingProvider {
        reply: String,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl RecordingProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> GenerationRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            Ok(GenerationResponse {
                id: "resp".to_string(),
                model: "test".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(&self.reply),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(&self, _: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            Err(LlmError::RateLimited("slow down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_prompt_includes_goal_and_history() {
        let provider = RecordingProvider::new("hello");
        let mut user = LlmSimulatedUser::new(provider.clone(), "Book a flight");
        let history =
            ConversationHistory::from_turns([(Role::User, "hi"), (Role::Agent, "hello!")]);

        let turn = user.next_message(&history).await.unwrap();
        assert_eq!(turn, UserTurn::message("hello"));

        let request = provider.last_request();
        assert_eq!(request.messages.len(), 2);
        assert!(request.messages[0].content.contains(DEFAULT_DONE_TOKEN));
        let prompt = &request.messages[1].content;
        assert!(prompt.contains("User goal:\nBook a flight"));
        assert!(prompt.contains("User: hi"));
        assert!(prompt.contains("Assistant: hello!"));
        assert!(prompt.ends_with("Next user message:"));
    }

    #[tokio::test]
    async fn test_empty_history_placeholder() {
        let provider = RecordingProvider::new("start");
        let mut user = LlmSimulatedUser::new(provider.clone(), "goal");
        user.next_message(&ConversationHistory::new()).await.unwrap();
        assert!(provider.last_request().messages[1]
            .content
            .contains(NO_PRIOR_MESSAGES));
    }

    #[tokio::test]
    async fn test_done_token_variants() {
        for reply in ["<<DONE>>", "  <<DONE>>  ", "<<DONE>> thanks", "<<DONE>>\nbye"] {
            let mut user = LlmSimulatedUser::new(RecordingProvider::new(reply), "goal");
            let turn = user.next_message(&ConversationHistory::new()).await.unwrap();
            assert!(matches!(turn, UserTurn::Done(_)), "reply {:?}", reply);
        }
    }

    #[tokio::test]
    async fn test_token_prefix_without_separator_is_a_message() {
        let mut user = LlmSimulatedUser::new(RecordingProvider::new("<<DONE>>x"), "goal");
        let turn = user.next_message(&ConversationHistory::new()).await.unwrap();
        assert_eq!(turn, UserTurn::message("<<DONE>>x"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_done() {
        let mut user = LlmSimulatedUser::new(RecordingProvider::new("   "), "goal");
        let turn = user.next_message(&ConversationHistory::new()).await.unwrap();
        assert_eq!(turn, UserTurn::done("No assistant text returned"));
    }

    #[tokio::test]
    async fn test_missing_goal_is_an_error() {
        let mut user = LlmSimulatedUser::new(RecordingProvider::new("hi"), "");
        let result = user.next_message(&ConversationHistory::new()).await;
        assert!(matches!(result, Err(UserError::MissingGoal)));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let mut user = LlmSimulatedUser::new(Arc::new(FailingProvider), "goal");
        let result = user.next_message(&ConversationHistory::new()).await;
        assert!(matches!(result, Err(UserError::Llm(LlmError::RateLimited(_)))));
    }

    #[test]
    fn test_set_instruction_only_fills_empty_goal() {
        let mut user = LlmSimulatedUser::new(RecordingProvider::new("x"), "");
        user.set_instruction("Task instruction as goal");
        assert_eq!(user.goal(), "Task instruction as goal");

        let mut user = LlmSimulatedUser::new(RecordingProvider::new("x"), "Original goal");
        user.set_instruction("Task instruction");
        assert_eq!(user.goal(), "Original goal");
    }

    #[test]
    fn test_custom_done_token() {
        let user = LlmSimulatedUser::new(RecordingProvider::new("x"), "goal")
            .with_done_token("[[END]]")
            .unwrap();
        assert_eq!(user.done_token(), "[[END]]");
        assert!(user.system_prompt().contains("[[END]]"));

        let blank = LlmSimulatedUser::new(RecordingProvider::new("x"), "goal").with_done_token(" ");
        assert!(matches!(blank, Err(UserError::Config(_))));
    }

    #[test]
    fn test_custom_system_prompt_survives_token_change() {
        let user = LlmSimulatedUser::new(RecordingProvider::new("x"), "goal")
            .with_system_prompt("custom")
            .with_done_token("[[END]]")
            .unwrap();
        assert_eq!(user.system_prompt(), "custom");
    }
}
