//! Chat-model inner agent.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AgentError, InnerAgent};
use crate::conversation::ConversationHistory;
use crate::llm::{GenerationRequest, LlmProvider, Message};

/// Inner agent answering with a chat completion over the full history.
pub struct LlmAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: String::new(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn build_request(&self, history: &ConversationHistory) -> GenerationRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(ref prompt) = self.system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.extend(Message::from_history(history));

        let mut request = GenerationRequest::new(self.model.clone(), messages);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

#[async_trait]
impl InnerAgent for LlmAgent {
    fn name(&self) -> &str {
        "llm-agent"
    }

    async fn respond(
        &self,
        _prompt: &str,
        history: &ConversationHistory,
    ) -> Result<String, AgentError> {
        let response = self.provider.generate(self.build_request(history)).await?;
        response
            .first_content()
            .map(|s| s.trim().to_string())
            .ok_or(AgentError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationResponse, Usage};
    use std::sync::Mutex;

    struct CannedProvider {
        replies: Vec<String>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            self.seen.lock().unwrap().push(request);
            Ok(GenerationResponse {
                id: "id".to_string(),
                model: "m".to_string(),
                choices: self
                    .replies
                    .iter()
                    .enumerate()
                    .map(|(i, r)| Choice {
                        index: i as u32,
                        message: Message::assistant(r),
                        finish_reason: "stop".to_string(),
                    })
                    .collect(),
                usage: Usage::default(),
            })
        }
    }

    fn provider(replies: &[&str]) -> Arc<CannedProvider> {
        Arc::new(CannedProvider {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_sends_system_prompt_and_history() {
        let provider = provider(&[" sure \n"]);
        let agent = LlmAgent::new(provider.clone())
            .with_model("gpt-4")
            .with_system_prompt("You are terse.")
            .with_max_tokens(256);
        let history = ConversationHistory::from_turns([
            (Role::User, "hi"),
            (Role::Agent, "hello"),
            (Role::User, "help me"),
        ]);

        let reply = agent.respond("help me", &history).await.unwrap();
        assert_eq!(reply, "sure");

        let seen = provider.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.max_tokens, Some(256));
        let roles: Vec<&str> = request.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_response() {
        let agent = LlmAgent::new(provider(&[]));
        let history = ConversationHistory::from_turns([(Role::User, "hi")]);
        let err = agent.respond("hi", &history).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }
}
