//! LLM integration for multiturn-harness.
//!
//! Provides the [`LlmProvider`] seam used by the model-backed simulated user
//! and inner agent, plus a client for LiteLLM/OpenRouter-compatible APIs.
//!
//! ```ignore
//! use multiturn_harness::llm::{GenerationRequest, LiteLlmClient, LlmProvider, Message};
//!
//! let client = LiteLlmClient::from_env()?;
//! let request = GenerationRequest::new("", vec![Message::user("Hello!")]);
//! let response = client.generate(request).await?;
//! ```

pub mod litellm;

pub use litellm::{
    Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message, Usage,
    DEFAULT_MODEL, OPENROUTER_API_BASE,
};
