//! Integration tests for the LLM-backed actors.
//!
//! These tests make real API calls to OpenRouter.
//! Run with: OPENROUTER_API_KEY=your_key cargo test --test llm_integration -- --ignored

use std::sync::Arc;

use multiturn_harness::agent::{InnerAgent, LlmAgent};
use multiturn_harness::conversation::{ConversationHistory, ConversationOrchestrator, Role};
use multiturn_harness::llm::{
    GenerationRequest, LiteLlmClient, LlmProvider, Message, DEFAULT_MODEL,
};
use multiturn_harness::simulated_user::LlmSimulatedUser;
use multiturn_harness::trajectory::TerminationReason;

fn get_test_api_key() -> String {
    std::env::var("OPENROUTER_API_KEY")
        .expect("OPENROUTER_API_KEY environment variable must be set for integration tests")
}

fn create_test_client() -> Arc<LiteLlmClient> {
    Arc::new(LiteLlmClient::new_with_defaults(
        get_test_api_key(),
        DEFAULT_MODEL,
    ))
}

#[tokio::test]
#[ignore] // Run with: cargo test --test llm_integration -- --ignored
async fn test_simple_generation() {
    let client = create_test_client();

    let request = GenerationRequest::new(
        "",
        vec![
            Message::system("You are a helpful assistant. Reply concisely."),
            Message::user("What is 2 + 2? Reply with just the number."),
        ],
    )
    .with_max_tokens(10)
    .with_temperature(0.0);

    let response = client.generate(request).await;
    assert!(response.is_ok(), "Generation failed: {:?}", response.err());

    let response = response.expect("Should have response");
    let content = response.first_content().expect("Should have content");
    assert!(content.contains('4'), "Expected '4' in response: {content}");
}

#[tokio::test]
#[ignore]
async fn test_llm_agent_answers_history() {
    let agent = LlmAgent::new(create_test_client())
        .with_system_prompt("Reply with a single word.")
        .with_max_tokens(20);
    let history = ConversationHistory::from_turns([(Role::User, "Name a primary colour.")]);

    let reply = agent
        .respond("Name a primary colour.", &history)
        .await
        .expect("agent should reply");
    assert!(!reply.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_model_driven_conversation() {
    let client = create_test_client();
    let mut user = LlmSimulatedUser::new(
        client.clone(),
        "Ask the assistant for a two-line poem about rust, then finish.",
    );
    let agent = LlmAgent::new(client).with_max_tokens(200);

    let trajectory = ConversationOrchestrator::with_max_turns(4)
        .run(&mut user, &agent)
        .await;

    assert!(
        !trajectory.termination_reason().is_failure(),
        "Unexpected failure: {}",
        trajectory.termination_reason()
    );
    assert!(matches!(
        trajectory.termination_reason(),
        TerminationReason::UserDone { .. } | TerminationReason::MaxTurnsReached { .. }
    ));
    assert!(!trajectory.messages().is_empty());
}
