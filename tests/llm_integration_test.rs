//! Integration tests for LLM client connectivity.
//!
//! Live tests only run with `--features api` and real keys in the environment.

use nebula_sage::llm_client::{LlmClient, LlmConfig, LlmProvider};
use nebula_sage::{
    Classify, ErrorClass, FeedbackCollaborator, FeedbackRequest, LlmErrorKind, RetryPolicy,
    SageConfig, SageOracle, SpeechSynthesizer,
};
use tracing::instrument;

fn live_config(provider: LlmProvider) -> LlmConfig {
    dotenvy::dotenv().ok();
    SageConfig::for_provider(provider)
        .create_llm_config()
        .expect("API key not set")
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_gemini_connectivity() {
    let client = LlmClient::new(live_config(LlmProvider::Gemini));

    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_openai_connectivity() {
    let client = LlmClient::new(live_config(LlmProvider::OpenAI));

    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_anthropic_connectivity() {
    let client = LlmClient::new(live_config(LlmProvider::Anthropic));

    let response = client
        .generate("You are a helpful assistant.", "Say 'Hello, world!' and nothing else.")
        .await
        .expect("Failed to generate");

    assert!(!response.is_empty(), "Response should not be empty");
    eprintln!("Response: {}", response);
}

#[tokio::test]
#[cfg_attr(not(feature = "api"), ignore)]
#[instrument]
async fn test_gemini_sage_speaks() {
    let oracle = SageOracle::new(
        LlmClient::new(live_config(LlmProvider::Gemini)),
        RetryPolicy::default(),
    );

    let text = oracle
        .feedback(&FeedbackRequest::new(30, 60, 1, vec![30]))
        .await
        .expect("Failed to get feedback");
    assert!(!text.trim().is_empty());

    let clip = oracle.synthesize(&text).await.expect("Failed to synthesize");
    assert!(!clip.samples().is_empty());
    eprintln!("Sage: {} ({:?} of audio)", text, clip.duration());
}

#[tokio::test]
async fn test_anthropic_has_no_voice() {
    let client = LlmClient::new(LlmConfig::new(
        LlmProvider::Anthropic,
        "unused".to_string(),
        "claude-3-5-haiku-20241022".to_string(),
        String::new(),
        String::new(),
        50,
    ));

    let err = client.synthesize_speech("hello").await.unwrap_err();
    assert_eq!(err.kind, LlmErrorKind::Unsupported);
    assert_eq!(err.classify(), ErrorClass::Fatal);
}

#[tokio::test]
async fn test_unreachable_host_is_transient() {
    let config = LlmConfig::new(
        LlmProvider::OpenAI,
        "unused".to_string(),
        "gpt-4o-mini".to_string(),
        String::new(),
        String::new(),
        50,
    )
    .with_base_url("http://127.0.0.1:9");
    let oracle = SageOracle::new(LlmClient::new(config), RetryPolicy::no_retry());

    let err = oracle
        .feedback(&FeedbackRequest::new(10, 20, 1, vec![10]))
        .await
        .unwrap_err();
    assert_eq!(err.classify(), ErrorClass::Transient);
}
