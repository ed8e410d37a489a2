//! Tests for the Claude provider against a mocked Messages API

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::infrastructure::llm::{ClaudeProvider, LLMConfig, LLMError, LLMMessage, LLM};

fn provider_for(server: &MockServer) -> ClaudeProvider {
    ClaudeProvider::new("test-key", Some("claude-test")).with_api_base(format!("{}/v1", server.uri()))
}

#[tokio::test]
async fn test_claude_chat_sends_system_separately() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-test",
            "system": "You are helpful.",
            "messages": [{"role": "user", "content": "What is 2+2?"}],
            "max_tokens": 100
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "4"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let messages = vec![
        LLMMessage::system("You are helpful."),
        LLMMessage::user("What is 2+2?"),
    ];

    let response = provider.chat(messages, None, Some(0.0), Some(100))
        .await
        .expect("Chat request failed");

    assert_eq!(response.content, "4");
    assert_eq!(response.model, "claude-test");
    assert_eq!(response.finish_reason.as_deref(), Some("end_turn"));
    assert_eq!(response.usage.unwrap().total_tokens, Some(13));
}

#[tokio::test]
async fn test_claude_rate_limit_maps_to_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let result = provider.chat(vec![LLMMessage::user("hi")], None, None, None).await;

    assert!(matches!(result, Err(LLMError::RateLimited)));
}

#[tokio::test]
async fn test_claude_api_error_includes_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider.chat(vec![LLMMessage::user("hi")], None, None, None)
        .await
        .unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("401"), "unexpected error: {}", msg);
    assert!(msg.contains("invalid x-api-key"));
}

#[tokio::test]
async fn test_claude_requires_a_non_system_message() {
    let provider = ClaudeProvider::new("test-key", None);
    let result = provider.chat(vec![LLMMessage::system("only system")], None, None, None).await;
    assert!(matches!(result, Err(LLMError::InvalidRequest(_))));
}

#[test]
fn test_from_config_requires_api_key() {
    let config = LLMConfig::default();
    assert!(matches!(ClaudeProvider::from_config(&config), Err(LLMError::MissingApiKey)));

    let config = LLMConfig {
        claude_api_key: Some("sk-ant-test".to_string()),
        ..LLMConfig::default()
    };
    assert!(ClaudeProvider::from_config(&config).is_ok());
}

#[test]
fn test_llm_config_env_overrides() {
    std::env::set_var("CLAUDE_API_KEY", "test-key-123");

    let config = LLMConfig::default().with_env_overrides();

    assert_eq!(config.api_key(), Some("test-key-123"));

    std::env::remove_var("CLAUDE_API_KEY");
}

#[test]
fn test_llm_message_builder() {
    let msg = LLMMessage::user("Hello");
    assert_eq!(msg.role, "user");
    assert_eq!(msg.content, "Hello");

    let system_msg = LLMMessage::system("You are helpful.");
    assert!(system_msg.is_system());
    assert!(!LLMMessage::assistant("ok").is_system());
}
