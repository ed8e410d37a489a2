//! Anthropic Claude Provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::infrastructure::llm::config::{DEFAULT_API_BASE, DEFAULT_CLAUDE_MODEL};
use crate::infrastructure::llm::{LLMConfig, LLMMessage, LLMResponse, LLMError, LLMResult, LLM, LLMUsage};

/// The Messages API rejects requests without `max_tokens`
const FALLBACK_MAX_TOKENS: u32 = 1024;

/// Claude provider
pub struct ClaudeProvider {
    api_key: String,
    client: Client,
    model: String,
    api_base: String,
}

impl ClaudeProvider {
    pub fn new(api_key: impl Into<String>, model: Option<&str>) -> Self {
        Self {
            api_key: api_key.into(),
            client: Client::new(),
            model: model.unwrap_or(DEFAULT_CLAUDE_MODEL).to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn from_config(config: &LLMConfig) -> LLMResult<Self> {
        let api_key = config.api_key().ok_or(LLMError::MissingApiKey)?;
        Ok(Self::new(api_key, Some(config.model())).with_api_base(config.api_base()))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Get base URL for API
    fn base_url(&self) -> String {
        format!("{}/messages", self.api_base)
    }
}

/// API request structure
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

/// Claude message format
#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

impl From<&LLMMessage> for ClaudeMessage {
    fn from(msg: &LLMMessage) -> Self {
        Self {
            role: msg.role.clone(),
            content: msg.content.clone(),
        }
    }
}

/// API response structure
#[derive(Deserialize, Debug)]
struct ChatResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

/// Content block
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Usage information
#[derive(Deserialize, Debug)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl LLM for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    async fn chat(
        &self,
        messages: Vec<LLMMessage>,
        model: Option<&str>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> LLMResult<LLMResponse> {
        let model = model.unwrap_or(&self.model);

        // System prompts travel in the top-level `system` field
        let system = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let claude_messages: Vec<ClaudeMessage> = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(ClaudeMessage::from)
            .collect();

        if claude_messages.is_empty() {
            return Err(LLMError::InvalidRequest("No user messages".to_string()));
        }

        let request = ChatRequest {
            model: model.to_string(),
            system: (!system.is_empty()).then_some(system),
            messages: claude_messages,
            temperature,
            max_tokens: max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
        };

        let response = self.client
            .post(self.base_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        if response.status() == 429 {
            return Err(LLMError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::ApiError(format!("status: {}, body: {}", status, body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        // Extract text content
        let content = chat_response.content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let usage = chat_response.usage.map(|u| LLMUsage {
            prompt_tokens: Some(u.input_tokens),
            completion_tokens: Some(u.output_tokens),
            total_tokens: Some(u.input_tokens + u.output_tokens),
        });

        Ok(LLMResponse {
            content,
            model: model.to_string(),
            usage,
            finish_reason: chat_response.stop_reason,
        })
    }
}
