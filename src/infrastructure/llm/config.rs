//! LLM Configuration

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";

/// LLM Configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LLMConfig {
    pub claude_api_key: Option<String>,
    pub claude_model: Option<String>,
    /// Messages API base, without the trailing `/messages`
    pub api_base: Option<String>,

    /// Default settings
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            claude_api_key: None,
            claude_model: Some(DEFAULT_CLAUDE_MODEL.to_string()),
            api_base: None,
            temperature: 0.7,
            max_tokens: Some(1024),
            system_prompt: Some(
                "You are a marketing data assistant. Answer using the user's connected data sources.".to_string(),
            ),
        }
    }
}

impl LLMConfig {
    /// Environment variables win over file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("CLAUDE_API_KEY") {
            self.claude_api_key = Some(key);
        } else if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if self.claude_api_key.is_none() {
                self.claude_api_key = Some(key);
            }
        }

        if let Ok(prompt) = std::env::var("LLM_SYSTEM_PROMPT") {
            self.system_prompt = Some(prompt);
        }

        if let Ok(temp) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                self.temperature = t;
            }
        }

        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.claude_api_key.as_deref()
    }

    pub fn model(&self) -> &str {
        self.claude_model.as_deref().unwrap_or(DEFAULT_CLAUDE_MODEL)
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }
}
