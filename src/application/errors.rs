//! Application layer errors

use thiserror::Error;

use crate::infrastructure::llm::LLMError;

/// Top-level errors surfaced by services and the CLI
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Credential error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised at the plugin boundary
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Method '{method}' not supported by {plugin}")]
    UnsupportedMethod { plugin: String, method: String },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Unknown plugin class: {0}")]
    UnknownPluginClass(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl PluginError {
    pub fn unsupported(plugin: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            plugin: plugin.into(),
            method: method.into(),
        }
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Credential encryption errors
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid encryption key")]
    InvalidKey,

    #[error("Failed to decrypt credentials")]
    Decrypt,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
