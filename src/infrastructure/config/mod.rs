//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;
use crate::infrastructure::crypto::SECRET_KEY_ENV;
use crate::infrastructure::llm::LLMConfig;

/// Service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub llm: LLMConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecurityConfig {
    /// Fernet key used to encrypt connection credentials
    pub secret_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:8080".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("mcps.db"),
            },
            security: SecurityConfig::default(),
            llm: LLMConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;

        Ok(config.with_env_overrides())
    }

    pub fn load_env() -> Self {
        Config::default().with_env_overrides()
    }

    /// Environment variables win over file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(SECRET_KEY_ENV) {
            self.security.secret_key = Some(key);
        }

        if let Ok(path) = std::env::var("MCPS_DATABASE") {
            self.database.path = PathBuf::from(path);
        }

        if let Ok(bind) = std::env::var("MCPS_BIND") {
            self.server.bind = bind;
        }

        self.llm = self.llm.with_env_overrides();
        self
    }
}
