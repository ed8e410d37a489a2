//! Plugin trait definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::application::errors::PluginError;

pub type PluginResult<T> = Result<T, PluginError>;

/// Self-describing entry of a plugin's method catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub description: String,
    /// Parameter name to human description
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), description.into());
        self
    }
}

/// Everything a plugin is constructed from
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Decrypted connection credentials
    pub credentials: Value,
    /// Connection config (`config_data`)
    pub config: Value,
    pub user_id: String,
}

impl PluginContext {
    pub fn new(credentials: Value, config: Value, user_id: impl Into<String>) -> Self {
        Self {
            credentials,
            config,
            user_id: user_id.into(),
        }
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

/// Credentials produced by a successful token refresh, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedCredentials {
    pub credentials: Value,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Core plugin trait that every provider integration implements
#[async_trait]
pub trait McpPlugin: Send + Sync {
    /// Unique identifier for the plugin
    fn name(&self) -> &str;

    /// User the plugin acts for
    fn user_id(&self) -> &str;

    /// Check the credentials against the vendor. Failures are logged, never raised.
    async fn authenticate(&self) -> bool;

    /// Methods callable through `execute`
    async fn list_methods(&self) -> Vec<MethodSpec>;

    /// Execute a method by name
    async fn execute(&self, method: &str, params: &Value) -> PluginResult<Value>;

    /// Refresh the access token, if the plugin has one
    async fn refresh_token(&self) -> bool {
        true
    }

    /// Credentials from the last successful `refresh_token`, if it changed any
    async fn refreshed_credentials(&self) -> Option<RefreshedCredentials> {
        None
    }

    fn cache_key(&self, method: &str, params: &Value) -> String {
        cache_key(self.user_id(), method, params)
    }
}

/// Plugins exposing analytics reports
#[async_trait]
pub trait AnalyticsPlugin: McpPlugin {
    async fn get_metrics(
        &self,
        property_id: &str,
        start_date: &str,
        end_date: &str,
        metrics: &[String],
        dimensions: &[String],
        limit: Option<u64>,
    ) -> PluginResult<Value>;

    async fn get_real_time_data(&self, property_id: &str) -> PluginResult<Value>;
}

/// Plugins exposing advertising accounts
#[async_trait]
pub trait AdvertisingPlugin: McpPlugin {
    async fn get_campaigns(&self, status: &str) -> PluginResult<Value>;

    async fn get_campaigns_performance(&self, campaign_ids: &[String]) -> PluginResult<Value>;

    async fn get_account_performance(&self) -> PluginResult<Value>;
}

/// Stable digest of (user, method, params) with object keys sorted at every depth
pub fn cache_key(user_id: &str, method: &str, params: &Value) -> String {
    let input = Value::Array(vec![
        Value::String(user_id.to_string()),
        Value::String(method.to_string()),
        params.clone(),
    ]);

    let mut hasher = Sha256::new();
    hasher.update(canonical(&input).as_bytes());
    hex::encode(hasher.finalize())
}

/// JSON text with object keys sorted at every depth
fn canonical(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let fields = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical(v)))
                .collect::<Vec<_>>();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items = items.iter().map(canonical).collect::<Vec<_>>();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

/// Per-call outcome attached to a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub plugin: String,
    pub method: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResult {
    pub fn success(plugin: impl Into<String>, method: impl Into<String>, data: Value) -> Self {
        Self {
            plugin: plugin.into(),
            method: method.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(plugin: impl Into<String>, method: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            method: method.into(),
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
