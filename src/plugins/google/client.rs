//! Authorized REST client shared by the Google plugins

use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::application::errors::PluginError;
use crate::plugins::trait_def::{PluginContext, PluginResult, RefreshedCredentials};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth2 user credentials as stored on the connection
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCredentials {
    #[serde(alias = "access_token")]
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct GoogleClient {
    plugin: String,
    http: Client,
    credentials: GoogleCredentials,
    /// Credentials as stored on the connection
    stored: Value,
    access_token: RwLock<String>,
    refreshed: RwLock<Option<RefreshedCredentials>>,
}

impl GoogleClient {
    pub fn from_context(plugin: &str, ctx: &PluginContext) -> PluginResult<Self> {
        let credentials: GoogleCredentials = serde_json::from_value(ctx.credentials.clone())
            .map_err(|e| PluginError::Credentials(format!("{}: {}", plugin, e)))?;

        Ok(Self {
            plugin: plugin.to_string(),
            http: Client::new(),
            access_token: RwLock::new(credentials.token.clone()),
            refreshed: RwLock::new(None),
            stored: ctx.credentials.clone(),
            credentials,
        })
    }

    /// Issue a GET and return the JSON body
    pub async fn get_json(&self, url: &str) -> PluginResult<Value> {
        let request = self.http.get(url);
        self.send(request).await
    }

    /// Issue a POST with a JSON body and optional extra headers
    pub async fn post_json(&self, url: &str, body: &Value, headers: &[(&str, &str)]) -> PluginResult<Value> {
        let mut request = self.http.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request).await
    }

    /// GET that only reports success; errors are logged
    pub async fn probe(&self, url: &str) -> bool {
        match self.get_json(url).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("{} authentication failed: {}", self.plugin, e);
                false
            }
        }
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh(&self) -> bool {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            self.credentials.refresh_token.as_deref(),
            self.credentials.client_id.as_deref(),
            self.credentials.client_secret.as_deref(),
        ) else {
            tracing::warn!("{}: cannot refresh token without refresh_token, client_id and client_secret", self.plugin);
            return false;
        };

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let response = match self.http.post(&self.credentials.token_uri).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("{}: token refresh request failed: {}", self.plugin, e);
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::error!("{}: token refresh rejected with status {}", self.plugin, response.status());
            return false;
        }

        match response.json::<TokenResponse>().await {
            Ok(token) => {
                let mut stored = self.stored.clone();
                if let Some(fields) = stored.as_object_mut() {
                    fields.remove("access_token");
                    fields.insert("token".to_string(), Value::String(token.access_token.clone()));
                }
                *self.refreshed.write().await = Some(RefreshedCredentials {
                    credentials: stored,
                    expires_at: token.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
                });
                *self.access_token.write().await = token.access_token;
                tracing::info!("{}: access token refreshed", self.plugin);
                true
            }
            Err(e) => {
                tracing::error!("{}: invalid token response: {}", self.plugin, e);
                false
            }
        }
    }

    /// Credentials to store after a successful `refresh`
    pub async fn refreshed(&self) -> Option<RefreshedCredentials> {
        self.refreshed.read().await.clone()
    }

    async fn send(&self, request: RequestBuilder) -> PluginResult<Value> {
        let token = self.access_token.read().await.clone();
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PluginError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(PluginError::Authentication(format!("status: {}, body: {}", status, body)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PluginError::Api(format!("status: {}, body: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| PluginError::Parse(e.to_string()))
    }
}

/// Base URL from the connection config (`api_base`) or the vendor default
pub fn api_base(ctx: &PluginContext, default: &str) -> String {
    ctx.config_str("api_base")
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Turn a GA4-style report (`dimensionHeaders`/`metricHeaders`/`rows`) into flat row objects
pub fn flatten_report(report: &Value) -> Value {
    let headers = |key: &str| -> Vec<String> {
        report
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|h| h.get("name").and_then(Value::as_str).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };
    let dimension_names = headers("dimensionHeaders");
    let metric_names = headers("metricHeaders");

    let values = |row: &Value, key: &str| -> Vec<Value> {
        row.get(key)
            .and_then(Value::as_array)
            .map(|cells| cells.iter().map(|c| c.get("value").cloned().unwrap_or(Value::Null)).collect())
            .unwrap_or_default()
    };

    let rows: Vec<Value> = report
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    let mut flat = serde_json::Map::new();
                    for (name, value) in dimension_names.iter().zip(values(row, "dimensionValues")) {
                        flat.insert(name.clone(), value);
                    }
                    for (name, value) in metric_names.iter().zip(values(row, "metricValues")) {
                        flat.insert(name.clone(), value);
                    }
                    Value::Object(flat)
                })
                .collect()
        })
        .unwrap_or_default();

    serde_json::json!({
        "row_count": report.get("rowCount").cloned().unwrap_or(Value::from(rows.len())),
        "rows": rows,
    })
}
