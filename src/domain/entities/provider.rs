use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grouping for providers (analytics, search, advertising, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub icon: String,
    pub description: Option<String>,
    pub order: i32,
}

/// How a provider is integrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    RestApi,
    SoapApi,
    Oauth2,
    ApiKey,
    Webhook,
    Custom,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::RestApi => "rest_api",
            IntegrationType::SoapApi => "soap_api",
            IntegrationType::Oauth2 => "oauth2",
            IntegrationType::ApiKey => "api_key",
            IntegrationType::Webhook => "webhook",
            IntegrationType::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IntegrationType::RestApi => "REST API",
            IntegrationType::SoapApi => "SOAP API",
            IntegrationType::Oauth2 => "OAuth 2.0",
            IntegrationType::ApiKey => "API Key",
            IntegrationType::Webhook => "Webhook",
            IntegrationType::Custom => "Custom Integration",
        }
    }
}

impl FromStr for IntegrationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rest_api" => Ok(IntegrationType::RestApi),
            "soap_api" => Ok(IntegrationType::SoapApi),
            "oauth2" => Ok(IntegrationType::Oauth2),
            "api_key" => Ok(IntegrationType::ApiKey),
            "webhook" => Ok(IntegrationType::Webhook),
            "custom" => Ok(IntegrationType::Custom),
            other => Err(format!("unknown integration type '{}'", other)),
        }
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A third-party service users can connect to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub category: Category,
    pub description: Option<String>,
    pub icon_url: String,
    pub documentation_url: String,
    pub integration_type: IntegrationType,
    /// Key into the plugin registry
    pub plugin_class: String,
    pub required_scopes: Vec<String>,
    pub webhook_events: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
