use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::application::errors::CryptoError;
use crate::domain::entities::Provider;
use crate::infrastructure::crypto::CredentialCipher;

/// Default interval between syncs, in seconds
pub const DEFAULT_SYNC_FREQUENCY: i64 = 3600;

/// Lifecycle state of a user's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Expired,
    Error,
    Disabled,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Active => "active",
            ConnectionStatus::Expired => "expired",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Disabled => "disabled",
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ConnectionStatus::Active),
            "expired" => Ok(ConnectionStatus::Expired),
            "error" => Ok(ConnectionStatus::Error),
            "disabled" => Ok(ConnectionStatus::Disabled),
            other => Err(format!("unknown connection status '{}'", other)),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's link to a provider, holding encrypted credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub user_id: String,
    pub provider_id: i64,
    pub status: ConnectionStatus,
    /// Fernet token of the credential JSON; empty when none were stored
    #[serde(skip_serializing)]
    pub encrypted_credentials: String,
    pub display_name: String,
    pub config_data: serde_json::Value,
    pub last_sync: Option<DateTime<Utc>>,
    /// Seconds between syncs
    pub sync_frequency: i64,
    pub connected_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn new(user_id: impl Into<String>, provider_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            provider_id,
            status: ConnectionStatus::Active,
            encrypted_credentials: String::new(),
            display_name: String::new(),
            config_data: serde_json::Value::Object(Default::default()),
            last_sync: None,
            sync_frequency: DEFAULT_SYNC_FREQUENCY,
            connected_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config_data = config;
        self
    }

    pub fn with_sync_frequency(mut self, seconds: i64) -> Self {
        self.sync_frequency = seconds;
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Decrypt the stored credentials
    pub fn credentials(&self, cipher: &CredentialCipher) -> Result<serde_json::Value, CryptoError> {
        if self.encrypted_credentials.is_empty() {
            return Ok(serde_json::Value::Object(Default::default()));
        }
        cipher.decrypt_json(&self.encrypted_credentials)
    }

    /// Encrypt and store credentials
    pub fn set_credentials(
        &mut self,
        cipher: &CredentialCipher,
        value: &serde_json::Value,
    ) -> Result<(), CryptoError> {
        self.encrypted_credentials = cipher.encrypt_json(value)?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }

    pub fn is_sync_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_sync {
            None => true,
            Some(last) => last + Duration::seconds(self.sync_frequency) <= now,
        }
    }
}

/// A connection joined with its provider and category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderConnection {
    pub connection: Connection,
    pub provider: Provider,
}

impl ProviderConnection {
    pub fn slug(&self) -> &str {
        &self.provider.slug
    }
}
