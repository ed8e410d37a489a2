use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::errors::StorageError;
use crate::domain::entities::{ConnectionStatus, ProviderConnection};

/// Store trait - what the manager needs from connection persistence
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Connections of a user whose status is `active`, with their providers
    async fn active_connections(&self, user_id: &str) -> Result<Vec<ProviderConnection>, StorageError>;

    /// Record that data was pulled through a connection
    async fn record_sync(&self, connection_id: Uuid, at: DateTime<Utc>) -> Result<(), StorageError>;

    /// Replace the encrypted credential blob and expiry after a token refresh
    async fn update_credentials(
        &self,
        connection_id: Uuid,
        encrypted_credentials: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;

    async fn set_status(&self, connection_id: Uuid, status: ConnectionStatus) -> Result<(), StorageError>;
}
