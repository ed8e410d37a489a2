//! Linking users to providers

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::errors::AppError;
use crate::domain::entities::{Connection, ConnectionStatus, ProviderConnection};
use crate::infrastructure::crypto::CredentialCipher;
use crate::infrastructure::storage::{lock, SharedDatabase};

/// What a user supplies when linking a provider
#[derive(Debug, Clone, Default)]
pub struct LinkRequest {
    pub display_name: String,
    pub credentials: Value,
    pub config: Value,
    pub sync_frequency: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct ConnectionService {
    db: SharedDatabase,
    cipher: Arc<CredentialCipher>,
}

impl ConnectionService {
    pub fn new(db: SharedDatabase, cipher: Arc<CredentialCipher>) -> Self {
        Self { db, cipher }
    }

    /// Create an active connection with encrypted credentials
    pub fn link(&self, user_id: &str, provider_slug: &str, request: LinkRequest) -> Result<Connection, AppError> {
        if user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("user id must not be empty".to_string()));
        }
        if !request.credentials.is_object() {
            return Err(AppError::InvalidInput("credentials must be a JSON object".to_string()));
        }

        let db = lock(&self.db)?;
        let provider = db
            .get_provider_by_slug(provider_slug)?
            .ok_or_else(|| AppError::NotFound(format!("provider '{}'", provider_slug)))?;

        let config = match request.config {
            Value::Null => Value::Object(Default::default()),
            Value::Object(map) => Value::Object(map),
            _ => return Err(AppError::InvalidInput("config must be a JSON object".to_string())),
        };

        let mut connection = Connection::new(user_id, provider.id)
            .with_display_name(request.display_name)
            .with_config(config)
            .with_expires_at(request.expires_at);
        if let Some(seconds) = request.sync_frequency {
            if seconds <= 0 {
                return Err(AppError::InvalidInput("sync frequency must be positive".to_string()));
            }
            connection = connection.with_sync_frequency(seconds);
        }
        connection.set_credentials(&self.cipher, &request.credentials)?;

        db.insert_connection(&connection)?;
        tracing::info!("User {} connected {} ({})", user_id, provider.slug, connection.id);
        Ok(connection)
    }

    pub fn get(&self, id: Uuid) -> Result<ProviderConnection, AppError> {
        lock(&self.db)?
            .get_connection(id)?
            .ok_or_else(|| AppError::NotFound(format!("connection {}", id)))
    }

    pub fn list(&self, user_id: &str, status: Option<ConnectionStatus>) -> Result<Vec<ProviderConnection>, AppError> {
        Ok(lock(&self.db)?.list_connections(user_id, status)?)
    }

    /// Reactivating fails with a conflict when another active connection holds the same slot
    pub fn set_status(&self, id: Uuid, status: ConnectionStatus) -> Result<(), AppError> {
        if !lock(&self.db)?.update_connection_status(id, status)? {
            return Err(AppError::NotFound(format!("connection {}", id)));
        }
        tracing::info!("Connection {} is now {}", id, status);
        Ok(())
    }

    /// Replace the credentials of a connection, typically one marked expired, and reactivate it
    pub fn reauthorize(
        &self,
        id: Uuid,
        credentials: &Value,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ProviderConnection, AppError> {
        if !credentials.is_object() {
            return Err(AppError::InvalidInput("credentials must be a JSON object".to_string()));
        }

        let encrypted = self.cipher.encrypt_json(credentials)?;
        {
            let db = lock(&self.db)?;
            if !db.update_connection_credentials(id, &encrypted, expires_at)? {
                return Err(AppError::NotFound(format!("connection {}", id)));
            }
            db.update_connection_status(id, ConnectionStatus::Active)?;
        }

        let pc = self.get(id)?;
        tracing::info!("Connection {} ({}) reauthorized", id, pc.slug());
        Ok(pc)
    }

    pub fn disconnect(&self, id: Uuid) -> Result<(), AppError> {
        if !lock(&self.db)?.delete_connection(id)? {
            return Err(AppError::NotFound(format!("connection {}", id)));
        }
        tracing::info!("Connection {} removed", id);
        Ok(())
    }
}
