//! SQLite-backed connection store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::application::errors::StorageError;
use crate::domain::entities::{ConnectionStatus, ProviderConnection};
use crate::domain::traits::ConnectionStore;
use crate::infrastructure::database::Database;

/// Shared handle to the database
pub type SharedDatabase = Arc<Mutex<Database>>;

pub fn share(db: Database) -> SharedDatabase {
    Arc::new(Mutex::new(db))
}

/// Lock the shared database
pub fn lock(db: &SharedDatabase) -> Result<MutexGuard<'_, Database>, StorageError> {
    db.lock()
        .map_err(|_| StorageError::Internal("Lock poisoned".to_string()))
}

/// Connection store over the shared SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    db: SharedDatabase,
}

impl SqliteStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConnectionStore for SqliteStore {
    async fn active_connections(&self, user_id: &str) -> Result<Vec<ProviderConnection>, StorageError> {
        let db = lock(&self.db)?;
        db.list_connections(user_id, Some(ConnectionStatus::Active))
    }

    async fn record_sync(&self, connection_id: Uuid, at: DateTime<Utc>) -> Result<(), StorageError> {
        let db = lock(&self.db)?;
        if db.mark_synced(connection_id, at)? {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!("connection {}", connection_id)))
        }
    }

    async fn update_credentials(
        &self,
        connection_id: Uuid,
        encrypted_credentials: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let db = lock(&self.db)?;
        if db.update_connection_credentials(connection_id, encrypted_credentials, expires_at)? {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!("connection {}", connection_id)))
        }
    }

    async fn set_status(&self, connection_id: Uuid, status: ConnectionStatus) -> Result<(), StorageError> {
        let db = lock(&self.db)?;
        if db.update_connection_status(connection_id, status)? {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!("connection {}", connection_id)))
        }
    }
}
