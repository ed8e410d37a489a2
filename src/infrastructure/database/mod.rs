use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection as SqliteConnection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::application::errors::StorageError;
use crate::domain::entities::{
    Category, Connection, ConnectionStatus, IntegrationType, Provider, ProviderConnection,
};

/// Category as written by administrators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
}

/// Provider as written by administrators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewProvider {
    pub name: String,
    pub slug: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub documentation_url: String,
    pub integration_type: IntegrationType,
    pub plugin_class: String,
    #[serde(default)]
    pub required_scopes: Vec<String>,
    #[serde(default)]
    pub webhook_events: Vec<String>,
}

const PROVIDER_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.icon_url, p.documentation_url,
    p.integration_type, p.plugin_class, p.required_scopes, p.webhook_events, p.created_at, p.updated_at,
    c.id, c.name, c.slug, c.icon, c.description, c.display_order";

const CONNECTION_COLUMNS: &str = "uc.id, uc.user_id, uc.provider_id, uc.status, uc.encrypted_credentials,
    uc.display_name, uc.config_data, uc.last_sync, uc.sync_frequency, uc.connected_at, uc.expires_at";

/// Number of columns in `CONNECTION_COLUMNS`
const CONNECTION_WIDTH: usize = 11;

pub struct Database {
    conn: SqliteConnection,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = SqliteConnection::open(path)?;
        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = SqliteConnection::open_in_memory()?;
        let db = Self { conn };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS mcp_categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                slug TEXT UNIQUE NOT NULL,
                icon TEXT NOT NULL DEFAULT '',
                description TEXT,
                display_order INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS mcp_providers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                slug TEXT UNIQUE NOT NULL,
                category_id INTEGER NOT NULL,
                description TEXT,
                icon_url TEXT NOT NULL DEFAULT '',
                documentation_url TEXT NOT NULL DEFAULT '',
                integration_type TEXT NOT NULL,
                plugin_class TEXT NOT NULL,
                required_scopes TEXT NOT NULL DEFAULT '[]',
                webhook_events TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (category_id) REFERENCES mcp_categories(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS user_mcp_connections (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                provider_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                encrypted_credentials TEXT NOT NULL DEFAULT '',
                display_name TEXT NOT NULL DEFAULT '',
                config_data TEXT NOT NULL DEFAULT '{}',
                last_sync TEXT,
                sync_frequency INTEGER NOT NULL DEFAULT 3600,
                connected_at TEXT NOT NULL,
                expires_at TEXT,
                FOREIGN KEY (provider_id) REFERENCES mcp_providers(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // At most one active connection per (user, provider, display name)
        self.conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_connections_active_unique
             ON user_mcp_connections(user_id, provider_id, display_name)
             WHERE status = 'active'",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_connections_user ON user_mcp_connections(user_id)",
            [],
        )?;

        Ok(())
    }

    // Catalog

    pub fn upsert_category(&self, category: &NewCategory) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO mcp_categories (name, slug, icon, description, display_order)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(slug) DO UPDATE SET
                name = excluded.name,
                icon = excluded.icon,
                description = excluded.description,
                display_order = excluded.display_order",
            params![category.name, category.slug, category.icon, category.description, category.order],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM mcp_categories WHERE slug = ?1",
            [&category.slug],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, slug, icon, description, display_order
             FROM mcp_categories ORDER BY display_order, name",
        )?;

        let rows = stmt.query_map([], |row| category_from_row(row, 0))?;

        let mut categories = Vec::new();
        for category in rows {
            categories.push(category?);
        }
        Ok(categories)
    }

    pub fn upsert_provider(&self, provider: &NewProvider) -> Result<i64, StorageError> {
        let category_id: i64 = self.conn
            .query_row(
                "SELECT id FROM mcp_categories WHERE slug = ?1",
                [&provider.category],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("category '{}'", provider.category)))?;

        let scopes = to_json_text(&provider.required_scopes)?;
        let events = to_json_text(&provider.webhook_events)?;
        let now = Utc::now();

        self.conn.execute(
            "INSERT INTO mcp_providers (name, slug, category_id, description, icon_url, documentation_url,
                integration_type, plugin_class, required_scopes, webhook_events, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             ON CONFLICT(slug) DO UPDATE SET
                name = excluded.name,
                category_id = excluded.category_id,
                description = excluded.description,
                icon_url = excluded.icon_url,
                documentation_url = excluded.documentation_url,
                integration_type = excluded.integration_type,
                plugin_class = excluded.plugin_class,
                required_scopes = excluded.required_scopes,
                webhook_events = excluded.webhook_events,
                updated_at = excluded.updated_at",
            params![
                provider.name,
                provider.slug,
                category_id,
                provider.description,
                provider.icon_url,
                provider.documentation_url,
                provider.integration_type.as_str(),
                provider.plugin_class,
                scopes,
                events,
                now,
            ],
        )
        .map_err(|e| conflict_or(e, || format!("provider name '{}' already in use", provider.name)))?;

        let id = self.conn.query_row(
            "SELECT id FROM mcp_providers WHERE slug = ?1",
            [&provider.slug],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn get_provider_by_slug(&self, slug: &str) -> Result<Option<Provider>, StorageError> {
        let sql = format!(
            "SELECT {} FROM mcp_providers p JOIN mcp_categories c ON c.id = p.category_id WHERE p.slug = ?1",
            PROVIDER_COLUMNS
        );
        let provider = self.conn
            .query_row(&sql, [slug], |row| provider_from_row(row, 0))
            .optional()?;
        Ok(provider)
    }

    /// All providers, optionally restricted to one category slug
    pub fn list_providers(&self, category: Option<&str>) -> Result<Vec<Provider>, StorageError> {
        let sql = format!(
            "SELECT {} FROM mcp_providers p JOIN mcp_categories c ON c.id = p.category_id
             WHERE (?1 IS NULL OR c.slug = ?1)
             ORDER BY c.display_order, p.name",
            PROVIDER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([category], |row| provider_from_row(row, 0))?;

        let mut providers = Vec::new();
        for provider in rows {
            providers.push(provider?);
        }
        Ok(providers)
    }

    // Connections

    pub fn insert_connection(&self, connection: &Connection) -> Result<(), StorageError> {
        let config = to_json_text(&connection.config_data)?;

        self.conn.execute(
            "INSERT INTO user_mcp_connections (id, user_id, provider_id, status, encrypted_credentials,
                display_name, config_data, last_sync, sync_frequency, connected_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                connection.id.to_string(),
                connection.user_id,
                connection.provider_id,
                connection.status.as_str(),
                connection.encrypted_credentials,
                connection.display_name,
                config,
                connection.last_sync,
                connection.sync_frequency,
                connection.connected_at,
                connection.expires_at,
            ],
        )
        .map_err(|e| {
            conflict_or(e, || {
                format!(
                    "user '{}' already has an active connection named '{}' for this provider",
                    connection.user_id, connection.display_name
                )
            })
        })?;
        Ok(())
    }

    pub fn get_connection(&self, id: Uuid) -> Result<Option<ProviderConnection>, StorageError> {
        let sql = format!(
            "SELECT {}, {} FROM user_mcp_connections uc
             JOIN mcp_providers p ON p.id = uc.provider_id
             JOIN mcp_categories c ON c.id = p.category_id
             WHERE uc.id = ?1",
            CONNECTION_COLUMNS, PROVIDER_COLUMNS
        );
        let connection = self.conn
            .query_row(&sql, [id.to_string()], provider_connection_from_row)
            .optional()?;
        Ok(connection)
    }

    /// Connections of a user, optionally filtered by status
    pub fn list_connections(
        &self,
        user_id: &str,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<ProviderConnection>, StorageError> {
        let sql = format!(
            "SELECT {}, {} FROM user_mcp_connections uc
             JOIN mcp_providers p ON p.id = uc.provider_id
             JOIN mcp_categories c ON c.id = p.category_id
             WHERE uc.user_id = ?1 AND (?2 IS NULL OR uc.status = ?2)
             ORDER BY uc.connected_at",
            CONNECTION_COLUMNS, PROVIDER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![user_id, status.map(|s| s.as_str())],
            provider_connection_from_row,
        )?;

        let mut connections = Vec::new();
        for connection in rows {
            connections.push(connection?);
        }
        Ok(connections)
    }

    pub fn update_connection_status(&self, id: Uuid, status: ConnectionStatus) -> Result<bool, StorageError> {
        let rows = self.conn
            .execute(
                "UPDATE user_mcp_connections SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )
            .map_err(|e| conflict_or(e, || format!("another active connection already matches {}", id)))?;
        Ok(rows > 0)
    }

    /// Replace credentials after a token refresh
    pub fn update_connection_credentials(
        &self,
        id: Uuid,
        encrypted_credentials: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StorageError> {
        let rows = self.conn.execute(
            "UPDATE user_mcp_connections SET encrypted_credentials = ?1, expires_at = ?2 WHERE id = ?3",
            params![encrypted_credentials, expires_at, id.to_string()],
        )?;
        Ok(rows > 0)
    }

    pub fn mark_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let rows = self.conn.execute(
            "UPDATE user_mcp_connections SET last_sync = ?1 WHERE id = ?2",
            params![at, id.to_string()],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_connection(&self, id: Uuid) -> Result<bool, StorageError> {
        let rows = self.conn.execute(
            "DELETE FROM user_mcp_connections WHERE id = ?1",
            [id.to_string()],
        )?;
        Ok(rows > 0)
    }
}

fn to_json_text<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Unique-index violations become `Conflict`; other constraint failures stay `Sqlite`
fn conflict_or(err: rusqlite::Error, message: impl FnOnce() -> String) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::Conflict(message())
        }
        _ => StorageError::Sqlite(err),
    }
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn category_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        slug: row.get(offset + 2)?,
        icon: row.get(offset + 3)?,
        description: row.get(offset + 4)?,
        order: row.get(offset + 5)?,
    })
}

fn provider_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Provider> {
    let integration: String = row.get(offset + 6)?;
    let integration_type = integration
        .parse::<IntegrationType>()
        .map_err(|e| conversion_error(offset + 6, e))?;

    Ok(Provider {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        slug: row.get(offset + 2)?,
        description: row.get(offset + 3)?,
        icon_url: row.get(offset + 4)?,
        documentation_url: row.get(offset + 5)?,
        integration_type,
        plugin_class: row.get(offset + 7)?,
        required_scopes: json_column(row, offset + 8)?,
        webhook_events: json_column(row, offset + 9)?,
        created_at: row.get(offset + 10)?,
        updated_at: row.get(offset + 11)?,
        category: category_from_row(row, offset + 12)?,
    })
}

fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<Connection> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| conversion_error(0, e))?;
    let status: String = row.get(3)?;
    let status = status
        .parse::<ConnectionStatus>()
        .map_err(|e| conversion_error(3, e))?;

    Ok(Connection {
        id,
        user_id: row.get(1)?,
        provider_id: row.get(2)?,
        status,
        encrypted_credentials: row.get(4)?,
        display_name: row.get(5)?,
        config_data: json_column(row, 6)?,
        last_sync: row.get(7)?,
        sync_frequency: row.get(8)?,
        connected_at: row.get(9)?,
        expires_at: row.get(10)?,
    })
}

fn provider_connection_from_row(row: &Row<'_>) -> rusqlite::Result<ProviderConnection> {
    Ok(ProviderConnection {
        connection: connection_from_row(row)?,
        provider: provider_from_row(row, CONNECTION_WIDTH)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        db.upsert_category(&NewCategory {
            name: "Analytics".to_string(),
            slug: "analytics".to_string(),
            icon: "chart".to_string(),
            description: None,
            order: 1,
        })
        .unwrap();
        let provider_id = db
            .upsert_provider(&NewProvider {
                name: "Google Analytics 4".to_string(),
                slug: "google-analytics".to_string(),
                category: "analytics".to_string(),
                description: Some("GA4 reports".to_string()),
                icon_url: String::new(),
                documentation_url: String::new(),
                integration_type: IntegrationType::Oauth2,
                plugin_class: "google.analytics4".to_string(),
                required_scopes: vec!["https://www.googleapis.com/auth/analytics.readonly".to_string()],
                webhook_events: vec![],
            })
            .unwrap();
        (db, provider_id)
    }

    #[test]
    fn test_provider_round_trip() {
        let (db, provider_id) = seeded();

        let provider = db.get_provider_by_slug("google-analytics").unwrap().unwrap();
        assert_eq!(provider.id, provider_id);
        assert_eq!(provider.category.slug, "analytics");
        assert_eq!(provider.integration_type, IntegrationType::Oauth2);
        assert_eq!(provider.required_scopes.len(), 1);

        assert!(db.get_provider_by_slug("missing").unwrap().is_none());
    }

    #[test]
    fn test_upsert_provider_updates_in_place() {
        let (db, provider_id) = seeded();

        let again = db
            .upsert_provider(&NewProvider {
                name: "Google Analytics 4".to_string(),
                slug: "google-analytics".to_string(),
                category: "analytics".to_string(),
                description: Some("updated".to_string()),
                icon_url: String::new(),
                documentation_url: String::new(),
                integration_type: IntegrationType::Oauth2,
                plugin_class: "google.analytics4".to_string(),
                required_scopes: vec![],
                webhook_events: vec![],
            })
            .unwrap();

        assert_eq!(again, provider_id);
        assert_eq!(db.list_providers(None).unwrap().len(), 1);
        let provider = db.get_provider_by_slug("google-analytics").unwrap().unwrap();
        assert_eq!(provider.description.as_deref(), Some("updated"));
    }

    #[test]
    fn test_provider_requires_existing_category() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .upsert_provider(&NewProvider {
                name: "X".to_string(),
                slug: "x".to_string(),
                category: "nope".to_string(),
                description: None,
                icon_url: String::new(),
                documentation_url: String::new(),
                integration_type: IntegrationType::ApiKey,
                plugin_class: "x".to_string(),
                required_scopes: vec![],
                webhook_events: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_list_providers_by_category() {
        let (db, _) = seeded();
        assert_eq!(db.list_providers(Some("analytics")).unwrap().len(), 1);
        assert!(db.list_providers(Some("advertising")).unwrap().is_empty());
    }

    #[test]
    fn test_connection_round_trip() {
        let (db, provider_id) = seeded();
        let mut conn = Connection::new("user-1", provider_id)
            .with_display_name("Main site")
            .with_config(json!({"property_id": "123"}));
        conn.encrypted_credentials = "token".to_string();
        db.insert_connection(&conn).unwrap();

        let loaded = db.get_connection(conn.id).unwrap().unwrap();
        assert_eq!(loaded.connection.id, conn.id);
        assert_eq!(loaded.connection.config_data, json!({"property_id": "123"}));
        assert_eq!(loaded.connection.encrypted_credentials, "token");
        assert_eq!(loaded.slug(), "google-analytics");
    }

    #[test]
    fn test_only_one_active_connection_per_triple() {
        let (db, provider_id) = seeded();
        let first = Connection::new("user-1", provider_id).with_display_name("Main");
        db.insert_connection(&first).unwrap();

        let duplicate = Connection::new("user-1", provider_id).with_display_name("Main");
        let err = db.insert_connection(&duplicate).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        // Other display names and other users are fine
        db.insert_connection(&Connection::new("user-1", provider_id).with_display_name("Blog")).unwrap();
        db.insert_connection(&Connection::new("user-2", provider_id).with_display_name("Main")).unwrap();

        // Once the first is disabled a new active one can be linked
        assert!(db.update_connection_status(first.id, ConnectionStatus::Disabled).unwrap());
        db.insert_connection(&duplicate).unwrap();

        // Re-activating the old one would break the invariant
        let err = db.update_connection_status(first.id, ConnectionStatus::Active).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn test_unknown_provider_is_not_a_conflict() {
        let (db, _) = seeded();
        let err = db.insert_connection(&Connection::new("user-1", 999)).unwrap_err();
        assert!(matches!(err, StorageError::Sqlite(_)));
    }

    #[test]
    fn test_list_connections_filters_status() {
        let (db, provider_id) = seeded();
        let active = Connection::new("user-1", provider_id).with_display_name("A");
        let expired = Connection::new("user-1", provider_id).with_display_name("B");
        db.insert_connection(&active).unwrap();
        db.insert_connection(&expired).unwrap();
        db.update_connection_status(expired.id, ConnectionStatus::Expired).unwrap();

        let all = db.list_connections("user-1", None).unwrap();
        assert_eq!(all.len(), 2);

        let only_active = db.list_connections("user-1", Some(ConnectionStatus::Active)).unwrap();
        assert_eq!(only_active.len(), 1);
        assert_eq!(only_active[0].connection.id, active.id);

        assert!(db.list_connections("someone-else", None).unwrap().is_empty());
    }

    #[test]
    fn test_credentials_sync_and_delete() {
        let (db, provider_id) = seeded();
        let conn = Connection::new("user-1", provider_id);
        db.insert_connection(&conn).unwrap();

        let expires = Utc::now() + chrono::Duration::hours(1);
        assert!(db.update_connection_credentials(conn.id, "new-token", Some(expires)).unwrap());
        let at = Utc::now();
        assert!(db.mark_synced(conn.id, at).unwrap());

        let loaded = db.get_connection(conn.id).unwrap().unwrap().connection;
        assert_eq!(loaded.encrypted_credentials, "new-token");
        assert!(loaded.expires_at.is_some());
        assert!(loaded.last_sync.is_some());

        assert!(db.delete_connection(conn.id).unwrap());
        assert!(!db.delete_connection(conn.id).unwrap());
        assert!(db.get_connection(conn.id).unwrap().is_none());
    }
}
