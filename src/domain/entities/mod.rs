//! Domain entities - Providers, categories and user connections

pub mod connection;
pub mod provider;

pub use connection::{Connection, ConnectionStatus, ProviderConnection, DEFAULT_SYNC_FREQUENCY};
pub use provider::{Category, IntegrationType, Provider};
