//! Application services - catalog and connection use cases

pub mod catalog;
pub mod connection_service;

pub use catalog::{Catalog, CatalogService, SeedSummary};
pub use connection_service::{ConnectionService, LinkRequest};
