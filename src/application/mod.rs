//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Catalog and connection use cases
//! - Errors: Layered error types

pub mod errors;
pub mod services;
