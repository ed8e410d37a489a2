//! Domain layer - Core records of the integration layer
//! 
//! This layer contains:
//! - Entities: Categories, providers and user connections
//! - Traits: Abstractions for persistence (ConnectionStore)

pub mod entities;
pub mod traits;
