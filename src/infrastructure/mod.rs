//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Crypto: Credential encryption
//! - Database / Storage: SQLite persistence
//! - LLM: Claude client
//! - API: Read-only HTTP endpoints

pub mod api;
pub mod config;
pub mod crypto;
pub mod database;
pub mod llm;
pub mod storage;
