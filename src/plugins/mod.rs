//! Plugin system for mcps
//!
//! Vendor plugins behind one contract, and the manager that routes requests to them

pub mod calls;
pub mod context;
pub mod google;
pub mod manager;
pub mod params;
pub mod registry;
pub mod relevance;
pub mod trait_def;

pub use calls::McpCall;
pub use context::ClaudeContext;
pub use manager::{ClaudeReply, McpManager};
pub use registry::PluginRegistry;
pub use trait_def::{AdvertisingPlugin, AnalyticsPlugin, CallResult, McpPlugin, MethodSpec, PluginContext};
