//! Plugin registry - maps a provider's `plugin_class` to a constructor

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::PluginError;
use crate::plugins::google::{ads, analytics, search_console, GoogleAds, GoogleAnalytics4, GoogleSearchConsole};
use crate::plugins::trait_def::{McpPlugin, PluginContext, PluginResult};

pub type PluginConstructor = fn(PluginContext) -> PluginResult<Arc<dyn McpPlugin>>;

/// Registry of constructible plugin classes
pub struct PluginRegistry {
    constructors: HashMap<String, PluginConstructor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry with every plugin shipped in this crate
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(analytics::PLUGIN_CLASS, |ctx| {
            Ok(Arc::new(GoogleAnalytics4::new(ctx)?) as Arc<dyn McpPlugin>)
        });
        registry.register(search_console::PLUGIN_CLASS, |ctx| {
            Ok(Arc::new(GoogleSearchConsole::new(ctx)?) as Arc<dyn McpPlugin>)
        });
        registry.register(ads::PLUGIN_CLASS, |ctx| {
            Ok(Arc::new(GoogleAds::new(ctx)?) as Arc<dyn McpPlugin>)
        });
        registry
    }

    /// Register a constructor; a later registration replaces an earlier one
    pub fn register(&mut self, plugin_class: &str, constructor: PluginConstructor) {
        if self.constructors.insert(plugin_class.to_string(), constructor).is_some() {
            tracing::warn!("Plugin class '{}' registered twice, keeping the latest", plugin_class);
        }
    }

    pub fn contains(&self, plugin_class: &str) -> bool {
        self.constructors.contains_key(plugin_class)
    }

    /// Registered class names, sorted
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        classes.sort_unstable();
        classes
    }

    /// Build a plugin instance for `plugin_class`
    pub fn create(&self, plugin_class: &str, ctx: PluginContext) -> PluginResult<Arc<dyn McpPlugin>> {
        let constructor = self
            .constructors
            .get(plugin_class)
            .ok_or_else(|| PluginError::UnknownPluginClass(plugin_class.to_string()))?;
        constructor(ctx)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
