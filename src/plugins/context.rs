//! Context handed to the LLM alongside the user's message

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::plugins::trait_def::MethodSpec;

/// A data source the LLM may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    pub slug: String,
    pub category: String,
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaudeContext {
    pub available_data_sources: Vec<DataSource>,
    pub available_methods: BTreeMap<String, Vec<MethodSpec>>,
    pub user_config: Value,
}

const CALL_INSTRUCTIONS: &str = "When you need data from one of these sources, reply with a JSON object \
inside a ```json fenced block of the form \
{\"mcp_calls\": [{\"plugin\": \"<slug>\", \"method\": \"<method>\", \"params\": {...}}]}. \
Only use the slugs and methods listed. Dates use YYYY-MM-DD.";

impl ClaudeContext {
    pub fn is_empty(&self) -> bool {
        self.available_data_sources.is_empty()
    }

    /// System prompt: the configured base prompt followed by the data sources as JSON
    pub fn render_system_prompt(&self, base: Option<&str>) -> String {
        let mut prompt = base.map(str::to_string).unwrap_or_default();
        if self.is_empty() {
            return prompt;
        }

        let context = serde_json::to_string_pretty(self).unwrap_or_default();
        if !prompt.is_empty() {
            prompt.push_str("\n\n");
        }
        prompt.push_str("You have access to the user's connected data sources:\n");
        prompt.push_str(&context);
        prompt.push_str("\n\n");
        prompt.push_str(CALL_INSTRUCTIONS);
        prompt
    }
}
