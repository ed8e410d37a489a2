//! Plugin calls requested inside an LLM reply

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `{"plugin", "method", "params"}` entry of `mcp_calls`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpCall {
    pub plugin: String,
    pub method: String,
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Object(Default::default())
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Find `mcp_calls` in a reply: fenced JSON blocks first, then the whole text,
/// then any object embedded in the prose
pub fn extract_calls(content: &str) -> Vec<McpCall> {
    let fenced = FENCED_JSON
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str());

    for candidate in fenced.chain(std::iter::once(content.trim())) {
        let Ok(value) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        if let Some(calls) = value.get("mcp_calls") {
            return parse_calls(calls);
        }
    }

    for (start, _) in content.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&content[start..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if let Some(calls) = value.get("mcp_calls") {
                return parse_calls(calls);
            }
        }
    }
    Vec::new()
}

fn parse_calls(calls: &Value) -> Vec<McpCall> {
    let Some(items) = calls.as_array() else {
        tracing::warn!("mcp_calls is not a list, ignoring");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<McpCall>(item.clone()) {
            Ok(call) => Some(call),
            Err(e) => {
                tracing::warn!("Skipping malformed mcp call {}: {}", item, e);
                None
            }
        })
        .collect()
}
