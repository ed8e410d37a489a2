//! Helpers for pulling typed values out of generic call parameters

use serde_json::Value;

use crate::application::errors::PluginError;

pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, PluginError> {
    optional_str(params, key)?
        .ok_or_else(|| PluginError::InvalidParams(format!("missing required parameter '{}'", key)))
}

pub fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, PluginError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(PluginError::InvalidParams(format!("parameter '{}' must be a string", key))),
    }
}

/// Accepts numbers and numeric strings
pub fn optional_u64(params: &Value, key: &str) -> Result<Option<u64>, PluginError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| PluginError::InvalidParams(format!("parameter '{}' must be a positive integer", key))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PluginError::InvalidParams(format!("parameter '{}' must be a positive integer", key))),
        Some(_) => Err(PluginError::InvalidParams(format!("parameter '{}' must be a positive integer", key))),
    }
}

/// Accepts a list of strings or a single comma separated string
pub fn optional_str_list(params: &Value, key: &str) -> Result<Option<Vec<String>>, PluginError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let items: Vec<String> = s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect();
            Ok((!items.is_empty()).then_some(items))
        }
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    Value::Number(n) => out.push(n.to_string()),
                    _ => {
                        return Err(PluginError::InvalidParams(format!(
                            "parameter '{}' must be a list of strings",
                            key
                        )))
                    }
                }
            }
            Ok((!out.is_empty()).then_some(out))
        }
        Some(_) => Err(PluginError::InvalidParams(format!("parameter '{}' must be a list of strings", key))),
    }
}

/// Dates are passed through to the vendor as `YYYY-MM-DD` or relative forms like `7daysAgo`
pub fn required_date<'a>(params: &'a Value, key: &str) -> Result<&'a str, PluginError> {
    let value = required_str(params, key)?;
    let is_iso = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    let is_relative = matches!(value, "today" | "yesterday")
        || value
            .strip_suffix("daysAgo")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));

    if is_iso || is_relative {
        Ok(value)
    } else {
        Err(PluginError::InvalidParams(format!(
            "parameter '{}' must be YYYY-MM-DD, got '{}'",
            key, value
        )))
    }
}
