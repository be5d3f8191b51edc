//! Lenient readers for the loosely typed parameter map agents send.

use serde_json::{Map, Value};

use crate::error::ActionError;

/// Trimmed non-empty string. Numbers are accepted and stringified.
pub fn read_string(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        },
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `true/false`, `yes/no`, `1/0`, `on/off` (any case) or a JSON boolean.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Some(true),
            "false" | "no" | "0" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn read_bool(params: &Map<String, Value>, key: &str) -> Option<bool> {
    params.get(key).and_then(parse_bool)
}

/// A JSON array of strings/numbers or a comma-separated string; blanks dropped.
pub fn read_string_array(params: &Map<String, Value>, key: &str) -> Vec<String> {
    let items: Vec<String> = match params.get(key) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Optional non-negative integer given as a number or numeric string.
pub fn read_u32(params: &Map<String, Value>, key: &str) -> Result<Option<u32>, ActionError> {
    let parsed = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        Some(_) => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| ActionError::validation(format!("{key} must be a non-negative integer")))
}

/// Decode a parameter that may arrive as a JSON-encoded string.
///
/// A blank string removes the key; anything else must parse.
pub fn parse_json_param(params: &mut Map<String, Value>, key: &str) -> Result<(), ActionError> {
    let Some(Value::String(raw)) = params.get(key) else {
        return Ok(());
    };
    if raw.trim().is_empty() {
        params.remove(key);
        return Ok(());
    }
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| ActionError::validation(format!("{key} must be valid JSON: {e}")))?;
    params.insert(key.to_string(), parsed);
    Ok(())
}
