//! Pull the caller-facing payload out of a plugin's tool result.

use {courier_common::ToolResult, serde_json::Value};

type Extractor = fn(&ToolResult) -> Option<Value>;

/// Tried in order; the first hit wins.
const EXTRACTORS: &[Extractor] = &[from_details, from_first_text, from_content];

fn from_details(result: &ToolResult) -> Option<Value> {
    result.details.clone().filter(|details| !details.is_null())
}

/// First text block, parsed as JSON when it is JSON.
fn from_first_text(result: &ToolResult) -> Option<Value> {
    let text = result.first_text()?;
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

fn from_content(result: &ToolResult) -> Option<Value> {
    if result.content.is_empty() {
        return None;
    }
    serde_json::to_value(&result.content).ok()
}

pub fn extract_tool_payload(result: &ToolResult) -> Value {
    EXTRACTORS
        .iter()
        .find_map(|extract| extract(result))
        .unwrap_or_else(|| serde_json::to_value(result).unwrap_or(Value::Null))
}
