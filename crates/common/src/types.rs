//! Shared data shapes exchanged between channel plugins and the action layer.

use serde::{Deserialize, Serialize};

/// One block of content returned by a plugin action handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of a plugin-handled action: display content plus optional
/// structured details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ToolResult {
    /// Result carrying a single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            details: None,
        }
    }

    /// Result whose payload is `details`, mirrored as JSON text for display.
    #[must_use]
    pub fn json(details: serde_json::Value) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: details.to_string(),
            }],
            details: Some(details),
        }
    }

    /// First text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ToolContent::Text { text } => Some(text.as_str()),
            ToolContent::Image { .. } => None,
        })
    }
}
