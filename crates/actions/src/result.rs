use {
    courier_common::ToolResult,
    serde::Serialize,
    serde_json::Value,
};

use crate::action::MessageAction;

/// Who produced an action's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandledBy {
    /// A channel plugin's action adapter.
    Plugin,
    /// Core delivery (outbound adapter or broadcast coordination).
    Core,
    /// Nothing was sent; the payload describes what would have been.
    DryRun,
}

/// Uniform result of a message action, whatever handled it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ActionResult {
    Send {
        channel: String,
        action: MessageAction,
        to: String,
        handled_by: HandledBy,
        payload: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_result: Option<ToolResult>,
        dry_run: bool,
    },
    Broadcast {
        channel: String,
        action: MessageAction,
        handled_by: HandledBy,
        payload: Value,
        results: Vec<BroadcastOutcome>,
        dry_run: bool,
    },
    Poll {
        channel: String,
        action: MessageAction,
        to: String,
        handled_by: HandledBy,
        payload: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_result: Option<ToolResult>,
        dry_run: bool,
    },
    Action {
        channel: String,
        action: MessageAction,
        handled_by: HandledBy,
        payload: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_result: Option<ToolResult>,
        dry_run: bool,
    },
}

impl ActionResult {
    pub fn channel(&self) -> &str {
        match self {
            Self::Send { channel, .. }
            | Self::Broadcast { channel, .. }
            | Self::Poll { channel, .. }
            | Self::Action { channel, .. } => channel,
        }
    }

    pub fn action(&self) -> MessageAction {
        match self {
            Self::Send { action, .. }
            | Self::Broadcast { action, .. }
            | Self::Poll { action, .. }
            | Self::Action { action, .. } => *action,
        }
    }

    pub fn handled_by(&self) -> HandledBy {
        match self {
            Self::Send { handled_by, .. }
            | Self::Broadcast { handled_by, .. }
            | Self::Poll { handled_by, .. }
            | Self::Action { handled_by, .. } => *handled_by,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            Self::Send { payload, .. }
            | Self::Broadcast { payload, .. }
            | Self::Poll { payload, .. }
            | Self::Action { payload, .. } => payload,
        }
    }

    pub fn dry_run(&self) -> bool {
        match self {
            Self::Send { dry_run, .. }
            | Self::Broadcast { dry_run, .. }
            | Self::Poll { dry_run, .. }
            | Self::Action { dry_run, .. } => *dry_run,
        }
    }

    /// Resolved destination of a send or poll.
    pub fn to(&self) -> Option<&str> {
        match self {
            Self::Send { to, .. } | Self::Poll { to, .. } => Some(to),
            Self::Broadcast { .. } | Self::Action { .. } => None,
        }
    }
}

/// One (channel, target) pair of a broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastOutcome {
    pub channel: String,
    /// Resolved destination, or the raw target when resolution failed.
    pub to: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<ActionResult>>,
}

impl BroadcastOutcome {
    pub fn success(channel: String, to: String, result: ActionResult) -> Self {
        Self {
            channel,
            to,
            ok: true,
            error: None,
            result: Some(Box::new(result)),
        }
    }

    pub fn failure(channel: String, to: String, error: impl std::fmt::Display) -> Self {
        Self {
            channel,
            to,
            ok: false,
            error: Some(error.to_string()),
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn serializes_with_kind_tag_and_camel_case_fields() {
        let result = ActionResult::Send {
            channel: "slack".into(),
            action: MessageAction::Send,
            to: "channel:C0123ABCD".into(),
            handled_by: HandledBy::DryRun,
            payload: json!({ "ok": true }),
            tool_result: None,
            dry_run: true,
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "kind": "send",
                "channel": "slack",
                "action": "send",
                "to": "channel:C0123ABCD",
                "handledBy": "dry-run",
                "payload": { "ok": true },
                "dryRun": true
            })
        );
        assert_eq!(result.to(), Some("channel:C0123ABCD"));
    }

    #[test]
    fn broadcast_outcomes_serialize_errors() {
        let outcome = BroadcastOutcome::failure("slack".into(), "nobody".into(), "unknown target");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "channel": "slack", "to": "nobody", "ok": false, "error": "unknown target" })
        );
    }
}
