use std::sync::Arc;

use {
    courier_config::CourierConfig,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{action::MessageAction, dispatch::ActionDeps};

/// Gateway the dispatchers should deliver through, when not the local one.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl std::fmt::Debug for GatewayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayOptions")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_ms", &self.timeout_ms)
            .field("client_name", &self.client_name)
            .field("mode", &self.mode)
            .finish()
    }
}

/// The conversation the calling agent is bound to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionContext {
    /// Destination id of the bound conversation.
    #[serde(default)]
    pub current_channel_id: Option<String>,
    /// Channel (provider) of the bound conversation.
    #[serde(default)]
    pub current_channel_provider: Option<String>,
    #[serde(default)]
    pub current_thread_id: Option<String>,
    /// Message being replied to; target of `[[reply_to_current]]`.
    #[serde(default)]
    pub current_message_id: Option<String>,
    #[serde(default)]
    pub skip_cross_context_decoration: bool,
}

/// One message action as submitted by a caller.
#[derive(Clone)]
pub struct ActionRequest {
    pub config: Arc<CourierConfig>,
    pub action: MessageAction,
    pub params: Map<String, Value>,
    pub default_account_id: Option<String>,
    pub context: Option<ActionContext>,
    pub gateway: Option<GatewayOptions>,
    pub deps: Option<ActionDeps>,
    /// Session to mirror delivered sends into.
    pub session_key: Option<String>,
    pub agent_id: Option<String>,
    /// Overrides the `dryRun` parameter when set.
    pub dry_run: Option<bool>,
}

impl ActionRequest {
    pub fn new(config: Arc<CourierConfig>, action: MessageAction, params: Map<String, Value>) -> Self {
        Self {
            config,
            action,
            params,
            default_account_id: None,
            context: None,
            gateway: None,
            deps: None,
            session_key: None,
            agent_id: None,
            dry_run: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: ActionContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn with_default_account(mut self, account_id: impl Into<String>) -> Self {
        self.default_account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn with_deps(mut self, deps: ActionDeps) -> Self {
        self.deps = Some(deps);
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }
}

/// Everything a handler needs once channel, account and targets are settled.
pub struct ResolvedActionContext<'a> {
    pub config: &'a Arc<CourierConfig>,
    pub action: MessageAction,
    /// Working copy of the request parameters with canonical targets.
    pub params: Map<String, Value>,
    pub channel: String,
    pub account_id: Option<String>,
    pub dry_run: bool,
    pub gateway: Option<&'a GatewayOptions>,
    pub request: &'a ActionRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_debug_redacts_token() {
        let gateway = GatewayOptions {
            url: Some("ws://127.0.0.1:18789".into()),
            token: Some("secret-token".into()),
            ..Default::default()
        };
        let debug = format!("{gateway:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn context_deserializes_from_camel_case() {
        let ctx: ActionContext = serde_json::from_value(serde_json::json!({
            "currentChannelProvider": "slack",
            "currentChannelId": "C0123ABCD",
            "skipCrossContextDecoration": true
        }))
        .unwrap();
        assert_eq!(ctx.current_channel_provider.as_deref(), Some("slack"));
        assert!(ctx.skip_cross_context_decoration);
    }
}
