//! Delivery seams between the runner and channel back-ends.
//!
//! Each trait has a `Noop` implementation so the runner can be wired before
//! any connector is loaded, and [`RegistryDispatcher`] implements all three on
//! top of the channel plugin registry.

use std::sync::Arc;

use {
    async_trait::async_trait,
    courier_channels::{
        ChannelActionRequest, ChannelRegistry, Error, OutboundMessage, OutboundPoll, Result,
    },
    courier_common::ToolResult,
    serde_json::{Map, Value},
    tracing::debug,
};

use crate::{payload::extract_tool_payload, request::GatewayOptions, result::HandledBy};

/// What a send or poll dispatcher produced.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub handled_by: HandledBy,
    pub payload: Value,
    pub tool_result: Option<ToolResult>,
}

/// Session transcript a delivered send is mirrored into.
#[derive(Debug, Clone)]
pub struct SendMirror {
    pub session_key: String,
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub channel: String,
    pub message: OutboundMessage,
    pub gateway: Option<GatewayOptions>,
    pub mirror: Option<SendMirror>,
}

#[derive(Debug, Clone)]
pub struct PollRequest {
    pub channel: String,
    pub poll: OutboundPoll,
    pub gateway: Option<GatewayOptions>,
}

#[async_trait]
pub trait SendDispatcher: Send + Sync {
    async fn send(&self, request: &SendRequest) -> Result<DispatchOutcome>;
}

#[async_trait]
pub trait PollDispatcher: Send + Sync {
    async fn poll(&self, request: &PollRequest) -> Result<DispatchOutcome>;
}

/// Channel-specific actions. `Ok(None)` means no plugin handles the action.
#[async_trait]
pub trait PluginActionDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        channel: &str,
        request: &ChannelActionRequest,
    ) -> Result<Option<ToolResult>>;
}

/// Per-request dispatcher overrides; unset fields use the runner's own.
#[derive(Clone, Default)]
pub struct ActionDeps {
    pub send: Option<Arc<dyn SendDispatcher>>,
    pub poll: Option<Arc<dyn PollDispatcher>>,
    pub plugin: Option<Arc<dyn PluginActionDispatcher>>,
}

// ── Noop ────────────────────────────────────────────────────────────────────

pub struct NoopSendDispatcher;

#[async_trait]
impl SendDispatcher for NoopSendDispatcher {
    async fn send(&self, _request: &SendRequest) -> Result<DispatchOutcome> {
        Err(Error::unavailable("send dispatcher not configured"))
    }
}

pub struct NoopPollDispatcher;

#[async_trait]
impl PollDispatcher for NoopPollDispatcher {
    async fn poll(&self, _request: &PollRequest) -> Result<DispatchOutcome> {
        Err(Error::unavailable("poll dispatcher not configured"))
    }
}

pub struct NoopPluginActionDispatcher;

#[async_trait]
impl PluginActionDispatcher for NoopPluginActionDispatcher {
    async fn dispatch(
        &self,
        _channel: &str,
        _request: &ChannelActionRequest,
    ) -> Result<Option<ToolResult>> {
        Ok(None)
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Dispatch through loaded channel plugins.
///
/// A plugin's action adapter takes precedence (`HandledBy::Plugin`); sends and
/// polls otherwise go through its outbound adapter (`HandledBy::Core`).
pub struct RegistryDispatcher {
    registry: Arc<ChannelRegistry>,
}

impl RegistryDispatcher {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    async fn via_plugin_actions(
        &self,
        channel: &str,
        action: &str,
        account_id: Option<&str>,
        params: Value,
    ) -> Result<Option<DispatchOutcome>> {
        let Some(actions) = self.registry.get(channel).and_then(|p| p.actions()) else {
            return Ok(None);
        };
        if !actions.supports(action) {
            return Ok(None);
        }
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let request = ChannelActionRequest {
            action: action.to_string(),
            account_id: account_id.map(str::to_string),
            params,
            dry_run: false,
        };
        let tool_result = actions.handle(&request).await?;
        debug!(channel, action, "handled by plugin action adapter");
        Ok(Some(DispatchOutcome {
            handled_by: HandledBy::Plugin,
            payload: extract_tool_payload(&tool_result),
            tool_result: Some(tool_result),
        }))
    }
}

#[async_trait]
impl SendDispatcher for RegistryDispatcher {
    async fn send(&self, request: &SendRequest) -> Result<DispatchOutcome> {
        let params = serde_json::to_value(&request.message)?;
        if let Some(outcome) = self
            .via_plugin_actions(
                &request.channel,
                "send",
                request.message.account_id.as_deref(),
                params,
            )
            .await?
        {
            return Ok(outcome);
        }
        let plugin = self.registry.require(&request.channel)?;
        let outbound = plugin.outbound().ok_or_else(|| {
            Error::unavailable(format!("channel {} cannot send messages", request.channel))
        })?;
        let payload = outbound.send(&request.message).await?;
        Ok(DispatchOutcome {
            handled_by: HandledBy::Core,
            payload,
            tool_result: None,
        })
    }
}

#[async_trait]
impl PollDispatcher for RegistryDispatcher {
    async fn poll(&self, request: &PollRequest) -> Result<DispatchOutcome> {
        let params = serde_json::to_value(&request.poll)?;
        if let Some(outcome) = self
            .via_plugin_actions(
                &request.channel,
                "poll",
                request.poll.account_id.as_deref(),
                params,
            )
            .await?
        {
            return Ok(outcome);
        }
        let plugin = self.registry.require(&request.channel)?;
        let outbound = plugin.outbound().ok_or_else(|| {
            Error::unavailable(format!("channel {} cannot send polls", request.channel))
        })?;
        let payload = outbound.send_poll(&request.poll).await?;
        Ok(DispatchOutcome {
            handled_by: HandledBy::Core,
            payload,
            tool_result: None,
        })
    }
}

#[async_trait]
impl PluginActionDispatcher for RegistryDispatcher {
    async fn dispatch(
        &self,
        channel: &str,
        request: &ChannelActionRequest,
    ) -> Result<Option<ToolResult>> {
        let Some(actions) = self.registry.get(channel).and_then(|p| p.actions()) else {
            return Ok(None);
        };
        if !actions.supports(&request.action) {
            return Ok(None);
        }
        actions.handle(request).await.map(Some)
    }
}
