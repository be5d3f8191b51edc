use {
    async_trait::async_trait,
    courier_common::ToolResult,
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::{Error, Result, directory::ChannelDirectory};

/// Built-in chat platforms with known target syntax.
///
/// Plugins may register under any other id; those channels use the
/// permissive fallback rules in [`crate::targets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Discord,
    Slack,
    Telegram,
    Whatsapp,
    #[serde(rename = "msteams")]
    MsTeams,
    Signal,
    #[serde(rename = "imessage")]
    IMessage,
    #[serde(rename = "googlechat")]
    GoogleChat,
}

impl ChannelType {
    pub const ALL: &'static [ChannelType] = &[
        Self::Discord,
        Self::Slack,
        Self::Telegram,
        Self::Whatsapp,
        Self::MsTeams,
        Self::Signal,
        Self::IMessage,
        Self::GoogleChat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discord => "discord",
            Self::Slack => "slack",
            Self::Telegram => "telegram",
            Self::Whatsapp => "whatsapp",
            Self::MsTeams => "msteams",
            Self::Signal => "signal",
            Self::IMessage => "imessage",
            Self::GoogleChat => "googlechat",
        }
    }

    /// Human-readable platform name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Discord => "Discord",
            Self::Slack => "Slack",
            Self::Telegram => "Telegram",
            Self::Whatsapp => "WhatsApp",
            Self::MsTeams => "Microsoft Teams",
            Self::Signal => "Signal",
            Self::IMessage => "iMessage",
            Self::GoogleChat => "Google Chat",
        }
    }

    /// Whether cross-context decorations should be sent as rich embeds
    /// rather than inline text.
    pub fn prefers_embeds(self) -> bool {
        matches!(self, Self::Discord)
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::unknown_channel(s))
    }
}

/// Core channel plugin trait. Each messaging platform implements this.
pub trait ChannelPlugin: Send + Sync {
    /// Channel identifier (e.g. "discord", "slack").
    fn id(&self) -> &str;

    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Directory adapter for peer/group listings.
    fn directory(&self) -> Option<&dyn ChannelDirectory> {
        None
    }

    /// Outbound adapter for plain sends and polls.
    fn outbound(&self) -> Option<&dyn ChannelOutbound> {
        None
    }

    /// Adapter for channel-specific actions (react, pin, kick, ...).
    fn actions(&self) -> Option<&dyn ChannelActions> {
        None
    }
}

/// A fully resolved outbound message.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub to: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub silent: bool,
    pub gif_playback: bool,
    /// Deliver audio media as a voice note where the platform supports it.
    pub audio_as_voice: bool,
    pub best_effort: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Value>,
}

/// A fully resolved outbound poll.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPoll {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub to: String,
    pub question: String,
    pub options: Vec<String>,
    pub max_selections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Deliver messages to a channel.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send a message, returning the platform's delivery receipt.
    async fn send(&self, message: &OutboundMessage) -> Result<Value>;

    /// Create a poll. Unsupported by default.
    async fn send_poll(&self, _poll: &OutboundPoll) -> Result<Value> {
        Err(Error::unavailable("polls are not supported on this channel"))
    }
}

/// A channel-specific action after target resolution and policy checks.
#[derive(Debug, Clone)]
pub struct ChannelActionRequest {
    pub action: String,
    pub account_id: Option<String>,
    pub params: Map<String, Value>,
    pub dry_run: bool,
}

/// Channel-specific message actions.
#[async_trait]
pub trait ChannelActions: Send + Sync {
    /// Whether this channel implements `action`.
    fn supports(&self, action: &str) -> bool;

    async fn handle(&self, request: &ChannelActionRequest) -> Result<ToolResult>;
}
