/// Config schema types (channels, message tools, directory resolution).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Chat channels, keyed by channel id (`discord`, `slack`, ...).
    pub channels: BTreeMap<String, ChannelConfig>,
    pub tools: ToolsConfig,
    pub directory: DirectoryConfig,
}

impl CourierConfig {
    /// Channel entry, if configured (enabled or not).
    pub fn channel(&self, id: &str) -> Option<&ChannelConfig> {
        self.channels.get(id)
    }

    /// Ids of every enabled channel, in sorted order.
    pub fn enabled_channels(&self) -> impl Iterator<Item = &str> {
        self.channels
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(id, _)| id.as_str())
    }
}

/// Per-channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Defaults to true. A disabled channel is never selected implicitly.
    pub enabled: bool,
    /// Account used when a request names none.
    pub default_account: Option<String>,
    /// Connector-specific account settings, keyed by account id.
    pub accounts: BTreeMap<String, serde_json::Value>,
    /// Static directory entries served without a live connector.
    pub directory: ChannelDirectoryConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_account: None,
            accounts: BTreeMap::new(),
            directory: ChannelDirectoryConfig::default(),
        }
    }
}

/// Peers and groups known from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelDirectoryConfig {
    pub peers: Vec<DirectoryEntryConfig>,
    pub groups: Vec<DirectoryEntryConfig>,
}

impl ChannelDirectoryConfig {
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty() && self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntryConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

/// Tool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub message: MessageToolConfig,
}

/// `tools.message`: behaviour of the message action runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageToolConfig {
    pub broadcast: BroadcastConfig,
    pub cross_context: CrossContextConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Defaults to true.
    pub enabled: bool,
    /// Number of (channel, target) sends in flight at once. 1 = sequential.
    pub concurrency: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: 1,
        }
    }
}

/// Guard rails for sending outside the conversation a request originated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossContextConfig {
    /// Allow sending to another conversation on the same provider.
    pub allow_within_provider: bool,
    /// Allow sending to a different provider than the bound conversation.
    pub allow_across_providers: bool,
    pub marker: CrossContextMarkerConfig,
}

impl Default for CrossContextConfig {
    fn default() -> Self {
        Self {
            allow_within_provider: true,
            allow_across_providers: false,
            marker: CrossContextMarkerConfig::default(),
        }
    }
}

/// Origin marker added to messages that cross conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossContextMarkerConfig {
    pub enabled: bool,
    /// `{channel}` is replaced with the origin label.
    pub prefix: String,
    pub suffix: Option<String>,
}

impl Default for CrossContextMarkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "[from {channel}] ".into(),
            suffix: None,
        }
    }
}

/// Target resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Re-query a directory's live listing when its snapshot comes back empty.
    pub prefer_live_on_miss: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            prefer_live_on_miss: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_broadcast_and_markers() {
        let cfg = CourierConfig::default();
        assert!(cfg.tools.message.broadcast.enabled);
        assert_eq!(cfg.tools.message.broadcast.concurrency, 1);
        assert!(cfg.tools.message.cross_context.allow_within_provider);
        assert!(!cfg.tools.message.cross_context.allow_across_providers);
        assert!(cfg.directory.prefer_live_on_miss);
    }

    #[test]
    fn enabled_channels_skips_disabled_in_sorted_order() {
        let cfg: CourierConfig = toml::from_str(
            r#"
            [channels.slack]
            [channels.discord]
            [channels.telegram]
            enabled = false
            "#,
        )
        .unwrap();
        let ids: Vec<_> = cfg.enabled_channels().collect();
        assert_eq!(ids, vec!["discord", "slack"]);
    }

    #[test]
    fn directory_entries_parse() {
        let cfg: CourierConfig = toml::from_str(
            r#"
            [[channels.discord.directory.groups]]
            id = "1234567"
            name = "general"
            "#,
        )
        .unwrap();
        let discord = cfg.channel("discord").unwrap();
        assert_eq!(discord.directory.groups.len(), 1);
        assert_eq!(discord.directory.groups[0].name.as_deref(), Some("general"));
        assert!(discord.directory.peers.is_empty());
    }
}
