//! Channel plugin system.
//!
//! Each channel (Discord, Slack, Telegram, WhatsApp, etc.) implements the
//! [`ChannelPlugin`] trait and exposes optional adapters for directory
//! listings, outbound delivery, and channel-specific actions. Target syntax
//! rules live in [`targets`], channel selection in [`selection`].

pub mod config_plugin;
pub mod directory;
pub mod error;
pub mod plugin;
pub mod registry;
pub mod selection;
pub mod targets;

pub use {
    config_plugin::ConfigChannelPlugin,
    directory::{ChannelDirectory, ConfigDirectory, DirectoryEntry, DirectoryKind, DirectoryQuery},
    error::{Error, Result},
    plugin::{
        ChannelActionRequest, ChannelActions, ChannelOutbound, ChannelPlugin, ChannelType,
        OutboundMessage, OutboundPoll,
    },
    registry::ChannelRegistry,
    selection::{ChannelSelector, ConfigChannelSelector, normalize_channel_id},
    targets::{TargetSyntax, strip_target_prefixes, target_syntax},
};
