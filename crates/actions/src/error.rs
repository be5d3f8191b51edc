use {
    courier_channels::DirectoryEntry,
    courier_routing::ResolveError,
};

use crate::action::MessageAction;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{message}")]
    Validation { message: String },

    #[error("action {action} requires a target (to or channelId)")]
    TargetRequired { action: MessageAction },

    #[error("unknown target \"{input}\" for {channel}")]
    UnknownTarget { channel: String, input: String },

    #[error("ambiguous target \"{input}\" for {channel}: {} candidates", .candidates.len())]
    AmbiguousTarget {
        channel: String,
        input: String,
        candidates: Vec<DirectoryEntry>,
    },

    #[error("action {action} is not supported by channel {channel}")]
    UnsupportedAction {
        action: MessageAction,
        channel: String,
    },

    #[error("{message}")]
    PolicyDenied { message: String },

    #[error("could not determine channel: {source}")]
    ChannelResolution {
        #[source]
        source: courier_channels::Error,
    },

    #[error("{message}")]
    BroadcastPrecondition { message: String },

    #[error("directory lookup failed for {channel}: {source}")]
    Directory {
        channel: String,
        #[source]
        source: courier_channels::Error,
    },

    #[error("{channel} dispatch failed: {source}")]
    Dispatch {
        channel: String,
        #[source]
        source: courier_channels::Error,
    },
}

impl ActionError {
    #[must_use]
    pub fn validation(message: impl std::fmt::Display) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn policy_denied(message: impl std::fmt::Display) -> Self {
        Self::PolicyDenied {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn broadcast_precondition(message: impl std::fmt::Display) -> Self {
        Self::BroadcastPrecondition {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn dispatch(channel: impl Into<String>, source: courier_channels::Error) -> Self {
        Self::Dispatch {
            channel: channel.into(),
            source,
        }
    }

    /// Attach the action a resolution failure happened for.
    #[must_use]
    pub fn from_resolve(err: ResolveError, action: MessageAction) -> Self {
        match err {
            ResolveError::TargetRequired => Self::TargetRequired { action },
            ResolveError::UnknownTarget { channel, input } => Self::UnknownTarget { channel, input },
            ResolveError::AmbiguousTarget {
                channel,
                input,
                candidates,
            } => Self::AmbiguousTarget {
                channel,
                input,
                candidates,
            },
            ResolveError::Directory { channel, source } => Self::Directory { channel, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;
