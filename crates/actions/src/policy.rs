//! Cross-context guard: may an agent bound to one conversation act on another?

use {
    courier_channels::strip_target_prefixes,
    courier_config::CourierConfig,
    serde_json::{Map, Value, json},
};

use crate::{
    action::MessageAction,
    error::{ActionError, Result},
    params::read_string,
    request::ActionContext,
};

/// Inputs to a policy decision, after targets have been resolved.
pub struct PolicyCheck<'a> {
    pub config: &'a CourierConfig,
    pub channel: &'a str,
    pub action: MessageAction,
    pub params: &'a Map<String, Value>,
    pub context: Option<&'a ActionContext>,
}

impl PolicyCheck<'_> {
    /// Canonical destination of the action (`to`, else `channelId`).
    pub fn destination(&self) -> Option<String> {
        read_string(self.params, "to").or_else(|| read_string(self.params, "channelId"))
    }
}

/// Origin marker for a message sent outside the bound conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    pub prefix: String,
    pub suffix: Option<String>,
    /// Used instead of the text marker on channels that prefer embeds.
    pub embeds: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedMessage {
    pub message: String,
    pub embeds: Option<Vec<Value>>,
}

pub trait CrossContextPolicy: Send + Sync {
    /// Reject the action when it crosses a boundary the config forbids.
    fn enforce(&self, check: &PolicyCheck<'_>) -> Result<()>;

    /// Marker to apply when the action crosses contexts. `origin_label` is the
    /// directory name of the bound conversation, when known.
    fn build_decoration(
        &self,
        check: &PolicyCheck<'_>,
        origin_label: Option<&str>,
    ) -> Option<Decoration>;

    fn apply_decoration(
        &self,
        message: &str,
        decoration: &Decoration,
        prefer_embeds: bool,
    ) -> DecoratedMessage {
        if prefer_embeds && let Some(embeds) = &decoration.embeds {
            return DecoratedMessage {
                message: message.to_string(),
                embeds: Some(embeds.clone()),
            };
        }
        let mut decorated = format!("{}{message}", decoration.prefix);
        if let Some(suffix) = &decoration.suffix {
            decorated.push_str(suffix);
        }
        DecoratedMessage {
            message: decorated,
            embeds: None,
        }
    }
}

/// Actions that put new content into a conversation.
fn is_guarded(action: MessageAction) -> bool {
    matches!(
        action,
        MessageAction::Send
            | MessageAction::Poll
            | MessageAction::Reply
            | MessageAction::SendWithEffect
            | MessageAction::SendAttachment
            | MessageAction::ThreadCreate
            | MessageAction::ThreadReply
            | MessageAction::Sticker
    )
}

fn same_destination(a: &str, b: &str) -> bool {
    strip_target_prefixes(a).eq_ignore_ascii_case(strip_target_prefixes(b))
}

/// Where an action lands relative to the bound conversation.
enum Crossing<'a> {
    None,
    Provider { bound: &'a str },
    Destination { bound: &'a str },
}

fn crossing<'a>(check: &PolicyCheck<'a>) -> Crossing<'a> {
    let Some(context) = check.context else {
        return Crossing::None;
    };
    let Some(provider) = context.current_channel_provider.as_deref() else {
        return Crossing::None;
    };
    if !provider.eq_ignore_ascii_case(check.channel) {
        return Crossing::Provider { bound: provider };
    }
    match (context.current_channel_id.as_deref(), check.destination()) {
        (Some(bound), Some(dest)) if !same_destination(bound, &dest) => {
            Crossing::Destination { bound }
        },
        _ => Crossing::None,
    }
}

/// Config-driven policy from `tools.message.cross_context`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCrossContextPolicy;

impl CrossContextPolicy for DefaultCrossContextPolicy {
    fn enforce(&self, check: &PolicyCheck<'_>) -> Result<()> {
        if !is_guarded(check.action) {
            return Ok(());
        }
        let rules = &check.config.tools.message.cross_context;
        match crossing(check) {
            Crossing::Provider { bound } if !rules.allow_across_providers => {
                Err(ActionError::policy_denied(format!(
                    "cross-context messaging denied: action={} target provider \"{}\" while bound to \"{bound}\"",
                    check.action, check.channel
                )))
            },
            Crossing::Destination { bound } if !rules.allow_within_provider => {
                Err(ActionError::policy_denied(format!(
                    "cross-context messaging denied: action={} target \"{}\" while bound to \"{bound}\" on {}",
                    check.action,
                    check.destination().unwrap_or_default(),
                    check.channel
                )))
            },
            _ => Ok(()),
        }
    }

    fn build_decoration(
        &self,
        check: &PolicyCheck<'_>,
        origin_label: Option<&str>,
    ) -> Option<Decoration> {
        if !is_guarded(check.action) {
            return None;
        }
        let context = check.context?;
        if context.skip_cross_context_decoration {
            return None;
        }
        let marker = &check.config.tools.message.cross_context.marker;
        if !marker.enabled || matches!(crossing(check), Crossing::None) {
            return None;
        }
        let origin = origin_label
            .or(context.current_channel_id.as_deref())
            .or(context.current_channel_provider.as_deref())
            .unwrap_or("another conversation");
        let render = |template: &str| template.replace("{channel}", origin);
        Some(Decoration {
            prefix: render(&marker.prefix),
            suffix: marker.suffix.as_deref().map(render),
            embeds: Some(vec![json!({ "description": format!("From {origin}") })]),
        })
    }
}

/// Allows everything and never decorates.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPolicy;

impl CrossContextPolicy for AllowAllPolicy {
    fn enforce(&self, _check: &PolicyCheck<'_>) -> Result<()> {
        Ok(())
    }

    fn build_decoration(
        &self,
        _check: &PolicyCheck<'_>,
        _origin_label: Option<&str>,
    ) -> Option<Decoration> {
        None
    }
}
