//! Which parameter, if any, carries an action's destination.

use serde_json::{Map, Value};

use crate::{action::MessageAction, error::ActionError, params::read_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTargetMode {
    /// Destination in `to` (a user, group, or channel).
    To,
    /// Destination in `channelId` (a channel, never a user).
    ChannelId,
    /// No destination.
    None,
}

impl ActionTargetMode {
    /// Parameter key the destination lives under.
    pub fn param_key(self) -> Option<&'static str> {
        match self {
            Self::To => Some("to"),
            Self::ChannelId => Some("channelId"),
            Self::None => None,
        }
    }
}

impl MessageAction {
    pub fn target_mode(self) -> ActionTargetMode {
        use MessageAction::*;
        match self {
            Send | Poll | React | Reactions | Read | Edit | Unsend | Reply | SendWithEffect
            | RenameGroup | SetGroupIcon | AddParticipant | RemoveParticipant | LeaveGroup
            | SendAttachment | Delete | Pin | Unpin | ListPins | Permissions | ThreadCreate
            | ThreadReply | Sticker => ActionTargetMode::To,
            ChannelInfo | ChannelEdit | ChannelDelete | ChannelMove => ActionTargetMode::ChannelId,
            Broadcast | ThreadList | Search | StickerSearch | MemberInfo | RoleInfo | EmojiList
            | EmojiUpload | StickerUpload | RoleAdd | RoleRemove | ChannelList | ChannelCreate
            | CategoryCreate | CategoryEdit | CategoryDelete | VoiceStatus | EventList
            | EventCreate | Timeout | Kick | Ban | SetPresence => ActionTargetMode::None,
        }
    }
}

pub fn requires_target(action: MessageAction) -> bool {
    action.target_mode() != ActionTargetMode::None
}

/// Move a generic `target` parameter onto the action's concrete key.
///
/// `target` is always removed. It is an error on actions without a
/// destination and when it disagrees with an explicit `to`/`channelId`.
pub fn apply_target_to_params(
    action: MessageAction,
    params: &mut Map<String, Value>,
) -> Result<(), ActionError> {
    let target = read_string(params, "target");
    params.remove("target");
    let Some(target) = target else {
        return Ok(());
    };

    let Some(key) = action.target_mode().param_key() else {
        return Err(ActionError::validation(format!(
            "action {action} does not accept a target"
        )));
    };
    match read_string(params, key) {
        Some(existing) if existing != target => Err(ActionError::validation(format!(
            "target \"{target}\" conflicts with {key} \"{existing}\""
        ))),
        _ => {
            params.insert(key.to_string(), Value::String(target));
            Ok(())
        },
    }
}
