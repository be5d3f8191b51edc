use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};

use crate::error::ActionError;

/// Every message action the runner understands.
///
/// Wire names mix camelCase (`sendWithEffect`) and kebab-case (`list-pins`)
/// because they come straight from the tool schema agents call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAction {
    Send,
    Broadcast,
    Poll,
    React,
    Reactions,
    Read,
    Edit,
    Unsend,
    Reply,
    SendWithEffect,
    RenameGroup,
    SetGroupIcon,
    AddParticipant,
    RemoveParticipant,
    LeaveGroup,
    SendAttachment,
    Delete,
    Pin,
    Unpin,
    ListPins,
    Permissions,
    ThreadCreate,
    ThreadList,
    ThreadReply,
    Search,
    Sticker,
    StickerSearch,
    MemberInfo,
    RoleInfo,
    EmojiList,
    EmojiUpload,
    StickerUpload,
    RoleAdd,
    RoleRemove,
    ChannelInfo,
    ChannelList,
    ChannelCreate,
    ChannelEdit,
    ChannelDelete,
    ChannelMove,
    CategoryCreate,
    CategoryEdit,
    CategoryDelete,
    VoiceStatus,
    EventList,
    EventCreate,
    Timeout,
    Kick,
    Ban,
    SetPresence,
}

impl MessageAction {
    pub const ALL: &[Self] = &[
        Self::Send,
        Self::Broadcast,
        Self::Poll,
        Self::React,
        Self::Reactions,
        Self::Read,
        Self::Edit,
        Self::Unsend,
        Self::Reply,
        Self::SendWithEffect,
        Self::RenameGroup,
        Self::SetGroupIcon,
        Self::AddParticipant,
        Self::RemoveParticipant,
        Self::LeaveGroup,
        Self::SendAttachment,
        Self::Delete,
        Self::Pin,
        Self::Unpin,
        Self::ListPins,
        Self::Permissions,
        Self::ThreadCreate,
        Self::ThreadList,
        Self::ThreadReply,
        Self::Search,
        Self::Sticker,
        Self::StickerSearch,
        Self::MemberInfo,
        Self::RoleInfo,
        Self::EmojiList,
        Self::EmojiUpload,
        Self::StickerUpload,
        Self::RoleAdd,
        Self::RoleRemove,
        Self::ChannelInfo,
        Self::ChannelList,
        Self::ChannelCreate,
        Self::ChannelEdit,
        Self::ChannelDelete,
        Self::ChannelMove,
        Self::CategoryCreate,
        Self::CategoryEdit,
        Self::CategoryDelete,
        Self::VoiceStatus,
        Self::EventList,
        Self::EventCreate,
        Self::Timeout,
        Self::Kick,
        Self::Ban,
        Self::SetPresence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Broadcast => "broadcast",
            Self::Poll => "poll",
            Self::React => "react",
            Self::Reactions => "reactions",
            Self::Read => "read",
            Self::Edit => "edit",
            Self::Unsend => "unsend",
            Self::Reply => "reply",
            Self::SendWithEffect => "sendWithEffect",
            Self::RenameGroup => "renameGroup",
            Self::SetGroupIcon => "setGroupIcon",
            Self::AddParticipant => "addParticipant",
            Self::RemoveParticipant => "removeParticipant",
            Self::LeaveGroup => "leaveGroup",
            Self::SendAttachment => "sendAttachment",
            Self::Delete => "delete",
            Self::Pin => "pin",
            Self::Unpin => "unpin",
            Self::ListPins => "list-pins",
            Self::Permissions => "permissions",
            Self::ThreadCreate => "thread-create",
            Self::ThreadList => "thread-list",
            Self::ThreadReply => "thread-reply",
            Self::Search => "search",
            Self::Sticker => "sticker",
            Self::StickerSearch => "sticker-search",
            Self::MemberInfo => "member-info",
            Self::RoleInfo => "role-info",
            Self::EmojiList => "emoji-list",
            Self::EmojiUpload => "emoji-upload",
            Self::StickerUpload => "sticker-upload",
            Self::RoleAdd => "role-add",
            Self::RoleRemove => "role-remove",
            Self::ChannelInfo => "channel-info",
            Self::ChannelList => "channel-list",
            Self::ChannelCreate => "channel-create",
            Self::ChannelEdit => "channel-edit",
            Self::ChannelDelete => "channel-delete",
            Self::ChannelMove => "channel-move",
            Self::CategoryCreate => "category-create",
            Self::CategoryEdit => "category-edit",
            Self::CategoryDelete => "category-delete",
            Self::VoiceStatus => "voice-status",
            Self::EventList => "event-list",
            Self::EventCreate => "event-create",
            Self::Timeout => "timeout",
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::SetPresence => "set-presence",
        }
    }
}

impl fmt::Display for MessageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageAction {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == trimmed)
            .ok_or_else(|| ActionError::validation(format!("unknown action: {trimmed}")))
    }
}

impl Serialize for MessageAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::collections::HashSet};

    #[test]
    fn names_are_unique_and_parse_back() {
        let names: HashSet<_> = MessageAction::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(names.len(), MessageAction::ALL.len());
        for action in MessageAction::ALL {
            assert_eq!(action.as_str().parse::<MessageAction>().unwrap(), *action);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "teleport".parse::<MessageAction>().unwrap_err();
        assert_eq!(err.to_string(), "unknown action: teleport");
        assert!("Send".parse::<MessageAction>().is_err());
    }

    #[test]
    fn serializes_as_wire_name() {
        assert_eq!(
            serde_json::to_value(MessageAction::SendWithEffect).unwrap(),
            serde_json::json!("sendWithEffect")
        );
    }
}
