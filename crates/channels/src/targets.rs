//! Per-platform target syntax.
//!
//! Every platform spells destinations differently: Discord uses numeric
//! snowflakes and `<@id>` mentions, Slack uses upper-case codes, WhatsApp uses
//! phone-derived JIDs, and so on. A [`TargetSyntax`] captures one platform's
//! rules as pure functions; [`target_syntax`] looks up the rules for a channel
//! id. Channels without dedicated rules accept any non-empty string as an
//! identifier.

use crate::{
    directory::{DirectoryEntry, DirectoryKind},
    plugin::ChannelType,
};

/// Identifier rules for one platform.
pub trait TargetSyntax: Send + Sync {
    /// Rewrite user input into the platform's canonical spelling.
    ///
    /// `None` means the input is not in a shape this platform recognises; the
    /// caller then keeps the raw string.
    fn normalize(&self, _raw: &str, _kind: DirectoryKind) -> Option<String> {
        None
    }

    /// Whether the input is already a precise platform identifier, in which
    /// case no directory lookup is needed.
    fn looks_like_id(&self, raw: &str, normalized: &str) -> bool;

    /// Final destination for an identifier-shaped input.
    fn preserve_case(&self, _raw: &str, normalized: &str) -> String {
        normalized.to_string()
    }

    /// Destination for an entry found through the directory.
    fn format_directory_target(&self, entry: &DirectoryEntry) -> String {
        entry.id.clone()
    }
}

/// Rules for `channel`, falling back to permissive rules for plugin channels.
pub fn target_syntax(channel: &str) -> &'static dyn TargetSyntax {
    match channel.parse::<ChannelType>() {
        Ok(ChannelType::Discord) => &DiscordTargets,
        Ok(ChannelType::Slack) => &SlackTargets,
        Ok(ChannelType::Telegram) => &TelegramTargets,
        Ok(ChannelType::Whatsapp) => &WhatsappTargets,
        Ok(ChannelType::MsTeams) => &MsTeamsTargets,
        Ok(ChannelType::Signal) => &SignalTargets,
        Ok(ChannelType::IMessage) => &IMessageTargets,
        Ok(ChannelType::GoogleChat) => &GoogleChatTargets,
        Err(_) => &AnyTargets,
    }
}

/// Strip one `channel:`/`group:`/`user:` prefix and one leading `#`/`@`.
pub fn strip_target_prefixes(value: &str) -> &str {
    let trimmed = value.trim();
    let unprefixed = ["channel:", "group:", "user:"]
        .iter()
        .find_map(|p| strip_prefix_ci(trimmed, p))
        .unwrap_or(trimmed)
        .trim_start();
    unprefixed
        .strip_prefix('#')
        .or_else(|| unprefixed.strip_prefix('@'))
        .unwrap_or(unprefixed)
        .trim()
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// ASCII case-insensitive `strip_prefix`.
fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// Drop any of the given scheme prefixes (e.g. `discord:`).
fn strip_schemes<'a>(value: &'a str, schemes: &[&str]) -> &'a str {
    schemes
        .iter()
        .find_map(|s| strip_prefix_ci(value, s))
        .unwrap_or(value)
        .trim()
}

fn is_digits(value: &str, min_len: usize) -> bool {
    value.len() >= min_len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Phone number in loose notation → `+<digits>` (7–15 digits).
fn normalize_phone(value: &str) -> Option<String> {
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    (is_digits(digits, 7) && digits.len() <= 15).then(|| format!("+{digits}"))
}

fn is_uuid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// `<@123>`, `<@!123>` or `<#123>`; returns the sigil and the id.
fn parse_mention(value: &str) -> Option<(char, &str)> {
    let inner = value.strip_prefix('<')?.strip_suffix('>')?;
    // Slack mentions may carry a display label: `<@U123|alice>`.
    let inner = inner.split('|').next().unwrap_or(inner);
    if let Some(id) = inner.strip_prefix("@!").or_else(|| inner.strip_prefix('@')) {
        return (!id.is_empty()).then_some(('@', id));
    }
    inner
        .strip_prefix('#')
        .filter(|id| !id.is_empty())
        .map(|id| ('#', id))
}

/// `user:`/`channel:` prefix for an entry id, unless it already has one.
fn prefixed_entry_id(entry: &DirectoryEntry) -> String {
    let lower = entry.id.to_ascii_lowercase();
    if ["user:", "channel:", "group:"]
        .iter()
        .any(|p| lower.starts_with(p))
    {
        return entry.id.clone();
    }
    match entry.kind {
        DirectoryKind::User => format!("user:{}", entry.id),
        DirectoryKind::Group => format!("channel:{}", entry.id),
    }
}

fn kind_prefix(kind: DirectoryKind) -> &'static str {
    match kind {
        DirectoryKind::User => "user",
        DirectoryKind::Group => "channel",
    }
}

// ── Discord ─────────────────────────────────────────────────────────────────

/// Numeric snowflakes, `<@id>`/`<#id>` mentions, `user:`/`channel:` prefixes.
pub struct DiscordTargets;

impl TargetSyntax for DiscordTargets {
    fn normalize(&self, raw: &str, kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["discord:"]);
        if let Some((sigil, id)) = parse_mention(value) {
            let prefix = if sigil == '@' { "user" } else { "channel" };
            return Some(format!("{prefix}:{id}"));
        }
        for prefix in ["user", "channel"] {
            if let Some(id) = strip_prefix_ci(value, &format!("{prefix}:")) {
                return Some(format!("{prefix}:{}", id.trim()));
            }
        }
        if let Some(id) = value.strip_prefix('@').filter(|id| is_digits(id, 1)) {
            return Some(format!("user:{id}"));
        }
        if let Some(id) = value.strip_prefix('#').filter(|id| is_digits(id, 1)) {
            return Some(format!("channel:{id}"));
        }
        is_digits(value, 1).then(|| format!("{}:{value}", kind_prefix(kind)))
    }

    fn looks_like_id(&self, raw: &str, normalized: &str) -> bool {
        parse_mention(raw.trim()).is_some() || is_digits(strip_target_prefixes(normalized), 6)
    }

    fn format_directory_target(&self, entry: &DirectoryEntry) -> String {
        prefixed_entry_id(entry)
    }
}

// ── Slack ───────────────────────────────────────────────────────────────────

/// Upper-case conversation/user codes (`C0123ABCD`, `U0456EFGH`).
pub struct SlackTargets;

impl SlackTargets {
    fn is_code(value: &str) -> bool {
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        matches!(first.to_ascii_uppercase(), 'C' | 'D' | 'G' | 'U' | 'W')
            && value.len() >= 9
            && value.chars().all(|c| c.is_ascii_alphanumeric())
            && value.chars().any(|c| c.is_ascii_digit())
    }
}

impl TargetSyntax for SlackTargets {
    fn normalize(&self, raw: &str, kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["slack:"]);
        let (prefix, id) = if let Some((sigil, id)) = parse_mention(value) {
            (if sigil == '@' { "user" } else { "channel" }, id)
        } else if let Some(id) = strip_prefix_ci(value, "user:") {
            ("user", id)
        } else if let Some(id) = strip_prefix_ci(value, "channel:") {
            ("channel", id)
        } else if let Some(id) = value.strip_prefix('@') {
            ("user", id)
        } else if let Some(id) = value.strip_prefix('#') {
            ("channel", id)
        } else if Self::is_code(value) {
            (kind_prefix(kind), value)
        } else {
            return None;
        };
        let id = id.trim();
        (!id.is_empty()).then(|| format!("{prefix}:{}", id.to_lowercase()))
    }

    fn looks_like_id(&self, raw: &str, normalized: &str) -> bool {
        parse_mention(raw.trim()).is_some() || Self::is_code(strip_target_prefixes(normalized))
    }

    /// Slack ids are case-sensitive, so the raw spelling wins over the
    /// lower-cased normal form.
    fn preserve_case(&self, raw: &str, _normalized: &str) -> String {
        let trimmed = strip_schemes(raw.trim(), &["slack:"]);
        if let Some((sigil, id)) = parse_mention(trimmed) {
            let prefix = if sigil == '@' { "user" } else { "channel" };
            return format!("{prefix}:{id}");
        }
        if strip_prefix_ci(trimmed, "channel:").is_some() || strip_prefix_ci(trimmed, "user:").is_some()
        {
            return trimmed.to_string();
        }
        if let Some(id) = trimmed.strip_prefix('#') {
            return format!("channel:{}", id.trim());
        }
        if let Some(id) = trimmed.strip_prefix('@') {
            return format!("user:{}", id.trim());
        }
        trimmed.to_string()
    }

    fn format_directory_target(&self, entry: &DirectoryEntry) -> String {
        prefixed_entry_id(entry)
    }
}

// ── Telegram ────────────────────────────────────────────────────────────────

/// Numeric chat ids (negative for groups) and `@username` handles.
pub struct TelegramTargets;

impl TelegramTargets {
    fn is_handle(value: &str) -> bool {
        let Some(name) = value.strip_prefix('@') else {
            return false;
        };
        name.len() >= 5
            && name.starts_with(|c: char| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl TargetSyntax for TelegramTargets {
    fn normalize(&self, raw: &str, _kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["telegram:", "tg:"]);
        let link = ["https://t.me/", "http://t.me/", "t.me/"]
            .iter()
            .find_map(|p| strip_prefix_ci(value, p));
        if let Some(name) = link {
            let name = name.trim_end_matches('/');
            return (!name.is_empty()).then(|| format!("@{name}"));
        }
        Some(value.to_string())
    }

    fn looks_like_id(&self, _raw: &str, normalized: &str) -> bool {
        let digits = normalized.strip_prefix('-').unwrap_or(normalized);
        is_digits(digits, 6) || Self::is_handle(normalized)
    }
}

// ── WhatsApp ────────────────────────────────────────────────────────────────

/// Phone numbers and JIDs (`123@s.whatsapp.net`, `123-456@g.us`).
pub struct WhatsappTargets;

impl TargetSyntax for WhatsappTargets {
    fn normalize(&self, raw: &str, _kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["whatsapp:", "wa:"]);
        if value.find('@').is_some_and(|at| at > 0) {
            return Some(value.to_ascii_lowercase());
        }
        normalize_phone(value)
    }

    fn looks_like_id(&self, _raw: &str, normalized: &str) -> bool {
        normalized.find('@').is_some_and(|at| at > 0) || normalize_phone(normalized).is_some()
    }
}

// ── Microsoft Teams ─────────────────────────────────────────────────────────

/// Conversation, user, and thread tokens.
pub struct MsTeamsTargets;

impl TargetSyntax for MsTeamsTargets {
    fn normalize(&self, raw: &str, _kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["msteams:", "teams:"]);
        for prefix in ["conversation:", "user:"] {
            if let Some(id) = strip_prefix_ci(value, prefix) {
                return Some(format!("{prefix}{}", id.trim()));
            }
        }
        Some(value.to_string())
    }

    fn looks_like_id(&self, _raw: &str, normalized: &str) -> bool {
        let prefixed = ["conversation:", "user:"]
            .iter()
            .find_map(|p| normalized.strip_prefix(p))
            .is_some_and(|id| !id.is_empty());
        prefixed
            || ["19:", "29:", "8:orgid:", "a:"]
                .iter()
                .any(|p| normalized.starts_with(p))
            || normalized.contains("@thread.")
    }
}

// ── Signal ──────────────────────────────────────────────────────────────────

/// Phone numbers, `group:`/`username:` prefixes, and account UUIDs.
pub struct SignalTargets;

impl TargetSyntax for SignalTargets {
    fn normalize(&self, raw: &str, _kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["signal:"]);
        if let Some(name) = strip_prefix_ci(value, "u:") {
            return Some(format!("username:{}", name.trim()));
        }
        for prefix in ["group:", "username:", "uuid:"] {
            if let Some(id) = strip_prefix_ci(value, prefix) {
                return Some(format!("{prefix}{}", id.trim()));
            }
        }
        normalize_phone(value).or_else(|| Some(value.to_string()))
    }

    fn looks_like_id(&self, _raw: &str, normalized: &str) -> bool {
        ["group:", "username:", "uuid:"]
            .iter()
            .any(|p| normalized.strip_prefix(p).is_some_and(|id| !id.is_empty()))
            || normalize_phone(normalized).is_some()
            || is_uuid(normalized)
    }
}

// ── iMessage ────────────────────────────────────────────────────────────────

/// Chat handles, phone numbers, and email addresses.
pub struct IMessageTargets;

impl IMessageTargets {
    const CHAT_PREFIXES: [&'static str; 3] = ["chat_id:", "chat_guid:", "chat_identifier:"];

    fn is_email(value: &str) -> bool {
        value
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
    }
}

impl TargetSyntax for IMessageTargets {
    fn normalize(&self, raw: &str, _kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["imessage:", "imsg:"]);
        for prefix in Self::CHAT_PREFIXES {
            if let Some(id) = strip_prefix_ci(value, prefix) {
                return Some(format!("{prefix}{}", id.trim()));
            }
        }
        if Self::is_email(value) {
            return Some(value.to_ascii_lowercase());
        }
        normalize_phone(value)
    }

    fn looks_like_id(&self, _raw: &str, normalized: &str) -> bool {
        Self::CHAT_PREFIXES
            .iter()
            .any(|p| normalized.strip_prefix(p).is_some_and(|id| !id.is_empty()))
            || Self::is_email(normalized)
            || normalize_phone(normalized).is_some()
    }
}

// ── Google Chat ─────────────────────────────────────────────────────────────

/// `spaces/<id>` and `users/<id>` resource names.
pub struct GoogleChatTargets;

impl TargetSyntax for GoogleChatTargets {
    fn normalize(&self, raw: &str, _kind: DirectoryKind) -> Option<String> {
        let value = strip_schemes(raw.trim(), &["googlechat:", "gchat:"]);
        for prefix in ["spaces/", "users/"] {
            if let Some(id) = strip_prefix_ci(value, prefix) {
                return Some(format!("{prefix}{}", id.trim()));
            }
        }
        None
    }

    fn looks_like_id(&self, _raw: &str, normalized: &str) -> bool {
        ["spaces/", "users/"]
            .iter()
            .any(|p| normalized.strip_prefix(p).is_some_and(|id| !id.is_empty()))
    }
}

// ── Fallback ────────────────────────────────────────────────────────────────

/// Channels without dedicated rules: any non-empty input is an identifier.
pub struct AnyTargets;

impl TargetSyntax for AnyTargets {
    fn looks_like_id(&self, _raw: &str, normalized: &str) -> bool {
        !normalized.trim().is_empty()
    }
}
