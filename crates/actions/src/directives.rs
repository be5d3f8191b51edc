//! Inline reply directives agents embed in message text.
//!
//! Recognised forms:
//! - `[[reply_to:<id>]]`: reply to a specific message
//! - `[[reply_to_current]]`: reply to the message being handled
//! - `[[audio_as_voice]]`: deliver audio media as a voice note
//! - a line starting with `MEDIA:`: attach the URL that follows
//!
//! Directives are removed from the text; unknown `[[...]]` tags are kept.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyDirectives {
    /// Message text with directives removed.
    pub text: String,
    pub reply_to_id: Option<String>,
    pub reply_to_current: bool,
    pub audio_as_voice: bool,
    pub media_urls: Vec<String>,
}

pub trait ReplyDirectiveParser: Send + Sync {
    fn parse(&self, text: &str, current_message_id: Option<&str>) -> ReplyDirectives;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDirectiveParser;

enum Tag {
    ReplyTo(String),
    ReplyToCurrent,
    AudioAsVoice,
}

fn parse_tag(inner: &str) -> Option<Tag> {
    let inner = inner.trim();
    if inner.eq_ignore_ascii_case("reply_to_current") {
        return Some(Tag::ReplyToCurrent);
    }
    if inner.eq_ignore_ascii_case("audio_as_voice") {
        return Some(Tag::AudioAsVoice);
    }
    let (name, value) = inner.split_once(':')?;
    let value = value.trim();
    (name.trim().eq_ignore_ascii_case("reply_to") && !value.is_empty())
        .then(|| Tag::ReplyTo(value.to_string()))
}

fn media_line(line: &str) -> Option<String> {
    let rest = line.trim_start();
    let head = rest.get(..6)?;
    if !head.eq_ignore_ascii_case("media:") {
        return None;
    }
    let url = rest[6..]
        .trim()
        .trim_matches(|c| matches!(c, '`' | '"' | '\''))
        .trim();
    (!url.is_empty()).then(|| url.to_string())
}

impl ReplyDirectiveParser for DefaultDirectiveParser {
    fn parse(&self, text: &str, current_message_id: Option<&str>) -> ReplyDirectives {
        let mut out = ReplyDirectives::default();

        let mut stripped = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("[[") {
            let Some(len) = rest[start + 2..].find("]]") else {
                break;
            };
            let inner = &rest[start + 2..start + 2 + len];
            let end = start + 2 + len + 2;
            stripped.push_str(&rest[..start]);
            match parse_tag(inner) {
                Some(Tag::ReplyTo(id)) => out.reply_to_id = Some(id),
                Some(Tag::ReplyToCurrent) => out.reply_to_current = true,
                Some(Tag::AudioAsVoice) => out.audio_as_voice = true,
                None => stripped.push_str(&rest[start..end]),
            }
            rest = &rest[end..];
        }
        stripped.push_str(rest);

        if out.reply_to_current && out.reply_to_id.is_none() {
            out.reply_to_id = current_message_id.map(str::to_string);
        }

        let mut kept = Vec::new();
        for line in stripped.lines() {
            match media_line(line) {
                Some(url) => out.media_urls.push(url),
                None => kept.push(line.trim_end()),
            }
        }
        out.text = kept.join("\n").trim().to_string();
        out
    }
}
