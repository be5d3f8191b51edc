//! Pick the channel a request is addressed to.

use courier_config::CourierConfig;

use crate::{Error, Result, plugin::ChannelType};

/// Channel/account selection.
pub trait ChannelSelector: Send + Sync {
    /// The single channel a request applies to: the hint when given, else the
    /// only configured channel. Missing or ambiguous configuration fails.
    fn resolve_channel(&self, config: &CourierConfig, hint: Option<&str>) -> Result<String>;

    /// Every channel a broadcast fans out to, in a stable order.
    fn configured_channels(&self, config: &CourierConfig) -> Vec<String>;
}

/// Lower-case a channel id and expand short aliases.
pub fn normalize_channel_id(raw: &str) -> String {
    let id = raw.trim().to_ascii_lowercase();
    match id.as_str() {
        "tg" => "telegram".into(),
        "teams" | "ms-teams" => "msteams".into(),
        "wa" => "whatsapp".into(),
        "imsg" => "imessage".into(),
        "gchat" | "google-chat" => "googlechat".into(),
        _ => id,
    }
}

/// Selection driven by the `channels` config section.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigChannelSelector;

impl ChannelSelector for ConfigChannelSelector {
    fn resolve_channel(&self, config: &CourierConfig, hint: Option<&str>) -> Result<String> {
        if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
            let id = normalize_channel_id(hint);
            return match config.channel(&id) {
                Some(channel) if !channel.enabled => {
                    Err(Error::selection(format!("channel {id} is disabled")))
                },
                Some(_) => Ok(id),
                None if id.parse::<ChannelType>().is_ok() => Ok(id),
                None => Err(Error::unknown_channel(id)),
            };
        }

        let configured = self.configured_channels(config);
        match configured.as_slice() {
            [only] => Ok(only.clone()),
            [] => Err(Error::selection(
                "no channels configured; set `channel` explicitly",
            )),
            many => Err(Error::selection(format!(
                "multiple channels configured ({}); set `channel` explicitly",
                many.join(", ")
            ))),
        }
    }

    fn configured_channels(&self, config: &CourierConfig) -> Vec<String> {
        config.enabled_channels().map(str::to_string).collect()
    }
}
