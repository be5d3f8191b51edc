use std::{collections::BTreeMap, sync::Arc};

use {courier_config::CourierConfig, tracing::debug};

use crate::{
    Error, Result, config_plugin::ConfigChannelPlugin, directory::ChannelDirectory,
    plugin::ChannelPlugin,
};

/// Registry of all loaded channel plugins, keyed by channel id.
#[derive(Default)]
pub struct ChannelRegistry {
    plugins: BTreeMap<String, Arc<dyn ChannelPlugin>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a config-backed plugin for every enabled channel that lists
    /// static directory entries.
    pub fn from_config(config: &CourierConfig) -> Self {
        let mut registry = Self::new();
        for id in config.enabled_channels() {
            if let Some(channel) = config.channel(id)
                && !channel.directory.is_empty()
            {
                registry.register(Arc::new(ConfigChannelPlugin::new(id, channel)));
            }
        }
        registry
    }

    /// Register `plugin`, replacing any plugin with the same id.
    pub fn register(&mut self, plugin: Arc<dyn ChannelPlugin>) {
        let id = plugin.id().to_string();
        debug!(channel = %id, name = plugin.name(), "registered channel plugin");
        self.plugins.insert(id, plugin);
    }

    pub fn get(&self, id: &str) -> Option<&dyn ChannelPlugin> {
        self.plugins.get(id).map(|p| p.as_ref())
    }

    /// Plugin for `id`, or an `UnknownChannel` error.
    pub fn require(&self, id: &str) -> Result<&dyn ChannelPlugin> {
        self.get(id).ok_or_else(|| Error::unknown_channel(id))
    }

    pub fn directory(&self, id: &str) -> Option<&dyn ChannelDirectory> {
        self.get(id).and_then(|p| p.directory())
    }

    /// Registered channel ids, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare(&'static str);

    impl ChannelPlugin for Bare {
        fn id(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            "Bare"
        }
    }

    #[test]
    fn register_replaces_and_lists_sorted() {
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(Bare("slack")));
        registry.register(Arc::new(Bare("discord")));
        registry.register(Arc::new(Bare("slack")));
        assert_eq!(registry.list(), vec!["discord", "slack"]);
        assert!(registry.directory("slack").is_none());
    }

    #[test]
    fn require_reports_unknown_channel() {
        let registry = ChannelRegistry::new();
        let err = registry.require("matrix").err().unwrap();
        assert!(matches!(err, Error::UnknownChannel { ref channel } if channel == "matrix"));
    }

    #[test]
    fn from_config_registers_channels_with_directories() {
        let config: CourierConfig = serde_json::from_value(serde_json::json!({
            "channels": {
                "discord": { "directory": { "groups": [{ "id": "123456", "name": "general" }] } },
                "slack": {},
                "signal": { "enabled": false, "directory": { "peers": [{ "id": "+15551234567" }] } }
            }
        }))
        .unwrap();
        let registry = ChannelRegistry::from_config(&config);
        assert_eq!(registry.list(), vec!["discord"]);
        assert!(registry.directory("discord").is_some());
    }
}
