use courier_config::ChannelConfig;

use crate::{
    directory::{ChannelDirectory, ConfigDirectory},
    plugin::{ChannelPlugin, ChannelType},
};

/// Directory-only plugin built from a channel's config entry.
///
/// Lets configured peers and groups resolve by name when no connector for the
/// channel is loaded.
pub struct ConfigChannelPlugin {
    id: String,
    name: String,
    directory: ConfigDirectory,
}

impl ConfigChannelPlugin {
    pub fn new(id: &str, config: &ChannelConfig) -> Self {
        let name = id
            .parse::<ChannelType>()
            .map(|ty| ty.label().to_string())
            .unwrap_or_else(|_| id.to_string());
        Self {
            id: id.to_string(),
            name,
            directory: ConfigDirectory::from_config(&config.directory),
        }
    }
}

impl ChannelPlugin for ConfigChannelPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn directory(&self) -> Option<&dyn ChannelDirectory> {
        Some(&self.directory)
    }
}
