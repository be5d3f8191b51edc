//! Semantic checks on a loaded configuration.
//!
//! Parsing already rejects malformed files; these checks catch settings that
//! parse fine but cannot work at runtime.

use crate::schema::CourierConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "channels.slack.default_account"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a parsed configuration.
#[must_use]
pub fn validate(config: &CourierConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (id, channel) in &config.channels {
        if id.trim().is_empty() || id.chars().any(|c| c.is_ascii_uppercase() || c == ':') {
            result.push(
                Severity::Error,
                format!("channels.{id}"),
                "channel ids must be lowercase and must not contain ':'",
            );
        }
        if let Some(default_account) = channel.default_account.as_deref()
            && !channel.accounts.is_empty()
            && !channel.accounts.contains_key(default_account)
        {
            result.push(
                Severity::Error,
                format!("channels.{id}.default_account"),
                format!("account '{default_account}' is not listed under accounts"),
            );
        }
        for (kind, entries) in [
            ("peers", &channel.directory.peers),
            ("groups", &channel.directory.groups),
        ] {
            for (idx, entry) in entries.iter().enumerate() {
                if entry.id.trim().is_empty() {
                    result.push(
                        Severity::Error,
                        format!("channels.{id}.directory.{kind}[{idx}].id"),
                        "directory entries need a non-empty id",
                    );
                }
            }
        }
    }

    let broadcast = &config.tools.message.broadcast;
    if broadcast.enabled && broadcast.concurrency == 0 {
        result.push(
            Severity::Warning,
            "tools.message.broadcast.concurrency",
            "concurrency 0 is treated as 1",
        );
    }
    if config.enabled_channels().next().is_none() {
        result.push(
            Severity::Warning,
            "channels",
            "no enabled channels; every action will fail channel selection",
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> CourierConfig {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn clean_config_has_no_errors() {
        let cfg = parse(
            r#"
            [channels.slack]
            default_account = "work"
            accounts = { work = {} }
            "#,
        );
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn unknown_default_account_is_an_error() {
        let cfg = parse(
            r#"
            [channels.slack]
            default_account = "home"
            accounts = { work = {} }
            "#,
        );
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "channels.slack.default_account");
    }

    #[test]
    fn empty_directory_id_and_uppercase_channel() {
        let cfg = parse(
            r#"
            [[channels.Discord.directory.peers]]
            id = " "
            "#,
        );
        let paths: Vec<_> = validate(&cfg)
            .diagnostics
            .into_iter()
            .map(|d| d.path)
            .collect();
        assert!(paths.contains(&"channels.Discord".to_string()));
        assert!(paths.contains(&"channels.Discord.directory.peers[0].id".to_string()));
    }

    #[test]
    fn no_channels_warns() {
        let result = validate(&CourierConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    }
}
