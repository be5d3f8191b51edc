use courier_channels::DirectoryEntry;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("target is required")]
    TargetRequired,

    #[error("unknown target \"{input}\" for {channel}")]
    UnknownTarget { channel: String, input: String },

    #[error(
        "ambiguous target \"{input}\" for {channel}; candidates: {}",
        describe_candidates(.candidates)
    )]
    AmbiguousTarget {
        channel: String,
        input: String,
        candidates: Vec<DirectoryEntry>,
    },

    #[error("directory lookup failed for {channel}: {source}")]
    Directory {
        channel: String,
        #[source]
        source: courier_channels::Error,
    },
}

impl ResolveError {
    #[must_use]
    pub fn unknown_target(channel: impl Into<String>, input: impl Into<String>) -> Self {
        Self::UnknownTarget {
            channel: channel.into(),
            input: input.into(),
        }
    }

    #[must_use]
    pub fn directory(channel: impl Into<String>, source: courier_channels::Error) -> Self {
        Self::Directory {
            channel: channel.into(),
            source,
        }
    }
}

fn describe_candidates(candidates: &[DirectoryEntry]) -> String {
    candidates
        .iter()
        .map(|entry| match entry.name.as_deref().or(entry.handle.as_deref()) {
            Some(label) => format!("{label} ({})", entry.id),
            None => entry.id.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguity_lists_candidates_in_order() {
        let err = ResolveError::AmbiguousTarget {
            channel: "slack".into(),
            input: "general".into(),
            candidates: vec![
                DirectoryEntry::group("C1").with_name("general"),
                DirectoryEntry::group("C2"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous target \"general\" for slack; candidates: general (C1), C2"
        );
    }
}
