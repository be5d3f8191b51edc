//! Peer and group directories.

use {
    async_trait::async_trait,
    courier_config::{ChannelDirectoryConfig, DirectoryEntryConfig},
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    User,
    Group,
}

impl DirectoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user or group as listed by a channel directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Platform-native identifier.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub kind: DirectoryKind,
}

impl DirectoryEntry {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            handle: None,
            kind: DirectoryKind::User,
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            handle: None,
            kind: DirectoryKind::Group,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }
}

/// Optional filter passed to directory listings.
#[derive(Debug, Clone, Default)]
pub struct DirectoryQuery {
    pub query: Option<String>,
    pub limit: Option<usize>,
}

/// List the peers and groups a channel account can reach.
///
/// Directories backed by a batched snapshot may also expose a live listing
/// that bypasses the snapshot; `has_live` advertises it.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn list_peers(
        &self,
        account_id: Option<&str>,
        query: &DirectoryQuery,
    ) -> Result<Vec<DirectoryEntry>>;

    async fn list_groups(
        &self,
        account_id: Option<&str>,
        query: &DirectoryQuery,
    ) -> Result<Vec<DirectoryEntry>>;

    fn has_live(&self) -> bool {
        false
    }

    async fn list_peers_live(
        &self,
        account_id: Option<&str>,
        query: &DirectoryQuery,
    ) -> Result<Vec<DirectoryEntry>> {
        self.list_peers(account_id, query).await
    }

    async fn list_groups_live(
        &self,
        account_id: Option<&str>,
        query: &DirectoryQuery,
    ) -> Result<Vec<DirectoryEntry>> {
        self.list_groups(account_id, query).await
    }
}

/// Dispatch to the listing for `kind`, snapshot or live.
pub async fn list_entries(
    directory: &dyn ChannelDirectory,
    kind: DirectoryKind,
    live: bool,
    account_id: Option<&str>,
    query: &DirectoryQuery,
) -> Result<Vec<DirectoryEntry>> {
    match (kind, live) {
        (DirectoryKind::User, false) => directory.list_peers(account_id, query).await,
        (DirectoryKind::User, true) => directory.list_peers_live(account_id, query).await,
        (DirectoryKind::Group, false) => directory.list_groups(account_id, query).await,
        (DirectoryKind::Group, true) => directory.list_groups_live(account_id, query).await,
    }
}

/// Directory serving the static entries from `channels.<id>.directory`.
#[derive(Debug, Clone, Default)]
pub struct ConfigDirectory {
    peers: Vec<DirectoryEntry>,
    groups: Vec<DirectoryEntry>,
}

impl ConfigDirectory {
    pub fn from_config(config: &ChannelDirectoryConfig) -> Self {
        let convert = |entries: &[DirectoryEntryConfig], kind: DirectoryKind| -> Vec<DirectoryEntry> {
            entries
                .iter()
                .filter(|e| !e.id.trim().is_empty())
                .map(|e| DirectoryEntry {
                    id: e.id.trim().to_string(),
                    name: e.name.clone(),
                    handle: e.handle.clone(),
                    kind,
                })
                .collect()
        };
        Self {
            peers: convert(config.peers.as_slice(), DirectoryKind::User),
            groups: convert(config.groups.as_slice(), DirectoryKind::Group),
        }
    }

    fn filter(entries: &[DirectoryEntry], query: &DirectoryQuery) -> Vec<DirectoryEntry> {
        let needle = query
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        let matches = |entry: &&DirectoryEntry| match needle.as_deref() {
            None => true,
            Some(needle) => [Some(&entry.id), entry.name.as_ref(), entry.handle.as_ref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle)),
        };
        entries
            .iter()
            .filter(matches)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ChannelDirectory for ConfigDirectory {
    async fn list_peers(
        &self,
        _account_id: Option<&str>,
        query: &DirectoryQuery,
    ) -> Result<Vec<DirectoryEntry>> {
        Ok(Self::filter(&self.peers, query))
    }

    async fn list_groups(
        &self,
        _account_id: Option<&str>,
        query: &DirectoryQuery,
    ) -> Result<Vec<DirectoryEntry>> {
        Ok(Self::filter(&self.groups, query))
    }
}
