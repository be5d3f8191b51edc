//! Free-text target resolution.

use std::sync::Arc;

use {
    courier_channels::{
        ChannelDirectory, ChannelRegistry, DirectoryEntry, DirectoryKind, DirectoryQuery,
        directory::list_entries, strip_target_prefixes, target_syntax,
    },
    courier_config::CourierConfig,
    serde::Serialize,
    tracing::{debug, trace},
};

use crate::{
    cache::{CacheKey, CacheSource, DirectoryCache},
    error::{ResolveError, Result},
};

/// What a resolved destination addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    User,
    Group,
    Channel,
}

impl TargetKind {
    /// Directory listing that holds destinations of this kind.
    pub fn directory_kind(self) -> DirectoryKind {
        match self {
            Self::User => DirectoryKind::User,
            Self::Group | Self::Channel => DirectoryKind::Group,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }
}

impl From<DirectoryKind> for TargetKind {
    fn from(kind: DirectoryKind) -> Self {
        match kind {
            DirectoryKind::User => Self::User,
            DirectoryKind::Group => Self::Group,
        }
    }
}

/// How a destination was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSource {
    /// Recognised as a platform identifier; no directory was consulted.
    Normalized,
    /// Matched a directory entry.
    Directory,
}

/// A canonical destination ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    pub to: String,
    pub kind: TargetKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    pub source: TargetSource,
}

/// Infer the kind from explicit prefixes and sigils.
///
/// `@name`, `<@id>` mentions and `user:` prefixes address a user; everything
/// else (`#name`, `<#id>`, `channel:`, `group:`, bare names) a group.
pub fn detect_target_kind(input: &str) -> TargetKind {
    let trimmed = input.trim();
    let is_user = trimmed.starts_with('@')
        || trimmed.starts_with("<@")
        || trimmed
            .get(..5)
            .is_some_and(|head| head.eq_ignore_ascii_case("user:"));
    if is_user {
        TargetKind::User
    } else {
        TargetKind::Group
    }
}

/// Kind reported for an identifier that skipped the directory.
fn kind_for_destination(to: &str, detected: TargetKind) -> TargetKind {
    let lower = to.to_ascii_lowercase();
    if lower.starts_with("channel:") {
        TargetKind::Channel
    } else if lower.starts_with("user:") {
        TargetKind::User
    } else {
        detected
    }
}

fn entry_matches(entry: &DirectoryEntry, query: &str) -> bool {
    [Some(entry.id.as_str()), entry.name.as_deref(), entry.handle.as_deref()]
        .into_iter()
        .flatten()
        .map(|candidate| strip_target_prefixes(candidate).to_lowercase())
        .any(|candidate| candidate == query || candidate.contains(query))
}

fn entry_label(entry: &DirectoryEntry) -> String {
    entry
        .name
        .clone()
        .or_else(|| entry.handle.clone())
        .unwrap_or_else(|| strip_target_prefixes(&entry.id).to_string())
}

/// Resolves targets against channel directories through a shared cache.
pub struct TargetResolver {
    registry: Arc<ChannelRegistry>,
    cache: Arc<DirectoryCache<Vec<DirectoryEntry>>>,
}

impl TargetResolver {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        cache: Arc<DirectoryCache<Vec<DirectoryEntry>>>,
    ) -> Self {
        Self { registry, cache }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Turn `input` into a canonical destination on `channel`.
    ///
    /// Identifier-shaped input never touches the directory. Anything else is
    /// matched against the cached directory listing; zero matches and several
    /// matches are both errors.
    pub async fn resolve(
        &self,
        config: &Arc<CourierConfig>,
        channel: &str,
        input: &str,
        account_id: Option<&str>,
        preferred_kind: Option<TargetKind>,
    ) -> Result<ResolvedTarget> {
        let input = input.split_whitespace().collect::<Vec<_>>().join(" ");
        if input.is_empty() {
            return Err(ResolveError::TargetRequired);
        }

        let kind = preferred_kind.unwrap_or_else(|| detect_target_kind(&input));
        let syntax = target_syntax(channel);
        let normalized = syntax
            .normalize(&input, kind.directory_kind())
            .unwrap_or_else(|| input.clone());

        if syntax.looks_like_id(&input, &normalized) {
            let to = syntax.preserve_case(&input, &normalized);
            let kind = kind_for_destination(&to, kind);
            debug!(channel, input = %input, to = %to, "target recognised as identifier");
            return Ok(ResolvedTarget {
                to,
                kind,
                display: None,
                source: TargetSource::Normalized,
            });
        }

        let query = strip_target_prefixes(&input).to_lowercase();
        if query.is_empty() {
            return Err(ResolveError::unknown_target(channel, input));
        }

        let entries = self
            .directory_entries(
                config,
                channel,
                account_id,
                kind.directory_kind(),
                config.directory.prefer_live_on_miss,
            )
            .await?;
        let matches: Vec<&DirectoryEntry> = entries
            .iter()
            .filter(|entry| entry_matches(entry, &query))
            .collect();

        match matches.as_slice() {
            [] => Err(ResolveError::unknown_target(channel, input)),
            [entry] => {
                let resolved = ResolvedTarget {
                    to: syntax.format_directory_target(entry),
                    kind: if kind == TargetKind::Channel {
                        TargetKind::Channel
                    } else {
                        entry.kind.into()
                    },
                    display: Some(entry_label(entry)),
                    source: TargetSource::Directory,
                };
                debug!(channel, input = %input, to = %resolved.to, "target resolved via directory");
                Ok(resolved)
            },
            many => Err(ResolveError::AmbiguousTarget {
                channel: channel.to_string(),
                input,
                candidates: many.iter().map(|entry| (*entry).clone()).collect(),
            }),
        }
    }

    /// Human label for an already-canonical target, from cached listings only.
    /// A cold cache fetches the snapshot listing; the live listing is never used.
    pub async fn lookup_display(
        &self,
        config: &Arc<CourierConfig>,
        channel: &str,
        target_id: &str,
        account_id: Option<&str>,
    ) -> Result<Option<String>> {
        let target_id = target_id.trim();
        if target_id.is_empty() {
            return Ok(None);
        }
        let kind = detect_target_kind(target_id).directory_kind();
        let entries = self
            .directory_entries(config, channel, account_id, kind, false)
            .await?;
        let needle = strip_target_prefixes(target_id);
        Ok(entries
            .iter()
            .find(|entry| strip_target_prefixes(&entry.id) == needle)
            .and_then(|entry| entry.name.clone().or_else(|| entry.handle.clone())))
    }

    /// Drop cached listings for one channel (optionally one account), or all.
    pub fn reset_directory_cache(&self, channel: Option<&str>, account_id: Option<&str>) {
        match channel {
            Some(channel) => {
                let prefix = CacheKey::scope_prefix(channel, account_id);
                debug!(prefix = %prefix, "resetting directory cache");
                self.cache.clear_matching(|key| key.starts_with(&prefix));
            },
            None => {
                debug!("resetting directory cache");
                self.cache.clear();
            },
        }
    }

    /// Full (unfiltered) listing for `kind`, cached. An empty snapshot
    /// escalates once to the live listing when allowed.
    async fn directory_entries(
        &self,
        config: &Arc<CourierConfig>,
        channel: &str,
        account_id: Option<&str>,
        kind: DirectoryKind,
        prefer_live: bool,
    ) -> Result<Vec<DirectoryEntry>> {
        let Some(directory) = self.registry.directory(channel) else {
            trace!(channel, "channel has no directory");
            return Ok(Vec::new());
        };

        let key = CacheKey::new(channel, account_id, kind, CacheSource::Cache);
        let entries = match self.cache.get(&key, config) {
            Some(cached) => {
                trace!(key = %key, "directory cache hit");
                cached
            },
            None => {
                let entries = fetch(directory, channel, kind, false, account_id).await?;
                self.cache.set(&key, entries.clone(), config);
                entries
            },
        };
        if !entries.is_empty() || !prefer_live || !directory.has_live() {
            return Ok(entries);
        }

        let live_key = key.with_source(CacheSource::Live);
        if let Some(cached) = self.cache.get(&live_key, config) {
            trace!(key = %live_key, "directory cache hit");
            return Ok(cached);
        }
        debug!(channel, kind = %kind, "directory snapshot empty, querying live listing");
        let live = fetch(directory, channel, kind, true, account_id).await?;
        self.cache.set(&live_key, live.clone(), config);
        Ok(live)
    }
}

async fn fetch(
    directory: &dyn ChannelDirectory,
    channel: &str,
    kind: DirectoryKind,
    live: bool,
    account_id: Option<&str>,
) -> Result<Vec<DirectoryEntry>> {
    list_entries(directory, kind, live, account_id, &DirectoryQuery::default())
        .await
        .map_err(|source| ResolveError::directory(channel, source))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::cache::ManualClock,
        async_trait::async_trait,
        courier_channels::ChannelPlugin,
        rstest::rstest,
        std::{
            sync::atomic::{AtomicUsize, Ordering},
            time::Duration,
        },
    };

    #[derive(Default)]
    struct FakeDirectory {
        peers: Vec<DirectoryEntry>,
        groups: Vec<DirectoryEntry>,
        live_groups: Option<Vec<DirectoryEntry>>,
        fail: bool,
        calls: AtomicUsize,
        live_calls: AtomicUsize,
    }

    #[async_trait]
    impl ChannelDirectory for FakeDirectory {
        async fn list_peers(
            &self,
            _account_id: Option<&str>,
            _query: &DirectoryQuery,
        ) -> courier_channels::Result<Vec<DirectoryEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.peers.clone())
        }

        async fn list_groups(
            &self,
            _account_id: Option<&str>,
            _query: &DirectoryQuery,
        ) -> courier_channels::Result<Vec<DirectoryEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(courier_channels::Error::unavailable("directory offline"));
            }
            Ok(self.groups.clone())
        }

        fn has_live(&self) -> bool {
            self.live_groups.is_some()
        }

        async fn list_groups_live(
            &self,
            _account_id: Option<&str>,
            _query: &DirectoryQuery,
        ) -> courier_channels::Result<Vec<DirectoryEntry>> {
            self.live_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.live_groups.clone().unwrap_or_default())
        }
    }

    struct FakePlugin {
        id: &'static str,
        directory: Arc<FakeDirectory>,
    }

    impl ChannelPlugin for FakePlugin {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn directory(&self) -> Option<&dyn ChannelDirectory> {
            Some(self.directory.as_ref())
        }
    }

    struct Harness {
        resolver: TargetResolver,
        directory: Arc<FakeDirectory>,
        clock: Arc<ManualClock>,
        config: Arc<CourierConfig>,
    }

    fn harness(channel: &'static str, directory: FakeDirectory) -> Harness {
        let directory = Arc::new(directory);
        let mut registry = ChannelRegistry::new();
        registry.register(Arc::new(FakePlugin {
            id: channel,
            directory: Arc::clone(&directory),
        }));
        let clock = Arc::new(ManualClock::new(0));
        let cache = Arc::new(DirectoryCache::with_clock(clock.clone()));
        Harness {
            resolver: TargetResolver::new(Arc::new(registry), cache),
            directory,
            clock,
            config: Arc::new(CourierConfig::default()),
        }
    }

    fn slack_groups() -> FakeDirectory {
        FakeDirectory {
            groups: vec![
                DirectoryEntry::group("C0123ABCD").with_name("general"),
                DirectoryEntry::group("C0456EFGH").with_name("random"),
            ],
            peers: vec![DirectoryEntry::user("U0456EFGH").with_name("Alice")],
            ..Default::default()
        }
    }

    impl Harness {
        async fn resolve(&self, channel: &str, input: &str) -> Result<ResolvedTarget> {
            self.resolver
                .resolve(&self.config, channel, input, None, None)
                .await
        }

        fn calls(&self) -> usize {
            self.directory.calls.load(Ordering::SeqCst)
        }
    }

    #[rstest]
    #[case("@alice", TargetKind::User)]
    #[case("<@!123456>", TargetKind::User)]
    #[case("USER:U123", TargetKind::User)]
    #[case("#general", TargetKind::Group)]
    #[case("channel:123", TargetKind::Group)]
    #[case("general", TargetKind::Group)]
    fn kind_detection(#[case] input: &str, #[case] expected: TargetKind) {
        assert_eq!(detect_target_kind(input), expected);
    }

    #[tokio::test]
    async fn identifiers_skip_the_directory() {
        let h = harness("discord", FakeDirectory::default());
        let resolved = h.resolve("discord", "123456789").await.unwrap();
        assert_eq!(resolved.source, TargetSource::Normalized);
        assert_eq!(resolved.to, "channel:123456789");
        assert_eq!(resolved.kind, TargetKind::Channel);
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn slack_identifier_keeps_original_case() {
        let h = harness("slack", slack_groups());
        let resolved = h.resolve("slack", "#C0123ABCD").await.unwrap();
        assert_eq!(resolved.to, "channel:C0123ABCD");
        assert_eq!(resolved.kind, TargetKind::Channel);
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn names_resolve_through_the_directory() {
        let h = harness("discord", FakeDirectory {
            groups: vec![DirectoryEntry::group("555555555").with_name("general")],
            ..Default::default()
        });
        let resolved = h.resolve("discord", "#general").await.unwrap();
        assert_eq!(resolved.to, "channel:555555555");
        assert_eq!(resolved.kind, TargetKind::Group);
        assert_eq!(resolved.source, TargetSource::Directory);
        assert_eq!(resolved.display.as_deref(), Some("general"));
    }

    #[tokio::test]
    async fn user_sigil_searches_peers() {
        let h = harness("slack", slack_groups());
        let resolved = h.resolve("slack", "@alice").await.unwrap();
        assert_eq!(resolved.to, "user:U0456EFGH");
        assert_eq!(resolved.kind, TargetKind::User);
    }

    #[tokio::test]
    async fn repeated_resolution_fetches_once() {
        let h = harness("slack", slack_groups());
        for _ in 0..3 {
            h.resolve("slack", "general").await.unwrap();
        }
        assert_eq!(h.calls(), 1);
    }

    #[tokio::test]
    async fn listings_refetch_after_ttl() {
        let h = harness("slack", slack_groups());
        h.resolve("slack", "general").await.unwrap();
        h.clock.advance(Duration::from_secs(29 * 60));
        h.resolve("slack", "random").await.unwrap();
        assert_eq!(h.calls(), 1);
        h.clock.advance(Duration::from_secs(2 * 60));
        h.resolve("slack", "general").await.unwrap();
        assert_eq!(h.calls(), 2);
    }

    #[tokio::test]
    async fn config_swap_forces_refetch() {
        let mut h = harness("slack", slack_groups());
        h.resolve("slack", "general").await.unwrap();
        h.config = Arc::new(CourierConfig::default());
        h.resolve("slack", "general").await.unwrap();
        assert_eq!(h.calls(), 2);
    }

    #[tokio::test]
    async fn ambiguous_matches_keep_directory_order() {
        let h = harness("slack", FakeDirectory {
            groups: vec![
                DirectoryEntry::group("C0000000B").with_name("general-b"),
                DirectoryEntry::group("C0000000A").with_name("general-a"),
                DirectoryEntry::group("C0000000C").with_name("random"),
            ],
            ..Default::default()
        });
        let err = h.resolve("slack", "general").await.unwrap_err();
        let ResolveError::AmbiguousTarget { candidates, .. } = err else {
            panic!("expected ambiguity, got {err}");
        };
        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C0000000B", "C0000000A"]);
    }

    #[rstest]
    #[case("")]
    #[case("   \n ")]
    #[tokio::test]
    async fn blank_input_is_required_error(#[case] input: &str) {
        let h = harness("slack", slack_groups());
        assert!(matches!(
            h.resolve("slack", input).await,
            Err(ResolveError::TargetRequired)
        ));
    }

    #[tokio::test]
    async fn no_match_is_unknown_target() {
        let h = harness("slack", slack_groups());
        let err = h.resolve("slack", "engineering").await.unwrap_err();
        assert!(matches!(err, ResolveError::UnknownTarget { ref input, .. } if input == "engineering"));
    }

    #[tokio::test]
    async fn channel_without_directory_is_unknown_target() {
        let h = harness("slack", slack_groups());
        let err = h.resolve("discord", "general").await.unwrap_err();
        assert!(matches!(err, ResolveError::UnknownTarget { ref channel, .. } if channel == "discord"));
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn plugin_channel_accepts_any_target() {
        let h = harness("slack", slack_groups());
        let resolved = h.resolve("matrix", "general").await.unwrap();
        assert_eq!(resolved.to, "general");
        assert_eq!(resolved.source, TargetSource::Normalized);
        assert_eq!(h.calls(), 0);
    }

    #[tokio::test]
    async fn directory_errors_propagate() {
        let h = harness("slack", FakeDirectory {
            fail: true,
            ..Default::default()
        });
        let err = h.resolve("slack", "general").await.unwrap_err();
        assert!(matches!(err, ResolveError::Directory { ref channel, .. } if channel == "slack"));
    }

    #[tokio::test]
    async fn empty_snapshot_escalates_to_live_once() {
        let h = harness("slack", FakeDirectory {
            live_groups: Some(vec![DirectoryEntry::group("C0999ZZZZ").with_name("ops")]),
            ..Default::default()
        });
        let resolved = h.resolve("slack", "ops").await.unwrap();
        assert_eq!(resolved.to, "channel:C0999ZZZZ");
        assert_eq!(h.calls(), 1);
        assert_eq!(h.directory.live_calls.load(Ordering::SeqCst), 1);

        h.resolve("slack", "ops").await.unwrap();
        assert_eq!(h.calls(), 1);
        assert_eq!(h.directory.live_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn escalation_respects_config() {
        let mut h = harness("slack", FakeDirectory {
            live_groups: Some(vec![DirectoryEntry::group("C0999ZZZZ").with_name("ops")]),
            ..Default::default()
        });
        let mut config = CourierConfig::default();
        config.directory.prefer_live_on_miss = false;
        h.config = Arc::new(config);
        assert!(h.resolve("slack", "ops").await.is_err());
        assert_eq!(h.directory.live_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lookup_display_uses_cached_listing() {
        let h = harness("slack", slack_groups());
        let label = h
            .resolver
            .lookup_display(&h.config, "slack", "channel:C0123ABCD", None)
            .await
            .unwrap();
        assert_eq!(label.as_deref(), Some("general"));
        let missing = h
            .resolver
            .lookup_display(&h.config, "slack", "C9999XXXX", None)
            .await
            .unwrap();
        assert_eq!(missing, None);
        assert_eq!(h.calls(), 1);
    }

    #[tokio::test]
    async fn reset_forces_refetch_for_scope() {
        let h = harness("slack", slack_groups());
        h.resolve("slack", "general").await.unwrap();
        h.resolver.reset_directory_cache(Some("discord"), None);
        h.resolve("slack", "general").await.unwrap();
        assert_eq!(h.calls(), 1);

        h.resolver.reset_directory_cache(Some("slack"), Some("default"));
        h.resolve("slack", "general").await.unwrap();
        assert_eq!(h.calls(), 2);

        h.resolver.reset_directory_cache(None, None);
        h.resolve("slack", "general").await.unwrap();
        assert_eq!(h.calls(), 3);
    }
}
