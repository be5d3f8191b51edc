//! TTL cache for directory snapshots.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    courier_channels::DirectoryKind,
    courier_config::CourierConfig,
    tracing::{debug, trace},
};

/// Directory snapshots expire 30 minutes after they were fetched.
pub const DIRECTORY_CACHE_TTL: Duration = Duration::from_millis(1_800_000);

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually advanced clock for deterministic expiry in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Which listing a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSource {
    /// The directory's default (possibly batched) listing.
    Cache,
    /// The on-demand live listing.
    Live,
}

impl CacheSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Live => "live",
        }
    }
}

/// Address of one cached snapshot.
///
/// Renders as `<channel>:<account|default>:<kind>:<cache|live>`; selective
/// invalidation matches on that rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub channel: String,
    pub account_id: Option<String>,
    pub kind: DirectoryKind,
    pub source: CacheSource,
}

impl CacheKey {
    pub fn new(
        channel: &str,
        account_id: Option<&str>,
        kind: DirectoryKind,
        source: CacheSource,
    ) -> Self {
        Self {
            channel: channel.to_string(),
            account_id: account_id
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            kind,
            source,
        }
    }

    #[must_use]
    pub fn with_source(&self, source: CacheSource) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    /// Key prefix covering every snapshot of a channel, or of one account on
    /// that channel.
    pub fn scope_prefix(channel: &str, account_id: Option<&str>) -> String {
        match account_id {
            Some(account) => format!("{channel}:{}:", account_segment(Some(account))),
            None => format!("{channel}:"),
        }
    }
}

fn account_segment(account_id: Option<&str>) -> &str {
    account_id
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or("default")
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.channel,
            account_segment(self.account_id.as_deref()),
            self.kind.as_str(),
            self.source.as_str()
        )
    }
}

struct CacheEntry<T> {
    value: T,
    fetched_at_ms: u64,
}

struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    /// Config the entries were fetched under; compared by identity.
    owner: Option<Weak<CourierConfig>>,
}

/// Process-wide cache of directory snapshots.
///
/// Entries expire a fixed TTL after they were fetched. Passing a different
/// config object than the previous call clears the cache first, so a reload
/// never serves directory data fetched under the old configuration.
pub struct DirectoryCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> Default for DirectoryCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> DirectoryCache<T> {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: DIRECTORY_CACHE_TTL,
            clock,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                owner: None,
            }),
        }
    }

    pub fn get(&self, key: &CacheKey, config: &Arc<CourierConfig>) -> Option<T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::sync_owner(&mut state, config);

        let key = key.to_string();
        let fetched_at_ms = state.entries.get(&key)?.fetched_at_ms;
        let age = self.clock.now_ms().saturating_sub(fetched_at_ms);
        if u128::from(age) > self.ttl.as_millis() {
            trace!(key = %key, age_ms = age, "directory cache entry expired");
            state.entries.remove(&key);
            return None;
        }
        state.entries.get(&key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &CacheKey, value: T, config: &Arc<CourierConfig>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::sync_owner(&mut state, config);
        state.entries.insert(key.to_string(), CacheEntry {
            value,
            fetched_at_ms: self.clock.now_ms(),
        });
    }

    /// Remove every entry whose rendered key matches `predicate`.
    pub fn clear_matching(&self, predicate: impl Fn(&str) -> bool) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.retain(|key, _| !predicate(key));
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sync_owner(state: &mut CacheState<T>, config: &Arc<CourierConfig>) {
        let same = state
            .owner
            .as_ref()
            .is_some_and(|owner| std::ptr::eq(owner.as_ptr(), Arc::as_ptr(config)));
        if same {
            return;
        }
        if !state.entries.is_empty() {
            debug!(
                dropped = state.entries.len(),
                "config changed, clearing directory cache"
            );
        }
        state.entries.clear();
        state.owner = Some(Arc::downgrade(config));
    }
}
