//! Resolve free-text message targets into canonical channel destinations.
//!
//! Resolution order:
//! 1. Platform identifier heuristics (no directory round trip)
//! 2. Directory lookup through a TTL cache, with a single live re-query when
//!    the cached snapshot is empty
//! 3. Fuzzy match on id, name, and handle; ambiguity is an error, never a guess

pub mod cache;
pub mod error;
pub mod resolve;

pub use {
    cache::{CacheKey, CacheSource, Clock, DIRECTORY_CACHE_TTL, DirectoryCache, ManualClock, SystemClock},
    error::{ResolveError, Result},
    resolve::{ResolvedTarget, TargetKind, TargetResolver, TargetSource, detect_target_kind},
};
