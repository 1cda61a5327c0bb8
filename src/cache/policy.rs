//! Eviction policies for [`ResultCache`](super::ResultCache).
//!
//! Exactly one policy is active per cache. Both scan every entry (O(n));
//! capacity is bounded by configuration, not by codebase size.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::result::CacheEntry;

/// Default window during which a just-accessed entry cannot be evicted under
/// [`EvictionPolicy::AccessPattern`].
pub const DEFAULT_PROTECT_WINDOW: Duration = Duration::from_secs(60);

const NANOS_PER_HOUR: f64 = 3_600_000_000_000.0;

/// Which entry to drop when the cache is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Evict the entry with the oldest last access.
    #[default]
    LeastRecentlyAccessed,

    /// Evict the entry with the lowest `access_count / hours_since_last_access`.
    ///
    /// Entries accessed within `protect_window` are never chosen unless every
    /// entry is protected, in which case the least recently accessed entry is
    /// evicted so the insertion can proceed.
    AccessPattern { protect_window: Duration },
}

impl EvictionPolicy {
    /// Access-pattern policy with the default protection window.
    pub fn access_pattern() -> Self {
        EvictionPolicy::AccessPattern {
            protect_window: DEFAULT_PROTECT_WINDOW,
        }
    }

    /// Short name for logs, metrics labels and configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            EvictionPolicy::LeastRecentlyAccessed => "lru",
            EvictionPolicy::AccessPattern { .. } => "access_pattern",
        }
    }

    /// Pick the key to evict. `now_nanos` is measured from the owning cache's epoch.
    pub(crate) fn select_victim<'a, V: 'a>(
        &self,
        entries: impl Iterator<Item = (&'a String, &'a CacheEntry<V>)>,
        now_nanos: u64,
    ) -> Option<&'a String> {
        match *self {
            EvictionPolicy::LeastRecentlyAccessed => entries
                .min_by_key(|(_, entry)| entry.recency())
                .map(|(key, _)| key),
            EvictionPolicy::AccessPattern { protect_window } => entries
                .map(|(key, entry)| {
                    let idle = Duration::from_nanos(
                        now_nanos.saturating_sub(entry.last_accessed_nanos()),
                    );
                    let score = access_score(entry.access_count(), idle, protect_window);
                    (key, score, entry.recency())
                })
                .min_by(|a, b| match a.1.total_cmp(&b.1) {
                    Ordering::Equal => a.2.cmp(&b.2),
                    other => other,
                })
                .map(|(key, _, _)| key),
        }
    }
}

/// Access-frequency score: hits per hour of idleness. Higher = more worth keeping.
pub(crate) fn access_score(access_count: u64, idle: Duration, protect_window: Duration) -> f64 {
    if idle < protect_window || idle.is_zero() {
        return f64::INFINITY;
    }
    let hours = idle.as_nanos() as f64 / NANOS_PER_HOUR;
    access_count as f64 / hours
}
