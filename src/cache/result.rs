//! Bounded TTL cache for analysis results.
//!
//! [`ResultCache`] keeps recently computed results under a hard capacity
//! ceiling. Entries expire lazily: an entry older than the TTL stays in the
//! map until the next `get` for its key notices and removes it (or until it
//! is evicted). Nothing sweeps in the background.
//!
//! # Locking
//!
//! One cache-wide `RwLock`. Mutations (`put`, `remove`, `clear`,
//! `invalidate_*`) take it exclusively; `get` and `statistics` share it.
//! Per-entry access bookkeeping is atomic so hits never need the write lock.
//! Only the removal of an expired entry upgrades to the write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::policy::EvictionPolicy;
use crate::telemetry;
use crate::traits::SettingsProvider;
use crate::types::CachedAnalysis;
use crate::{AugurError, Result};

/// Cache holding coordinator results.
pub type AnalysisCache = ResultCache<CachedAnalysis>;

/// Configuration for a [`ResultCache`].
///
/// ```rust
/// # use augur::cache::{CacheConfig, EvictionPolicy};
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600))
///     .policy(EvictionPolicy::access_pattern());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries. Default: 1,000.
    pub max_entries: usize,
    /// Time-to-live, measured from insertion. Default: 1 hour.
    pub ttl: Duration,
    /// When false, `put` is a no-op. Default: true.
    pub enabled: bool,
    /// Eviction policy. Default: least recently accessed.
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
            enabled: true,
            policy: EvictionPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the cache-related settings.
    pub fn from_settings(settings: &dyn SettingsProvider) -> Self {
        Self {
            max_entries: settings.cache_max_entries(),
            ttl: settings.cache_ttl(),
            enabled: settings.cache_enabled(),
            policy: settings.eviction_policy(),
        }
    }

    /// Set the maximum number of entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable admission.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the eviction policy.
    pub fn policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// One stored value with its access bookkeeping.
///
/// Timestamps are kept as nanoseconds since the owning cache's epoch so they
/// can be updated atomically under the shared lock.
pub(crate) struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_accessed_nanos: AtomicU64,
    access_count: AtomicU64,
    /// Monotonic access sequence; orders accesses that land on the same instant.
    sequence: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, created_at: Instant, created_nanos: u64, sequence: u64) -> Self {
        Self {
            value,
            created_at,
            last_accessed_nanos: AtomicU64::new(created_nanos),
            access_count: AtomicU64::new(0),
            sequence: AtomicU64::new(sequence),
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }

    fn touch(&self, now_nanos: u64, sequence: u64) {
        self.last_accessed_nanos.store(now_nanos, Ordering::Relaxed);
        self.sequence.store(sequence, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn last_accessed_nanos(&self) -> u64 {
        self.last_accessed_nanos.load(Ordering::Relaxed)
    }

    pub(crate) fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Sort key for "least recently accessed first".
    pub(crate) fn recency(&self) -> (u64, u64) {
        (
            self.last_accessed_nanos(),
            self.sequence.load(Ordering::Relaxed),
        )
    }
}

/// Read-only view of an entry's bookkeeping, returned by [`ResultCache::inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub created_at: Instant,
    pub last_accessed_at: Instant,
    pub access_count: u64,
    pub expired: bool,
}

/// Cache statistics snapshot, for observability only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub total_entries: usize,
    pub valid_entries: usize,
    /// Expired but not yet removed (expiry is lazy).
    pub expired_entries: usize,
    pub total_access_count: u64,
    pub average_access_count: f64,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub enabled: bool,
    pub policy: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Capacity-bounded, TTL-based, in-memory key/value store.
///
/// All operations are total: a miss is a value, not an error. Values are
/// cloned out on `get`, so keep `V` cheap to clone.
pub struct ResultCache<V> {
    config: CacheConfig,
    epoch: Instant,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    sequence: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    /// Create an empty cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            epoch: Instant::now(),
            entries: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a value.
    ///
    /// Returns `None` if the key is absent or its entry has outlived the TTL;
    /// in the latter case the entry is removed. A hit bumps the entry's
    /// access count and last-access time.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => {
                    self.record_miss();
                    return None;
                }
                Some(entry) if !entry.is_expired(now, self.config.ttl) => {
                    entry.touch(self.nanos_since_epoch(now), self.next_sequence());
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a concurrent put may have
        // replaced the entry in between.
        let mut entries = self.entries.write();
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now, self.config.ttl))
        {
            entries.remove(key);
            debug!(key, "expired cache entry removed");
        }
        self.record_miss();
        None
    }

    /// Insert or overwrite a value.
    ///
    /// No-op when the cache is disabled. When inserting a new key into a full
    /// cache, one entry is evicted first according to the configured policy.
    /// Overwriting an existing key never evicts and resets its TTL.
    pub fn put(&self, key: impl Into<String>, value: V) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }
        let key = key.into();
        let now = Instant::now();
        let now_nanos = self.nanos_since_epoch(now);

        let mut entries = self.entries.write();
        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            let victim = self
                .config
                .policy
                .select_victim(entries.iter(), now_nanos)
                .cloned();
            if let Some(victim) = victim {
                entries.remove(&victim);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL,
                    "policy" => self.config.policy.name())
                .increment(1);
                debug!(key = %victim, policy = self.config.policy.name(), "cache entry evicted");
            }
        }
        let entry = CacheEntry::new(value, now, now_nanos, self.next_sequence());
        entries.insert(key, entry);
    }

    /// Remove a key. Returns true if it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Remove every key matched by `pattern`. Returns the number removed.
    pub fn invalidate_matching(&self, pattern: &Regex) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !pattern.is_match(key));
        before - entries.len()
    }

    /// Compile `pattern` as a regex and remove every matching key.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern).map_err(AugurError::from)?;
        Ok(self.invalidate_matching(&regex))
    }

    /// Remove every key starting with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Whether a live (non-expired) entry exists. Does not count as an access.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now, self.config.ttl))
    }

    /// Bookkeeping for a key without counting as an access.
    pub fn inspect(&self, key: &str) -> Option<EntryInfo> {
        let now = Instant::now();
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        Some(EntryInfo {
            created_at: entry.created_at,
            last_accessed_at: self.epoch + Duration::from_nanos(entry.last_accessed_nanos()),
            access_count: entry.access_count(),
            expired: entry.is_expired(now, self.config.ttl),
        })
    }

    /// Physically present keys, expired ones included. Order is unspecified.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of physically present entries (expired ones included).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of entry counts and access statistics.
    pub fn statistics(&self) -> CacheStatistics {
        let now = Instant::now();
        let entries = self.entries.read();
        let total_entries = entries.len();
        let expired_entries = entries
            .values()
            .filter(|entry| entry.is_expired(now, self.config.ttl))
            .count();
        let total_access_count: u64 = entries.values().map(CacheEntry::access_count).sum();
        let average_access_count = if total_entries == 0 {
            0.0
        } else {
            total_access_count as f64 / total_entries as f64
        };

        CacheStatistics {
            total_entries,
            valid_entries: total_entries - expired_entries,
            expired_entries,
            total_access_count,
            average_access_count,
            max_entries: self.config.max_entries,
            ttl_secs: self.config.ttl.as_secs(),
            enabled: self.config.enabled,
            policy: self.config.policy.name(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn nanos_since_epoch(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_does_not_evict() {
        let cache = ResultCache::new(CacheConfig::new().max_entries(2));
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn overwrite_resets_access_count() {
        let cache = ResultCache::new(CacheConfig::new());
        cache.put("a", 1);
        cache.get("a");
        cache.get("a");
        assert_eq!(cache.inspect("a").unwrap().access_count, 2);
        cache.put("a", 2);
        assert_eq!(cache.inspect("a").unwrap().access_count, 0);
    }

    #[test]
    fn zero_capacity_admits_nothing() {
        let cache = ResultCache::new(CacheConfig::new().max_entries(0));
        cache.put("a", 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn inspect_does_not_count_as_access() {
        let cache = ResultCache::new(CacheConfig::new());
        cache.put("a", 1);
        cache.inspect("a");
        assert!(cache.contains_key("a"));
        assert_eq!(cache.inspect("a").unwrap().access_count, 0);
    }

    #[test]
    fn recency_orders_by_sequence_on_equal_instants() {
        let now = Instant::now();
        let older = CacheEntry::new((), now, 5, 1);
        let newer = CacheEntry::new((), now, 5, 2);
        assert!(older.recency() < newer.recency());
    }
}
