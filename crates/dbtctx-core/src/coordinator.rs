//! Cache Coordinator
//!
//! Wraps an [`ExpiringCache`] with content-addressed keys and passive
//! cleanup. Keys are SHA-256 digests of the cached content, optionally
//! prefixed with a content type (`"schema:<digest>"`), so identical raw
//! documents of the same type are parsed once.
//!
//! Expired entries are swept lazily: before every read or write, if the
//! cleanup interval has elapsed since the last sweep, one sweep runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::cache::{CacheStats, ExpiringCache, SizeEstimate, DEFAULT_MAX_SIZE, DEFAULT_TTL};
use crate::parser::ParsedDocument;

/// Default interval between passive sweeps (five minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Tunables for a [`CacheCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Maximum number of entries
    pub max_size: usize,
    /// TTL applied when none is given
    pub default_ttl: Duration,
    /// Minimum time between passive sweeps
    pub cleanup_interval: Duration,
}

impl CacheSettings {
    /// Settings from a size and a TTL expressed in minutes
    pub fn from_minutes(max_size: usize, ttl_minutes: u64) -> Self {
        Self {
            max_size,
            default_ttl: Duration::from_secs(ttl_minutes.saturating_mul(60)),
            ..Self::default()
        }
    }

    /// Set the passive cleanup interval
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            default_ttl: DEFAULT_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Estimated memory held by a coordinator's cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub estimated_bytes: usize,
    pub estimated_mb: f64,
    pub items_cached: usize,
    pub average_item_size: f64,
}

/// Derive a content-addressed cache key.
///
/// The key is the lowercase hex SHA-256 of `content`, prefixed with
/// `"{prefix}:"` when a non-empty prefix is given.
pub fn generate_key(content: &str, prefix: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, digest),
        _ => digest,
    }
}

/// Content-addressed cache with passive expiry sweeps.
///
/// Thread-safe: All methods take `&self`.
pub struct CacheCoordinator<V> {
    cache: ExpiringCache<V>,
    cleanup_interval: Duration,
    last_cleanup: Mutex<Instant>,
}

/// Coordinator over parsed dbt documents
pub type DocumentCache = CacheCoordinator<ParsedDocument>;

impl<V: Clone> CacheCoordinator<V> {
    /// Create a coordinator with the given settings
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            cache: ExpiringCache::new(settings.max_size, settings.default_ttl),
            cleanup_interval: settings.cleanup_interval,
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    /// Access the underlying cache
    pub fn cache(&self) -> &ExpiringCache<V> {
        &self.cache
    }

    /// Derive a key; see [`generate_key`]
    pub fn generate_key(&self, content: &str, prefix: Option<&str>) -> String {
        generate_key(content, prefix)
    }

    /// Read a value by key
    pub fn get_cached_result(&self, key: &str) -> Option<V> {
        self.periodic_cleanup();
        self.cache.get(key)
    }

    /// Store a value by key
    pub fn set_cached_result(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.periodic_cleanup();
        self.cache.set(key, value, ttl);
    }

    /// Store the parse result of `content`, keyed by its digest and type.
    ///
    /// Returns the derived key.
    pub fn cache_yaml(&self, content: &str, parsed: V, content_type: &str) -> String {
        let key = generate_key(content, Some(content_type));
        self.set_cached_result(key.clone(), parsed, None);
        key
    }

    /// Look up the parse result of `content` for the given type
    pub fn get_cached_yaml(&self, content: &str, content_type: &str) -> Option<V> {
        self.get_cached_result(&generate_key(content, Some(content_type)))
    }

    /// Bulk insert, keys optionally prefixed with `"{prefix}:"`.
    ///
    /// Returns the number of entries inserted.
    pub fn warm_cache<K, I>(&self, items: I, prefix: Option<&str>) -> usize
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut count = 0;
        for (key, value) in items {
            let key = match prefix {
                Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, key.as_ref()),
                _ => key.as_ref().to_string(),
            };
            self.set_cached_result(key, value, None);
            count += 1;
        }
        debug!(count, "Warmed cache");
        count
    }

    /// Remove every entry whose key contains `pattern`
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.cache.invalidate_pattern(pattern)
    }

    /// Remove all entries and reset counters
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Get a snapshot of cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Sweep expired entries if the cleanup interval has elapsed.
    ///
    /// Returns the number of entries removed, or `None` if no sweep ran.
    pub fn periodic_cleanup(&self) -> Option<usize> {
        let mut last_cleanup = self.last_cleanup.lock();
        if last_cleanup.elapsed() <= self.cleanup_interval {
            return None;
        }
        let removed = self.cache.cleanup_expired();
        *last_cleanup = Instant::now();
        Some(removed)
    }
}

impl<V: Clone + SizeEstimate> CacheCoordinator<V> {
    /// Estimate the memory held by cached keys and values
    pub fn memory_usage_estimate(&self) -> MemoryUsage {
        let (items_cached, estimated_bytes) = self.cache.estimate_footprint();
        MemoryUsage {
            estimated_bytes,
            estimated_mb: estimated_bytes as f64 / (1024.0 * 1024.0),
            items_cached,
            average_item_size: if items_cached == 0 {
                0.0
            } else {
                estimated_bytes as f64 / items_cached as f64
            },
        }
    }
}

impl<V: Clone> Default for CacheCoordinator<V> {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

// ============================================================================
// Process-wide Default
// ============================================================================

static GLOBAL_DOCUMENT_CACHE: Mutex<Option<Arc<DocumentCache>>> = parking_lot::const_mutex(None);

/// Get the process-wide document cache, creating it on first use.
///
/// `settings` only take effect on the call that constructs the cache.
pub fn global_document_cache(settings: CacheSettings) -> Arc<DocumentCache> {
    let mut slot = GLOBAL_DOCUMENT_CACHE.lock();
    match slot.as_ref() {
        Some(cache) => Arc::clone(cache),
        None => {
            info!(
                max_size = settings.max_size,
                ttl_secs = settings.default_ttl.as_secs(),
                "Creating global document cache"
            );
            let cache = Arc::new(DocumentCache::new(settings));
            *slot = Some(Arc::clone(&cache));
            cache
        }
    }
}

/// Clear and discard the process-wide document cache.
///
/// Handles obtained earlier stay usable but are no longer shared.
pub fn reset_global_document_cache() {
    if let Some(cache) = GLOBAL_DOCUMENT_CACHE.lock().take() {
        cache.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn coordinator(cleanup_interval: Duration) -> CacheCoordinator<String> {
        CacheCoordinator::new(CacheSettings::default().with_cleanup_interval(cleanup_interval))
    }

    #[test]
    fn test_generate_key_is_deterministic() {
        let a = generate_key("models: []", Some("schema"));
        let b = generate_key("models: []", Some("schema"));
        assert_eq!(a, b);
        assert!(a.starts_with("schema:"));
        assert_eq!(a.len(), "schema:".len() + 64);

        assert_eq!(generate_key("x", None), generate_key("x", Some("")));
        assert!(!generate_key("x", None).contains(':'));
    }

    #[test]
    fn test_generate_key_distinguishes_content() {
        let inputs = [
            "",
            " ",
            "name: a",
            "name: b",
            "name: a\n",
            "NAME: a",
            "models:\n  - name: orders\n",
            "models:\n  - name: order\n",
        ];
        let keys: HashSet<String> = inputs
            .iter()
            .map(|content| generate_key(content, Some("schema")))
            .collect();
        assert_eq!(keys.len(), inputs.len());
    }

    #[test]
    fn test_cache_yaml_round_trip() {
        let coordinator = coordinator(DEFAULT_CLEANUP_INTERVAL);
        let key = coordinator.cache_yaml("name: a", "parsed".to_string(), "project");
        assert_eq!(key, generate_key("name: a", Some("project")));

        assert_eq!(
            coordinator.get_cached_yaml("name: a", "project").as_deref(),
            Some("parsed")
        );
        assert_eq!(coordinator.get_cached_yaml("name: a", "schema"), None);
        assert_eq!(coordinator.get_cached_yaml("name: b", "project"), None);
    }

    #[test]
    fn test_passive_cleanup_waits_for_interval() {
        let coordinator = coordinator(Duration::from_secs(3600));
        coordinator.set_cached_result("gone", "v".to_string(), Some(Duration::ZERO));

        assert_eq!(coordinator.periodic_cleanup(), None);
        // Expired but not yet swept
        assert_eq!(coordinator.cache().len(), 1);
    }

    #[test]
    fn test_passive_cleanup_runs_after_interval() {
        let coordinator = coordinator(Duration::from_millis(10));
        coordinator.set_cached_result("gone", "v".to_string(), Some(Duration::ZERO));
        coordinator.set_cached_result("kept", "v".to_string(), None);

        thread::sleep(Duration::from_millis(25));
        // The read triggers the sweep before looking up `kept`
        assert!(coordinator.get_cached_result("kept").is_some());
        assert_eq!(coordinator.cache().len(), 1);
        assert_eq!(coordinator.periodic_cleanup(), None);
    }

    #[test]
    fn test_warm_cache() {
        let coordinator = coordinator(DEFAULT_CLEANUP_INTERVAL);
        let count = coordinator.warm_cache(
            vec![("a", "1".to_string()), ("b", "2".to_string())],
            Some("seed"),
        );
        assert_eq!(count, 2);
        assert!(coordinator.cache().contains("seed:a"));
        assert_eq!(coordinator.invalidate_pattern("seed:"), 2);
    }

    #[test]
    fn test_memory_usage_estimate() {
        let coordinator = coordinator(DEFAULT_CLEANUP_INTERVAL);
        assert_eq!(coordinator.memory_usage_estimate().average_item_size, 0.0);

        coordinator.cache_yaml("a", "value".to_string(), "t");
        let usage = coordinator.memory_usage_estimate();
        assert_eq!(usage.items_cached, 1);
        assert!(usage.estimated_bytes > 0);
    }

    #[test]
    fn test_from_minutes() {
        let settings = CacheSettings::from_minutes(50, 60);
        assert_eq!(settings.max_size, 50);
        assert_eq!(settings.default_ttl, Duration::from_secs(3600));
        assert_eq!(settings.cleanup_interval, DEFAULT_CLEANUP_INTERVAL);
    }

    #[test]
    fn test_huge_ttl_minutes_keeps_entries() {
        let settings = CacheSettings::from_minutes(10, u64::MAX);
        assert_eq!(settings.default_ttl, Duration::from_secs(u64::MAX));

        let coordinator = CacheCoordinator::new(CacheSettings::from_minutes(10, u64::MAX / 60));
        coordinator.cache_yaml("name: a", "parsed".to_string(), "project");
        assert_eq!(
            coordinator.get_cached_yaml("name: a", "project").as_deref(),
            Some("parsed")
        );
    }

    #[test]
    fn test_global_cache_lifecycle() {
        reset_global_document_cache();

        let first = global_document_cache(CacheSettings::from_minutes(10, 1));
        let second = global_document_cache(CacheSettings::from_minutes(999, 99));
        assert!(Arc::ptr_eq(&first, &second));
        // Settings from the first call stick
        assert_eq!(second.cache().max_size(), 10);

        first.cache_yaml("name: a", ParsedDocument::Schema(Default::default()), "schema");
        reset_global_document_cache();
        assert!(first.cache().is_empty());

        let third = global_document_cache(CacheSettings::default());
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.cache().max_size(), DEFAULT_MAX_SIZE);

        reset_global_document_cache();
    }
}
