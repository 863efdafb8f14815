//! Expiring LRU Cache
//!
//! Provides a bounded key/value store where every entry carries an absolute
//! expiry time. When the store is full, inserting a new key evicts the
//! least-recently-used entry. Expired entries are dropped lazily on read
//! and in bulk by [`ExpiringCache::cleanup_expired`].
//!
//! Thread-safe via interior mutability using parking_lot::Mutex. Every
//! public method takes the lock exactly once, so no caller can observe a
//! half-inserted or half-evicted state.

use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

/// Default maximum number of entries
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default time-to-live for entries (one hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Request counters for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CacheCounters {
    hits: u64,
    misses: u64,
    evictions: u64,
    total_requests: u64,
}

/// Snapshot of cache usage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads that found nothing or an expired value
    pub misses: u64,
    /// Entries dropped to make room for new keys
    pub evictions: u64,
    /// Total reads since construction or the last clear
    pub total_requests: u64,
    /// hits / total_requests (0.0 when nothing was read)
    pub hit_rate: f64,
    /// Entries currently stored (expired ones included until swept)
    pub cache_size: usize,
    /// Configured capacity
    pub max_size: usize,
}

/// Rough in-memory footprint of a cached value.
///
/// Implementations must be pure: they run while the cache lock is held.
pub trait SizeEstimate {
    /// Estimated size in bytes
    fn estimated_size(&self) -> usize;
}

impl SizeEstimate for String {
    fn estimated_size(&self) -> usize {
        std::mem::size_of::<String>() + self.len()
    }
}

struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Inner state for ExpiringCache (protected by Mutex)
struct CacheState<V> {
    /// Entries ordered by recency; front is most recently used
    entries: LruCache<String, CacheEntry<V>>,

    counters: CacheCounters,
}

/// Bounded LRU cache with per-entry time-to-live.
///
/// Thread-safe: All methods take `&self`.
pub struct ExpiringCache<V> {
    /// Maximum number of entries (immutable after construction)
    max_size: usize,

    /// TTL applied when `set` is called without one
    default_ttl: Duration,

    state: Mutex<CacheState<V>>,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create a cache holding at most `max_size` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            max_size: max_size.max(1),
            default_ttl,
            state: Mutex::new(CacheState {
                // Capacity is enforced by `set` so evictions can be counted
                entries: LruCache::unbounded(),
                counters: CacheCounters::default(),
            }),
        }
    }

    /// Get the configured capacity
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the default time-to-live
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a value.
    ///
    /// Returns `None` when the key is absent or its entry has expired; an
    /// expired entry is removed. A hit marks the entry most recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock();
        state.counters.total_requests += 1;

        let now = Instant::now();
        let Some(expired) = state.entries.peek(key).map(|entry| entry.is_expired(now)) else {
            state.counters.misses += 1;
            return None;
        };

        if expired {
            state.entries.pop(key);
            state.counters.misses += 1;
            trace!(key, "Expired cache entry dropped on read");
            return None;
        }

        state.counters.hits += 1;
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store a value with the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, None);
    }

    /// Store a value, expiring `ttl` from now (default TTL when `None`).
    ///
    /// An existing key is refreshed in place and becomes most recently
    /// used. A new key that would exceed capacity first evicts the least
    /// recently used entry. A TTL too large to add to the current instant
    /// (such as `Duration::MAX`) never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let expires_at = Instant::now().checked_add(ttl.unwrap_or(self.default_ttl));

        let mut state = self.state.lock();
        if !state.entries.contains(&key) && state.entries.len() >= self.max_size {
            if let Some((evicted, _)) = state.entries.pop_lru() {
                state.counters.evictions += 1;
                debug!(key = %evicted, "Evicted least recently used cache entry");
            }
        }
        state.entries.put(key, CacheEntry { value, expires_at });
    }

    /// Check for a live entry without touching recency or counters.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.state
            .lock()
            .entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Remove a single entry, returning its value if it was live.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.state
            .lock()
            .entries
            .pop(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value)
    }

    /// Number of stored entries (expired ones included until swept)
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry and reset all counters.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.counters = CacheCounters::default();
    }

    /// Remove every entry whose key contains `pattern` literally.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            state.entries.pop(key);
        }
        doomed.len()
    }

    /// Remove every expired entry regardless of recency.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            state.entries.pop(key);
        }
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), "Swept expired cache entries");
        }
        doomed.len()
    }

    /// Get a snapshot of counters, hit rate and occupancy
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let counters = state.counters;
        let hit_rate = if counters.total_requests == 0 {
            0.0
        } else {
            counters.hits as f64 / counters.total_requests as f64
        };

        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            total_requests: counters.total_requests,
            hit_rate,
            cache_size: state.entries.len(),
            max_size: self.max_size,
        }
    }
}

impl<V: Clone + SizeEstimate> ExpiringCache<V> {
    /// Estimate the footprint of all stored keys and values.
    ///
    /// Returns `(entry_count, estimated_bytes)`.
    pub fn estimate_footprint(&self) -> (usize, usize) {
        let state = self.state.lock();
        let bytes = state
            .entries
            .iter()
            .map(|(key, entry)| key.estimated_size() + entry.value.estimated_size())
            .sum();
        (state.entries.len(), bytes)
    }
}

impl<V: Clone> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_TTL)
    }
}
