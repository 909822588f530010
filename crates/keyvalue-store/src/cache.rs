//! In-process entry cache.
//!
//! The authoritative fast path for reads. It holds no lock of its own; the
//! owning [`KeyValueStore`](crate::KeyValueStore) serializes access.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::entry::Entry;

// ── cache stats ──────────────────────────────────────────────────────

/// Counters tracking cache effectiveness.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Total cache hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total cache misses since creation.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total lookups (hits + misses).
    pub fn total(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Hit rate as a value between 0.0 and 1.0 (returns 0.0 if no lookups).
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.hits() as f64 / total as f64
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} total={} rate={:.2}%",
            self.hits(),
            self.misses(),
            self.total(),
            self.hit_rate() * 100.0,
        )
    }
}

// ── memory cache ─────────────────────────────────────────────────────

/// Key → [`Entry`] map with upsert semantics.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Entry>,
    stats: Arc<CacheStats>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry. Expiry is not checked here; run a sweep first.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(entry)
            }
            None => {
                self.stats.record_miss();
                debug!(key = key, "cache miss");
                None
            }
        }
    }

    /// Insert or fully replace the entry for `key`.
    pub fn put(&mut self, key: impl Into<String>, entry: Entry) {
        let key = key.into();
        debug!(key = %key, "cache put");
        self.entries.insert(key, entry);
    }

    /// Remove an entry, returning it if it was present.
    pub fn delete(&mut self, key: &str) -> Option<Entry> {
        debug!(key = key, "cache delete");
        self.entries.remove(key)
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        debug!(entries = count, "cache clear");
        self.entries.clear();
        count
    }

    /// Snapshot of all entries. Order is unspecified.
    pub fn all(&self) -> Vec<(String, Entry)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect()
    }

    /// Keys of entries whose expiry is at or before `now`.
    pub fn expired_keys(&self, now: f64) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Replace the whole content with `entries`.
    pub fn replace_all(&mut self, entries: impl IntoIterator<Item = Entry>) {
        self.entries = entries.into_iter().map(|e| (e.key.clone(), e)).collect();
        debug!(entries = self.entries.len(), "cache replaced");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// A handle to the counters that outlives any borrow of the cache.
    pub fn shared_stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }
}

// ── tests ────────────────────────────────────────────────────────────
