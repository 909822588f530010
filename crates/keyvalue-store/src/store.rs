//! The key-value engine.
//!
//! [`KeyValueStore`] owns a [`MemoryCache`] behind a mutex and a
//! [`KeyValueTable`]. Mutations hit the cache first and are then written
//! through to the table while the lock is still held, so calls on one
//! instance never interleave. Reads sweep expired entries first, and reload
//! from the table when the cache is empty.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::cache::{CacheStats, MemoryCache};
use crate::codec::ValueKind;
use crate::config::StoreConfig;
use crate::db::Database;
use crate::entry::{self, Entry, Reading};
use crate::error::{StoreError, StoreResult};
use crate::expiry::{self, ExpirySweeper};
use crate::table::KeyValueTable;

/// Embedded key-value store with a write-through durable tier.
pub struct KeyValueStore {
    cache: Mutex<MemoryCache>,
    stats: Arc<CacheStats>,
    table: KeyValueTable,
    config: StoreConfig,
}

impl KeyValueStore {
    /// Open the database, create the table if needed and, if
    /// `config.preload` is set, load every live row into memory.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let db = Database::open_and_migrate(config.db_path.clone(), config.busy_timeout_ms).await?;
        let cache = MemoryCache::new();
        let store = Self {
            stats: cache.shared_stats(),
            cache: Mutex::new(cache),
            table: KeyValueTable::new(db),
            config,
        };

        if store.config.preload {
            store.reload().await;
        }
        info!(path = %store.config.db_path.display(), "key-value store ready");
        Ok(store)
    }

    /// Start the background sweeper if the configuration asks for one.
    pub fn start_sweeper(self: &Arc<Self>) -> Option<ExpirySweeper> {
        self.config
            .sweep_interval()
            .and_then(|every| ExpirySweeper::spawn(self, every))
    }

    pub fn table(&self) -> &KeyValueTable {
        &self.table
    }

    pub fn cache_stats(&self) -> &CacheStats {
        &self.stats
    }

    // ── commands ─────────────────────────────────────────────────────

    /// Store `value` under `key`, replacing any previous entry and its TTL.
    ///
    /// `ttl` is the raw caller input: a number, a numeric string, or `None`.
    /// A malformed TTL rejects the whole call before anything is written.
    #[instrument(skip(self, value, ttl))]
    pub async fn set(&self, key: &str, value: Value, ttl: Option<&Value>) -> StoreResult<Entry> {
        if key.is_empty() || value.is_null() {
            return Err(StoreError::InvalidArgument(
                "Both 'key' and 'value' are required for set command".into(),
            ));
        }
        let ttl = match ttl {
            Some(raw) => expiry::parse_ttl(raw)?,
            None => None,
        };

        let now = entry::now();
        let entry = Entry {
            key: key.to_string(),
            kind: ValueKind::of(&value),
            value,
            ttl_input: ttl.as_ref().map(|t| t.input.clone()),
            created_at: now,
            expires_at: expiry::compute_expiry(now, ttl.as_ref()),
        };

        let mut cache = self.cache.lock().await;
        cache.put(key, entry.clone());
        self.table.upsert(&entry).await;
        Ok(entry)
    }

    /// Look up a live entry.
    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> StoreResult<Reading> {
        require_key(key, "get")?;

        let mut cache = self.cache.lock().await;
        self.prepare_read(&mut cache).await;
        cache
            .get(key)
            .map(Entry::reading)
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    /// Batch read. Keys that are absent or expired are left out.
    pub async fn get_many<S: AsRef<str>>(&self, keys: &[S]) -> BTreeMap<String, Reading> {
        let mut cache = self.cache.lock().await;
        self.prepare_read(&mut cache).await;
        keys.iter()
            .filter_map(|k| {
                let k = k.as_ref();
                cache.get(k).map(|e| (k.to_string(), e.reading()))
            })
            .collect()
    }

    /// Remove `key` from both tiers. Missing keys are not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        require_key(key, "delete")?;

        let mut cache = self.cache.lock().await;
        cache.delete(key);
        self.table.delete(key).await;
        Ok(true)
    }

    /// Empty both tiers. Returns how many cached entries were dropped.
    #[instrument(skip(self))]
    pub async fn delete_all(&self) -> usize {
        let mut cache = self.cache.lock().await;
        let removed = cache.clear();
        self.table.delete_all().await;
        info!(removed, "all keys deleted");
        removed
    }

    // ── bulk reads ───────────────────────────────────────────────────

    /// Every live entry keyed by name.
    pub async fn read_all(&self) -> BTreeMap<String, Reading> {
        let mut cache = self.cache.lock().await;
        self.prepare_read(&mut cache).await;
        cache
            .all()
            .into_iter()
            .map(|(k, e)| (k, e.reading()))
            .collect()
    }

    /// [`read_all`](Self::read_all) wrapped as `{"data": {...}}`.
    pub async fn readings(&self) -> StoreResult<Value> {
        let data = serde_json::to_value(self.read_all().await)?;
        Ok(json!({ "data": data }))
    }

    // ── maintenance ──────────────────────────────────────────────────

    /// Replace the cache with the live rows of the table.
    pub async fn reload(&self) -> usize {
        let mut cache = self.cache.lock().await;
        self.reload_locked(&mut cache).await
    }

    /// Remove expired entries from both tiers now.
    pub async fn sweep(&self) -> usize {
        let mut cache = self.cache.lock().await;
        expiry::sweep(entry::now(), &mut cache, &self.table).await
    }

    /// Number of cached entries, expired ones included until the next sweep.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }

    // ── internals ────────────────────────────────────────────────────

    async fn prepare_read(&self, cache: &mut MemoryCache) {
        if cache.is_empty() {
            self.reload_locked(cache).await;
        }
        expiry::sweep(entry::now(), cache, &self.table).await;
    }

    async fn reload_locked(&self, cache: &mut MemoryCache) -> usize {
        let entries = self.table.load_all(entry::now()).await;
        let count = entries.len();
        cache.replace_all(entries);
        debug!(entries = count, "cache reloaded from database");
        count
    }
}

fn require_key(key: &str, command: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument(format!(
            "'key' is required for {command} command"
        )));
    }
    Ok(())
}

// ── tests ────────────────────────────────────────────────────────────
