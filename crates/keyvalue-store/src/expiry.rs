//! TTL parsing and lazy expiry.
//!
//! Expiry is lazy: reads call [`sweep`] before looking anything up, and an
//! expired entry stays on disk until a sweep sees it in the cache. The
//! optional [`ExpirySweeper`] runs the same sweep on a timer.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::MemoryCache;
use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;
use crate::table::KeyValueTable;

/// A validated time-to-live.
#[derive(Debug, Clone, PartialEq)]
pub struct Ttl {
    /// The TTL as the caller wrote it.
    pub input: String,
    pub seconds: f64,
}

/// Parse a caller-supplied TTL.
///
/// Accepts a JSON number or a numeric string. `null` means "no TTL".
/// Negative, non-finite and non-numeric inputs are rejected.
pub fn parse_ttl(raw: &Value) -> StoreResult<Option<Ttl>> {
    let input = match raw {
        Value::Null => return Ok(None),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err(invalid_ttl()),
    };

    let seconds: f64 = input.trim().parse().map_err(|_| invalid_ttl())?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid_ttl());
    }

    Ok(Some(Ttl { input, seconds }))
}

fn invalid_ttl() -> StoreError {
    StoreError::InvalidArgument("ttl_seconds must be a valid non-negative number".into())
}

/// Absolute expiry for an entry written at `now`.
pub fn compute_expiry(now: f64, ttl: Option<&Ttl>) -> Option<f64> {
    ttl.map(|t| now + t.seconds)
}

/// Drop every entry that has expired at `now` from both tiers.
///
/// Returns the number of entries removed.
pub async fn sweep(now: f64, cache: &mut MemoryCache, table: &KeyValueTable) -> usize {
    let expired = cache.expired_keys(now);
    for key in &expired {
        cache.delete(key);
        table.delete(key).await;
    }
    if !expired.is_empty() {
        debug!(removed = expired.len(), "expired entries swept");
    }
    expired.len()
}

// ── background sweeper ───────────────────────────────────────────────

/// Periodic sweep on a tokio task.
///
/// Holds only a weak reference, so the task ends once the store is dropped.
/// Dropping the sweeper also stops it.
pub struct ExpirySweeper {
    handle: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Start sweeping `store` every `every`. A zero period starts nothing.
    pub fn spawn(store: &Arc<KeyValueStore>, every: Duration) -> Option<Self> {
        if every.is_zero() {
            return None;
        }
        let store: Weak<KeyValueStore> = Arc::downgrade(store);
        let handle = tokio::spawn(async move {
            info!(interval_ms = every.as_millis() as u64, "expiry sweeper started");
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.sweep().await;
            }
            info!("expiry sweeper stopped");
        });
        Some(Self { handle })
    }

    /// Stop the background task.
    pub fn shutdown(self) {
        self.handle.abort();
    }

}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── tests ────────────────────────────────────────────────────────────
