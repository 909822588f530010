//! Durable `key_value_store` table.
//!
//! Every operation comes in two forms. The `try_*` methods return the
//! underlying [`StoreResult`]. The plain methods are best-effort: a failure
//! is logged and dropped so an in-memory mutation that already happened is
//! never reported as failed. That can leave the table behind the cache after
//! a disk error; nothing retries the write.

use rusqlite::types::Value as SqlValue;
use tracing::{debug, error, instrument};

use crate::codec::{self, ValueKind};
use crate::db::Database;
use crate::entry::Entry;
use crate::error::StoreResult;

/// CRUD operations on the `key_value_store` table.
#[derive(Debug, Clone)]
pub struct KeyValueTable {
    db: Database,
}

impl KeyValueTable {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create the table if it does not exist yet.
    pub async fn init(&self) -> StoreResult<()> {
        self.db.run_migrations().await
    }

    // ── fallible API ─────────────────────────────────────────────────

    /// Every row that has not expired at `now`. Expired rows are skipped,
    /// not deleted.
    #[instrument(skip(self))]
    pub async fn try_load_all(&self, now: f64) -> StoreResult<Vec<Entry>> {
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT key, value, value_type, ttl_seconds, created_at, expires_at \
                     FROM key_value_store WHERE expires_at IS NULL OR expires_at > ?1",
                )?;
                let rows = stmt
                    .query_map([now], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, SqlValue>(3)?,
                            row.get::<_, f64>(4)?,
                            row.get::<_, Option<f64>>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let entries: Vec<Entry> = rows
                    .into_iter()
                    .map(|(key, text, tag, ttl, created_at, expires_at)| {
                        let kind = ValueKind::from_tag(tag.as_deref().unwrap_or_default());
                        Entry {
                            key,
                            value: codec::decode(&text, kind),
                            kind,
                            ttl_input: ttl_text(ttl),
                            created_at,
                            expires_at,
                        }
                    })
                    .collect();
                debug!(rows = entries.len(), "loaded live rows");
                Ok(entries)
            })
            .await
    }

    /// Insert the entry, replacing any row with the same key.
    #[instrument(skip(self, entry), fields(key = %entry.key))]
    pub async fn try_upsert(&self, entry: &Entry) -> StoreResult<()> {
        let (text, kind) = codec::encode(&entry.value)?;
        let key = entry.key.clone();
        let ttl = entry.ttl_input.clone();
        let created_at = entry.created_at;
        let expires_at = entry.expires_at;

        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO key_value_store \
                     (key, value, value_type, ttl_seconds, created_at, expires_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(key) DO UPDATE SET \
                     value = excluded.value, value_type = excluded.value_type, \
                     ttl_seconds = excluded.ttl_seconds, created_at = excluded.created_at, \
                     expires_at = excluded.expires_at",
                    rusqlite::params![key, text, kind.as_str(), ttl, created_at, expires_at],
                )?;
                debug!(key = %key, "row upserted");
                Ok(())
            })
            .await
    }

    /// Remove a row, returning `true` if it existed.
    #[instrument(skip(self))]
    pub async fn try_delete(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM key_value_store WHERE key = ?1",
                    rusqlite::params![key],
                )?;
                Ok(deleted > 0)
            })
            .await
    }

    /// Remove every row, returning how many were deleted.
    #[instrument(skip(self))]
    pub async fn try_delete_all(&self) -> StoreResult<usize> {
        self.db
            .execute(|conn| Ok(conn.execute("DELETE FROM key_value_store", [])?))
            .await
    }

    /// Number of rows, expired ones included.
    pub async fn count(&self) -> StoreResult<usize> {
        self.db
            .execute(|conn| {
                let c: i64 =
                    conn.query_row("SELECT count(*) FROM key_value_store", [], |row| row.get(0))?;
                Ok(c as usize)
            })
            .await
    }

    // ── best-effort API ──────────────────────────────────────────────

    /// [`try_load_all`](Self::try_load_all), returning nothing on failure.
    pub async fn load_all(&self, now: f64) -> Vec<Entry> {
        self.try_load_all(now).await.unwrap_or_else(|err| {
            error!(%err, "failed to load from database");
            Vec::new()
        })
    }

    pub async fn upsert(&self, entry: &Entry) {
        if let Err(err) = self.try_upsert(entry).await {
            error!(key = %entry.key, %err, "failed to save to database");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(err) = self.try_delete(key).await {
            error!(key = key, %err, "failed to delete from database");
        }
    }

    pub async fn delete_all(&self) {
        if let Err(err) = self.try_delete_all().await {
            error!(%err, "failed to clear database");
        }
    }
}

/// The TTL column is text, but rows written by other tools may hold numbers.
fn ttl_text(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Text(s) => Some(s),
        SqlValue::Integer(i) => Some(i.to_string()),
        SqlValue::Real(f) => Some(f.to_string()),
        SqlValue::Null | SqlValue::Blob(_) => None,
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    async fn setup() -> (tempfile::TempDir, KeyValueTable) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("kv.db")).unwrap();
        let table = KeyValueTable::new(db);
        table.init().await.unwrap();
        (dir, table)
    }

    fn entry(key: &str, value: Value, expires_at: Option<f64>) -> Entry {
        let (_, kind) = codec::encode(&value).unwrap();
        Entry {
            key: key.to_string(),
            value,
            kind,
            ttl_input: expires_at.map(|_| "10".to_string()),
            created_at: 1000.0,
            expires_at,
        }
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let (_dir, table) = setup().await;
        table.init().await.unwrap();
        assert_eq!(table.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_then_load() {
        let (_dir, table) = setup().await;
        let e = entry("a", json!({"x": [1, 2]}), Some(2000.0));
        table.try_upsert(&e).await.unwrap();

        let loaded = table.try_load_all(1500.0).await.unwrap();
        assert_eq!(loaded, vec![e]);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let (_dir, table) = setup().await;
        table
            .try_upsert(&entry("a", json!(1), Some(2000.0)))
            .await
            .unwrap();
        table.try_upsert(&entry("a", json!("two"), None)).await.unwrap();

        let loaded = table.try_load_all(1500.0).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].value, json!("two"));
        assert_eq!(loaded[0].kind, ValueKind::String);
        assert_eq!(loaded[0].expires_at, None);
        assert_eq!(loaded[0].ttl_input, None);
    }

    #[tokio::test]
    async fn load_skips_but_keeps_expired_rows() {
        let (_dir, table) = setup().await;
        table
            .try_upsert(&entry("old", json!(1), Some(1200.0)))
            .await
            .unwrap();
        table.try_upsert(&entry("live", json!(2), None)).await.unwrap();

        let loaded = table.try_load_all(1500.0).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key, "live");
        assert_eq!(table.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let (_dir, table) = setup().await;
        table.try_upsert(&entry("a", json!(1), None)).await.unwrap();

        assert!(table.try_delete("a").await.unwrap());
        assert!(!table.try_delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn delete_all_empties_table() {
        let (_dir, table) = setup().await;
        for key in ["a", "b", "c"] {
            table.try_upsert(&entry(key, json!(key), None)).await.unwrap();
        }

        assert_eq!(table.try_delete_all().await.unwrap(), 3);
        assert!(table.try_load_all(0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn numeric_ttl_cells_are_read_as_text() {
        let (_dir, table) = setup().await;
        table
            .database()
            .execute(|conn| {
                conn.execute(
                    "INSERT INTO key_value_store (key, value, value_type, ttl_seconds, created_at, expires_at) \
                     VALUES ('n', '5', 'json', 30, 1000, 5000)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let loaded = table.try_load_all(1500.0).await.unwrap();
        assert_eq!(loaded[0].ttl_input.as_deref(), Some("30"));
        assert_eq!(loaded[0].value, json!(5));
        assert_eq!(loaded[0].created_at, 1000.0);
    }

    #[tokio::test]
    async fn best_effort_calls_swallow_failures() {
        let (_dir, table) = setup().await;
        table
            .database()
            .execute(|conn| Ok(conn.execute_batch("DROP TABLE key_value_store")?))
            .await
            .unwrap();

        assert!(table.try_upsert(&entry("a", json!(1), None)).await.is_err());

        // None of these may panic or propagate.
        table.upsert(&entry("a", json!(1), None)).await;
        table.delete("a").await;
        table.delete_all().await;
        assert!(table.load_all(0.0).await.is_empty());
    }
}
