//! SQLite database handle.
//!
//! [`Database`] remembers where the file lives and opens a fresh
//! `rusqlite::Connection` for every operation on the tokio blocking pool.
//! No connection is held between calls, so nothing long-lived is shared
//! across operations or store instances.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::migration;

/// Default busy timeout applied to each connection.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

/// Cheap, cloneable handle to a SQLite database file.
#[derive(Debug, Clone)]
pub struct Database {
    path: Arc<PathBuf>,
    busy_timeout_ms: u32,
}

impl Database {
    /// Prepare a database at `path`, creating parent directories as needed.
    ///
    /// A connection is opened once to validate the file and persist the
    /// journal mode, then closed again.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    /// Like [`Database::open`] with a custom busy timeout.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout_ms: u32) -> StoreResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening database");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = Self {
            path: Arc::new(path.to_path_buf()),
            busy_timeout_ms,
        };
        drop(db.connect()?);
        Ok(db)
    }

    /// Open the database and run all pending migrations.
    pub async fn open_and_migrate(
        path: impl AsRef<Path> + Send + 'static,
        busy_timeout_ms: u32,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db =
            tokio::task::spawn_blocking(move || Self::open_with_timeout(&path, busy_timeout_ms))
                .await??;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run all pending schema migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        self.execute_mut(|conn| migration::run_all(conn)).await
    }

    /// Run a closure against a freshly opened connection on the blocking pool.
    ///
    /// The connection is dropped as soon as the closure returns.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let rows: i64 = db.execute(|conn| {
    ///     Ok(conn.query_row("SELECT count(*) FROM key_value_store", [], |r| r.get(0))?)
    /// }).await?;
    /// ```
    pub async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.connect()?;
            f(&conn)
        })
        .await?
    }

    /// Like [`Database::execute`] but hands out `&mut Connection` so the
    /// closure can open a transaction. Migrations run through here.
    pub async fn execute_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.connect()?;
            f(&mut conn)
        })
        .await?
    }

    // ── connections ──────────────────────────────────────────────────

    fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(self.path.as_path())?;
        self.apply_pragmas(&conn)?;
        Ok(conn)
    }

    fn apply_pragmas(&self, conn: &Connection) -> StoreResult<()> {
        debug!("applying SQLite pragmas");

        // WAL lets a second process read while we write.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Safe with WAL: a power cut loses at most the last commit.
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        conn.pragma_update(None, "busy_timeout", self.busy_timeout_ms)?;
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
