//! # keyvalue-store
//!
//! Embedded key-value store with a fast in-memory view kept in sync with a
//! durable SQLite table. Entries may carry a time-to-live and keep their
//! JSON type (string, number, boolean, list, mapping) across restarts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  CommandDispatcher (JSON envelopes)      │
//! ├─────────────────────────────────────────┤
//! │  KeyValueStore                           │
//! │    MemoryCache   (HashMap, under Mutex)  │
//! │    expiry        (lazy sweep on read)    │
//! ├─────────────────────────────────────────┤
//! │  KeyValueTable   (write-through, codec)  │
//! │  Database        (rusqlite, per-op conn) │
//! │  Migrations      (versioned)             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use keyvalue_store::{CommandDispatcher, KeyValueStore, StoreConfig};
//!
//! let store = KeyValueStore::open(StoreConfig::new().with_db_path("data/kv.db")).await?;
//! let dispatcher = CommandDispatcher::new(Arc::new(store));
//! let resp = dispatcher
//!     .dispatch(&serde_json::json!({"command": "set", "key": "a", "value": 1}))
//!     .await;
//! ```

pub mod cache;
pub mod codec;
pub mod command;
pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod expiry;
pub mod migration;
pub mod store;
pub mod table;

// ── re-exports ───────────────────────────────────────────────────────

pub use cache::{CacheStats, MemoryCache};
pub use codec::ValueKind;
pub use command::{Command, CommandDispatcher};
pub use config::StoreConfig;
pub use db::Database;
pub use entry::{Entry, Reading};
pub use error::{StoreError, StoreResult};
pub use expiry::{ExpirySweeper, Ttl};
pub use store::KeyValueStore;
pub use table::KeyValueTable;
