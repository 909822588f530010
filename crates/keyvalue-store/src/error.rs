//! Error types for the keyvalue-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].
//! Command-level failures (`InvalidArgument`, `NotFound`, `UnknownCommand`)
//! share the same enum so the dispatcher can render any of them as a
//! structured response.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem operation failed (e.g. creating the data directory).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A schema migration failed.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// A missing or malformed key, value, or TTL.
    #[error("{0}")]
    InvalidArgument(String),

    /// The key is absent or has expired.
    #[error("Key '{key}' not found")]
    NotFound { key: String },

    /// The command envelope named an operation we do not know.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl StoreError {
    /// Stable, machine-readable code for this error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound { .. } => "not_found",
            Self::UnknownCommand(_) => "unknown_command",
            Self::Config(_) => "config",
            Self::Sqlite(_) | Self::Json(_) | Self::Io(_) | Self::Migration { .. } => "storage",
            Self::TaskJoin(_) => "internal",
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
