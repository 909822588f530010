//! Store configuration.
//!
//! [`StoreConfig`] has sensible defaults via [`Default`], builder-style
//! setters, and can be read from a TOML (or JSON) file with
//! [`StoreConfig::load`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::error::{StoreError, StoreResult};

/// Where the store keeps its data and how it maintains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file backing the durable tier.
    ///
    /// Default: **/tmp/keyvalue/keyvalue.db**.
    pub db_path: PathBuf,

    /// Load the durable table into memory when the store opens.
    ///
    /// Default: **true**.
    pub preload: bool,

    /// Period of the background expiry sweep. Unset or zero disables it;
    /// reads still sweep lazily.
    ///
    /// Default: **unset**.
    pub sweep_interval_secs: Option<u64>,

    /// How long a connection waits on a locked database, in milliseconds.
    ///
    /// Default: **5 000 ms**.
    pub busy_timeout_ms: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("/tmp/keyvalue/keyvalue.db"),
            preload: true,
            sweep_interval_secs: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = Some(secs);
        self
    }

    pub fn with_busy_timeout_ms(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// The background sweep period, if enabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Read configuration from `path`.
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as TOML.
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("failed to read {}: {e}", path.display())))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .map_err(|e| StoreError::Config(format!("failed to parse JSON config: {e}")))?
        } else {
            toml::from_str(&content)
                .map_err(|e| StoreError::Config(format!("failed to parse TOML config: {e}")))?
        };

        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/keyvalue/keyvalue.db"));
        assert!(cfg.preload);
        assert_eq!(cfg.sweep_interval(), None);
        assert_eq!(cfg.busy_timeout_ms, 5_000);
    }

    #[test]
    fn builder_setters() {
        let cfg = StoreConfig::new()
            .with_db_path("/var/lib/kv.db")
            .with_preload(false)
            .with_sweep_interval_secs(30)
            .with_busy_timeout_ms(250);
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/kv.db"));
        assert!(!cfg.preload);
        assert_eq!(cfg.sweep_interval(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.busy_timeout_ms, 250);
    }

    #[test]
    fn zero_interval_disables_sweeper() {
        let cfg = StoreConfig::new().with_sweep_interval_secs(0);
        assert_eq!(cfg.sweep_interval(), None);
    }

    #[test]
    fn load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.toml");
        std::fs::write(&path, "db_path = \"/data/kv.db\"\nsweep_interval_secs = 10\n").unwrap();

        let cfg = StoreConfig::load(&path).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/data/kv.db"));
        assert_eq!(cfg.sweep_interval_secs, Some(10));
        assert!(cfg.preload);
    }

    #[test]
    fn load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, r#"{"preload": false}"#).unwrap();

        let cfg = StoreConfig::load(&path).unwrap();
        assert!(!cfg.preload);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, StoreConfig::default());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.toml");
        std::fs::write(&path, "preload = \"maybe\"").unwrap();

        let err = StoreConfig::load(&path).unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
