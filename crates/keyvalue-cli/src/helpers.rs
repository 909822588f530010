//! Shared helper functions used across CLI subcommands.

use anyhow::{Context, Result};
use keyvalue_store::StoreConfig;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Initialize the tracing subscriber with the given default log level.
///
/// Logs go to stderr so stdout carries only command output.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Build the store configuration from the config file and CLI overrides.
pub fn resolve_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config = config.with_db_path(db.clone());
    }
    Ok(config)
}

/// Interpret a command-line value: JSON if it parses, a plain string otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
