//! CLI argument definitions.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// keyvalue -- embedded key-value store with TTL and type-preserving values.
#[derive(Parser)]
#[command(
    name = "keyvalue",
    version,
    about = "Embedded key-value store with TTL and type-preserving values",
    long_about = "Reads and writes a local key-value store backed by SQLite. Values are \
                  JSON; strings, numbers, booleans, lists and mappings keep their type."
)]
pub struct Cli {
    /// Configuration file (TOML, or JSON by extension).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Database file; overrides `db_path` from the configuration.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a value. The value is parsed as JSON, or kept as a string if
    /// it is not valid JSON.
    Set {
        key: String,
        value: String,

        /// Expire the key after this many seconds.
        #[arg(long)]
        ttl: Option<String>,
    },

    /// Print the value stored under a key.
    Get { key: String },

    /// Remove a key.
    Delete { key: String },

    /// Remove every key.
    DeleteAll,

    /// Print every live key with its value and timestamps.
    Dump,

    /// Run a single JSON command envelope.
    Exec {
        /// e.g. '{"command": "get", "key": "a"}'
        envelope: String,
    },

    /// Read JSON command envelopes from stdin, one per line, and print one
    /// response per line.
    Shell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_defaults_to_info() {
        let cli = Cli::try_parse_from(["keyvalue", "dump"]).unwrap();
        assert_eq!(cli.log_level, "info");
        assert!(matches!(cli.command, Commands::Dump));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli =
            Cli::try_parse_from(["keyvalue", "get", "a", "--db", "/tmp/x.db", "--log-level", "debug"])
                .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Get { ref key } if key == "a"));
    }
}
