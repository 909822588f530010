//! CLI entry point for the keyvalue store.
//!
//! Every subcommand is turned into a JSON command envelope and routed
//! through the same [`CommandDispatcher`] a host would use, so the CLI sees
//! exactly the responses the store produces.

mod cli;
mod helpers;

use std::io::{self, BufRead, Write as _};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use keyvalue_store::{CommandDispatcher, KeyValueStore};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::cli::{Cli, Commands};
use crate::helpers::{init_tracing, parse_value, resolve_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = resolve_config(&cli)?;
    let store = KeyValueStore::open(config)
        .await
        .context("failed to open key-value store")?;
    let store = Arc::new(store);
    let _sweeper = store.start_sweeper();
    let dispatcher = CommandDispatcher::new(store);

    match cli.command {
        Commands::Set { key, value, ttl } => {
            let mut envelope = json!({"command": "set", "key": key, "value": parse_value(&value)});
            if let Some(ttl) = ttl {
                envelope["ttl_seconds"] = parse_value(&ttl);
            }
            run_one(&dispatcher, &envelope).await
        }
        Commands::Get { key } => {
            run_one(&dispatcher, &json!({"command": "get", "key": key})).await
        }
        Commands::Delete { key } => {
            run_one(&dispatcher, &json!({"command": "delete", "key": key})).await
        }
        Commands::DeleteAll => run_one(&dispatcher, &json!({"command": "delete_all"})).await,
        Commands::Dump => {
            let readings = dispatcher.store().readings().await?;
            print_json(&readings)
        }
        Commands::Exec { envelope } => {
            let envelope: Value =
                serde_json::from_str(&envelope).context("envelope is not valid JSON")?;
            run_one(&dispatcher, &envelope).await
        }
        Commands::Shell => cmd_shell(&dispatcher).await,
    }
}

/// Dispatch one envelope, print the response, and fail the process on error.
async fn run_one(dispatcher: &CommandDispatcher, envelope: &Value) -> Result<()> {
    let response = dispatcher.dispatch(envelope).await;
    print_json(&response)?;
    match response.get("error").and_then(Value::as_str) {
        Some(message) => anyhow::bail!("{message}"),
        None => Ok(()),
    }
}

async fn cmd_shell(dispatcher: &CommandDispatcher) -> Result<()> {
    info!("reading command envelopes from stdin");
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read input")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Ok(envelope) => dispatcher.dispatch(&envelope).await,
            Err(err) => {
                debug!(%err, "rejected malformed line");
                json!({"error": format!("invalid JSON: {err}"), "error_kind": "invalid_argument"})
            }
        };
        println!("{}", serde_json::to_string(&response)?);
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
