//! Command envelopes.
//!
//! A command is a JSON object with a `command` field naming the operation:
//!
//! ```text
//! { "command": "set",        "key": "k", "value": <any>, "ttl_seconds": 10 }
//! { "command": "get",        "key": "k" }
//! { "command": "delete",     "key": "k" }
//! { "command": "delete_all" }
//! ```
//!
//! [`CommandDispatcher::dispatch`] never fails: every outcome is a JSON
//! object carrying either `"success": true` or an `"error"` message.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;

/// A parsed, validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set {
        key: String,
        value: Value,
        ttl_seconds: Option<Value>,
    },
    Get {
        key: String,
    },
    Delete {
        key: String,
    },
    DeleteAll,
}

impl Command {
    /// Parse an envelope. Unknown names become [`StoreError::UnknownCommand`];
    /// missing or empty arguments become [`StoreError::InvalidArgument`].
    pub fn parse(envelope: &Value) -> StoreResult<Self> {
        let Some(fields) = envelope.as_object() else {
            return Err(StoreError::InvalidArgument(
                "command envelope must be a JSON object".into(),
            ));
        };

        let name = match fields.get("command") {
            Some(Value::String(name)) => name.as_str(),
            Some(other) => return Err(StoreError::UnknownCommand(other.to_string())),
            None => return Err(StoreError::UnknownCommand("null".into())),
        };

        match name {
            "set" => {
                let key = key_arg(fields);
                let value = fields.get("value").filter(|v| !v.is_null());
                let (Some(key), Some(value)) = (key, value) else {
                    return Err(StoreError::InvalidArgument(
                        "Both 'key' and 'value' are required for set command".into(),
                    ));
                };
                Ok(Self::Set {
                    key,
                    value: value.clone(),
                    ttl_seconds: fields.get("ttl_seconds").filter(|v| !v.is_null()).cloned(),
                })
            }
            "get" => Ok(Self::Get {
                key: required_key(fields, "get")?,
            }),
            "delete" => Ok(Self::Delete {
                key: required_key(fields, "delete")?,
            }),
            "delete_all" => Ok(Self::DeleteAll),
            other => Err(StoreError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Get { .. } => "get",
            Self::Delete { .. } => "delete",
            Self::DeleteAll => "delete_all",
        }
    }
}

/// Keys may arrive as strings, numbers or booleans; all are used as text.
fn key_arg(fields: &Map<String, Value>) -> Option<String> {
    let key = match fields.get("key")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!key.is_empty()).then_some(key)
}

fn required_key(fields: &Map<String, Value>, command: &str) -> StoreResult<String> {
    key_arg(fields).ok_or_else(|| {
        StoreError::InvalidArgument(format!("'key' is required for {command} command"))
    })
}

// ── dispatcher ───────────────────────────────────────────────────────

/// Routes envelopes to a shared [`KeyValueStore`].
#[derive(Clone)]
pub struct CommandDispatcher {
    store: Arc<KeyValueStore>,
}

impl CommandDispatcher {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    /// Run one envelope and render the outcome as a response object.
    pub async fn dispatch(&self, envelope: &Value) -> Value {
        let result = match Command::parse(envelope) {
            Ok(command) => {
                debug!(command = command.name(), "dispatching command");
                self.execute(command).await
            }
            Err(err) => Err(err),
        };

        result.unwrap_or_else(|err| {
            warn!(kind = err.kind(), %err, "command failed");
            error_response(&err)
        })
    }

    /// Run an already-parsed command.
    pub async fn execute(&self, command: Command) -> StoreResult<Value> {
        match command {
            Command::Set {
                key,
                value,
                ttl_seconds,
            } => {
                let entry = self.store.set(&key, value, ttl_seconds.as_ref()).await?;
                Ok(json!({
                    "success": true,
                    "key": entry.key,
                    "value": entry.value,
                }))
            }
            Command::Get { key } => {
                let reading = self.store.get(&key).await?;
                Ok(json!({
                    "success": true,
                    "key": key,
                    "value": reading.value,
                    "created_at": reading.created_at,
                    "expires_at": reading.expires_at,
                }))
            }
            Command::Delete { key } => {
                let deleted = self.store.delete(&key).await?;
                Ok(json!({ "success": true, "key": key, "deleted": deleted }))
            }
            Command::DeleteAll => {
                let removed = self.store.delete_all().await;
                Ok(json!({ "success": true, "deleted_count": removed }))
            }
        }
    }
}

/// `{"error": <message>, "error_kind": <code>}`.
pub fn error_response(err: &StoreError) -> Value {
    json!({ "error": err.to_string(), "error_kind": err.kind() })
}

// ── tests ────────────────────────────────────────────────────────────
