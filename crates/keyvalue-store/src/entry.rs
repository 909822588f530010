//! The stored unit for one key.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::ValueKind;

/// Current time as Unix epoch seconds with microsecond precision.
pub fn now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// One key's value together with its type tag and timing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Value,
    pub kind: ValueKind,
    /// TTL exactly as the caller supplied it, if any.
    pub ttl_input: Option<String>,
    pub created_at: f64,
    /// Absolute expiry; `None` means the entry never expires.
    pub expires_at: Option<f64>,
}

impl Entry {
    /// Whether the entry is logically deleted at `now`.
    pub fn is_expired(&self, now: f64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// The public view of this entry.
    pub fn reading(&self) -> Reading {
        Reading {
            value: self.value.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// What a read returns for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: Value,
    pub created_at: f64,
    pub expires_at: Option<f64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(expires_at: Option<f64>) -> Entry {
        Entry {
            key: "k".into(),
            value: json!(1),
            kind: ValueKind::Json,
            ttl_input: None,
            created_at: 100.0,
            expires_at,
        }
    }

    #[test]
    fn never_expires_without_deadline() {
        assert!(!entry(None).is_expired(f64::MAX));
    }

    #[test]
    fn expires_at_deadline_inclusive() {
        let e = entry(Some(110.0));
        assert!(!e.is_expired(109.9));
        assert!(e.is_expired(110.0));
        assert!(e.is_expired(111.0));
    }

    #[test]
    fn now_is_recent() {
        let t = now();
        assert!(t > 1_600_000_000.0);
    }

    #[test]
    fn reading_serializes_null_expiry() {
        let reading = entry(None).reading();
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(
            json,
            json!({"value": 1, "created_at": 100.0, "expires_at": null})
        );
    }
}
