//! Type-preserving value codec.
//!
//! Values are held natively as [`serde_json::Value`]. On the way to disk
//! every non-string value is written as JSON text and tagged
//! [`ValueKind::Json`]; strings are stored verbatim and tagged
//! [`ValueKind::String`]. Decoding reverses the mapping, so a stored `42`
//! comes back as a number and a stored `"42"` comes back as a string.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::StoreResult;

/// Tag stored alongside the encoded text in the `value_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Self-describing JSON text.
    Json,
    /// Plain string, stored as-is.
    String,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::String => "string",
        }
    }

    /// The tag [`encode`] would give `value`, without serializing it.
    pub fn of(value: &Value) -> Self {
        if value.is_string() {
            Self::String
        } else {
            Self::Json
        }
    }

    /// Parse a stored tag. Anything other than `json` is read as plain text,
    /// which is also the column default.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "json" => Self::Json,
            _ => Self::String,
        }
    }
}

/// Encode a native value into its durable text and tag.
pub fn encode(value: &Value) -> StoreResult<(String, ValueKind)> {
    let kind = ValueKind::of(value);
    let text = match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other)?,
    };
    Ok((text, kind))
}

/// Decode stored text back into a native value.
///
/// Malformed JSON never fails: the raw text is returned as a string and the
/// original type is lost.
pub fn decode(text: &str, kind: ValueKind) -> Value {
    match kind {
        ValueKind::String => Value::String(text.to_string()),
        ValueKind::Json => match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "stored json value is malformed, returning raw text");
                Value::String(text.to_string())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn round_trip(value: Value) -> Value {
        let (text, kind) = encode(&value).unwrap();
        decode(&text, kind)
    }

    #[test]
    fn strings_are_stored_verbatim() {
        let (text, kind) = encode(&json!("hello world")).unwrap();
        assert_eq!(text, "hello world");
        assert_eq!(kind, ValueKind::String);
    }

    #[test]
    fn numeric_looking_strings_stay_strings() {
        assert_eq!(round_trip(json!("42")), json!("42"));
        assert_eq!(round_trip(json!("true")), json!("true"));
    }

    #[test]
    fn scalars_keep_their_type() {
        assert_eq!(round_trip(json!(42)), json!(42));
        assert_eq!(round_trip(json!(-7)), json!(-7));
        assert_eq!(round_trip(json!(3.14159)), json!(3.14159));
        assert_eq!(round_trip(json!(true)), json!(true));
        assert_eq!(round_trip(Value::Null), Value::Null);
    }

    #[test]
    fn nested_structures_survive() {
        let value = json!({
            "name": "probe",
            "tags": ["a", 1, false, null],
            "inner": {"depth": 2, "ratio": 0.5, "list": [[1, 2], {"k": "v"}]}
        });
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn structured_values_are_tagged_json() {
        let (text, kind) = encode(&json!([1, "y", true])).unwrap();
        assert_eq!(kind, ValueKind::Json);
        assert_eq!(text, r#"[1,"y",true]"#);
    }

    #[test]
    fn malformed_json_falls_back_to_raw_text() {
        assert_eq!(decode("{not json", ValueKind::Json), json!("{not json"));
    }

    #[test]
    fn kind_of_agrees_with_encode() {
        for value in [
            json!("s"),
            json!(1),
            json!(2.5),
            json!(false),
            json!([]),
            json!({}),
            Value::Null,
        ] {
            let (_, kind) = encode(&value).unwrap();
            assert_eq!(ValueKind::of(&value), kind, "{value}");
        }
    }

    #[test]
    fn tags_parse_leniently() {
        assert_eq!(ValueKind::from_tag("json"), ValueKind::Json);
        assert_eq!(ValueKind::from_tag("string"), ValueKind::String);
        assert_eq!(ValueKind::from_tag("blob"), ValueKind::String);
        assert_eq!(ValueKind::Json.as_str(), "json");
    }
}
