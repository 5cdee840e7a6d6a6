//! Canonical JSON encoding for signing and hashing.
//!
//! Signatures and digests are computed over a deterministic byte form:
//! - Compact output, no insignificant whitespace
//! - Object keys sorted by their UTF-8 bytes
//! - Integers only (floats have no canonical form and are rejected)
//! - Strings escaped exactly as `serde_json` escapes them
//!
//! **CRITICAL**: This encoding is FROZEN. Changes break all existing
//! signatures and every `prior` link in every log.

use serde_json::Value;

use crate::error::CoreError;

/// Produces the canonical byte form of a JSON value.
pub trait CanonicalEncoder: Send + Sync {
    /// Encode a value to canonical bytes.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CoreError>;
}

/// The sorted-key compact JSON encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalJson;

impl CanonicalEncoder for CanonicalJson {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        encode_value_to(&mut buf, value)?;
        Ok(buf)
    }
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(b) => buf.extend_from_slice(if *b { "true" } else { "false" }.as_bytes()),
        Value::Number(n) => {
            if !(n.is_u64() || n.is_i64()) {
                return Err(CoreError::Encoding(format!(
                    "non-integer number {n} has no canonical form"
                )));
            }
            buf.extend_from_slice(n.to_string().as_bytes());
        }
        Value::String(s) => encode_string(buf, s)?,
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item)?;
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            buf.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_string(buf, key)?;
                buf.push(b':');
                encode_value_to(buf, item)?;
            }
            buf.push(b'}');
        }
    }
    Ok(())
}

fn encode_string(buf: &mut Vec<u8>, s: &str) -> Result<(), CoreError> {
    serde_json::to_writer(&mut *buf, s).map_err(|e| CoreError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map};

    fn encode(value: &Value) -> String {
        String::from_utf8(CanonicalJson.encode(value).unwrap()).unwrap()
    }

    #[test]
    fn test_keys_sorted_recursively() {
        let value = json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "index": 3,
            "range": { "start": 1, "end": 4 },
            "kind": "note"
        });
        assert_eq!(
            encode(&value),
            r#"{"index":3,"kind":"note","range":{"end":4,"start":1},"timestamp":"2024-01-01T00:00:00Z"}"#
        );
    }

    #[test]
    fn test_deterministic() {
        let a = json!({ "b": [1, 2, { "z": null, "a": true }], "a": "x" });
        assert_eq!(CanonicalJson.encode(&a).unwrap(), CanonicalJson.encode(&a).unwrap());
        assert_eq!(encode(&a), r#"{"a":"x","b":[1,2,{"a":true,"z":null}]}"#);
    }

    #[test]
    fn test_string_escaping() {
        let value = json!({ "text": "line\n\"quoted\" \u{00e9}" });
        assert_eq!(encode(&value), "{\"text\":\"line\\n\\\"quoted\\\" \u{00e9}\"}");
    }

    #[test]
    fn test_floats_rejected() {
        let value = json!({ "ratio": 0.5 });
        assert!(matches!(
            CanonicalJson.encode(&value),
            Err(CoreError::Encoding(_))
        ));
    }

    #[test]
    fn test_negative_integers_allowed() {
        assert_eq!(encode(&json!([-1, 0, 18446744073709551615u64])), "[-1,0,18446744073709551615]");
    }

    #[test]
    fn test_canonical_output_reparses_to_same_value() {
        let value = json!({ "text": { "blocks": ["a", "b"] }, "parents": [] });
        let bytes = CanonicalJson.encode(&value).unwrap();
        let reparsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reparsed, value);
        assert_eq!(CanonicalJson.encode(&reparsed).unwrap(), bytes);
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[ -~]{0,12}".prop_map(Value::String),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|members| {
                    Value::Object(members.into_iter().collect::<Map<_, _>>())
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_integer_json_reparses_and_reencodes(sample in value()) {
            let bytes = CanonicalJson.encode(&sample).unwrap();
            let reparsed: Value = serde_json::from_slice(&bytes).unwrap();
            prop_assert_eq!(&reparsed, &sample);
            prop_assert_eq!(CanonicalJson.encode(&reparsed).unwrap(), bytes);
        }
    }
}
