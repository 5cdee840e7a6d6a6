//! Field accessors for JSON wire structures.
//!
//! Every accessor reports failures as a [`ValidationError`] naming the
//! field, so decoders never need to unwrap.

use serde_json::{Map, Value};

use crate::encoding::BinaryEncoding;
use crate::error::{ValidationError, ValidationReason};

/// A JSON object being decoded.
pub type Object = Map<String, Value>;

/// View a value as an object.
pub fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Object, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::wrong_type(field, "object"))
}

/// Get a required field.
pub fn required<'a>(object: &'a Object, field: &str) -> Result<&'a Value, ValidationError> {
    object.get(field).ok_or_else(|| ValidationError::missing(field))
}

/// Get a required string field.
pub fn string<'a>(object: &'a Object, field: &str) -> Result<&'a str, ValidationError> {
    required(object, field)?
        .as_str()
        .ok_or_else(|| ValidationError::wrong_type(field, "string"))
}

/// Get an optional string field.
pub fn opt_string<'a>(object: &'a Object, field: &str) -> Result<Option<&'a str>, ValidationError> {
    match object.get(field) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| ValidationError::wrong_type(field, "string")),
    }
}

/// Get a required non-negative integer field.
pub fn uint(object: &Object, field: &str) -> Result<u64, ValidationError> {
    required(object, field)?
        .as_u64()
        .ok_or_else(|| ValidationError::wrong_type(field, "non-negative integer"))
}

/// Get a required fixed-length binary field.
pub fn bytes<const N: usize>(
    object: &Object,
    field: &str,
    encoding: BinaryEncoding,
) -> Result<[u8; N], ValidationError> {
    let text = string(object, field)?;
    encoding
        .decode_exact::<N>(text)
        .map_err(|e| ValidationError::new(field, ValidationReason::Encoding(e)))
}

/// Get an optional fixed-length binary field.
pub fn opt_bytes<const N: usize>(
    object: &Object,
    field: &str,
    encoding: BinaryEncoding,
) -> Result<Option<[u8; N]>, ValidationError> {
    if object.contains_key(field) {
        bytes::<N>(object, field, encoding).map(Some)
    } else {
        Ok(None)
    }
}

/// Get a required variable-length binary field.
pub fn var_bytes(
    object: &Object,
    field: &str,
    encoding: BinaryEncoding,
) -> Result<Vec<u8>, ValidationError> {
    let text = string(object, field)?;
    encoding
        .decode(text)
        .map_err(|e| ValidationError::new(field, ValidationReason::Encoding(e)))
}

/// Reject any key not in `allowed`.
pub fn deny_unknown(object: &Object, allowed: &[&str]) -> Result<(), ValidationError> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ValidationError::new(
            key.as_str(),
            ValidationReason::Unexpected,
        )),
        None => Ok(()),
    }
}
