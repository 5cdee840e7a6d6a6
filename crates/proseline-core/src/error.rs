//! Error types for Proseline core.

use std::fmt;
use thiserror::Error;

use crate::encoding::EncodingError;

/// Core errors from cryptographic and encoding operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed")]
    Decryption,

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// An entry carried a `kind` tag the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entry kind: {0:?}")]
pub struct UnknownKindError(pub String);

/// A structural problem with one field of a candidate structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid field `{field}`: {reason}")]
pub struct ValidationError {
    /// Name of the offending field (`$` for the structure itself).
    pub field: String,
    /// What was wrong with it.
    pub reason: ValidationReason,
}

impl ValidationError {
    /// Create a validation error for a field.
    pub fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    /// Shorthand for a missing required field.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ValidationReason::Missing)
    }

    /// Shorthand for a field of the wrong JSON type.
    pub fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self::new(field, ValidationReason::WrongType { expected })
    }
}

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    Missing,
    Unexpected,
    WrongType { expected: &'static str },
    Length { min: usize, max: Option<usize>, actual: usize },
    Encoding(EncodingError),
    TooMany { max: usize, actual: usize },
    Duplicate,
    Pattern(&'static str),
    Mismatch { expected: String, actual: String },
    Inconsistent(&'static str),
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::Missing => f.write_str("required field is missing"),
            ValidationReason::Unexpected => f.write_str("field is not allowed here"),
            ValidationReason::WrongType { expected } => write!(f, "expected {expected}"),
            ValidationReason::Length { min, max, actual } => match max {
                Some(max) => write!(f, "length {actual} outside {min}..={max}"),
                None => write!(f, "length {actual} below minimum {min}"),
            },
            ValidationReason::Encoding(e) => write!(f, "{e}"),
            ValidationReason::TooMany { max, actual } => {
                write!(f, "{actual} items, at most {max} allowed")
            }
            ValidationReason::Duplicate => f.write_str("items must be unique"),
            ValidationReason::Pattern(pattern) => write!(f, "does not match {pattern}"),
            ValidationReason::Mismatch { expected, actual } => {
                write!(f, "expected {expected:?}, got {actual:?}")
            }
            ValidationReason::Inconsistent(why) => f.write_str(why),
        }
    }
}

/// Failure to validate a whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(transparent)]
    UnknownKind(#[from] UnknownKindError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl SchemaError {
    /// The field that failed, if this is a structural error.
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::UnknownKind(_) => None,
            SchemaError::Invalid(e) => Some(&e.field),
        }
    }
}
