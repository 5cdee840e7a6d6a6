//! Error types for envelope and invitation handling.

use std::fmt;
use thiserror::Error;

use proseline_core::{CoreError, SchemaError, ValidationError};

/// Which of an envelope's signatures a failure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureRole {
    /// Signature by the log's own key.
    Log,
    /// Signature by the project (write) key.
    Project,
    /// Optional signature by a client key.
    Client,
}

impl SignatureRole {
    /// Name of the JSON field carrying this signature.
    pub const fn field(self) -> &'static str {
        match self {
            SignatureRole::Log => "logSignature",
            SignatureRole::Project => "projectSignature",
            SignatureRole::Client => "clientSignature",
        }
    }
}

impl fmt::Display for SignatureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureRole::Log => f.write_str("log"),
            SignatureRole::Project => f.write_str("project"),
            SignatureRole::Client => f.write_str("client"),
        }
    }
}

/// Errors from sealing, opening and verifying envelopes and invitations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// AEAD authentication failed: tampering, wrong key or wrong nonce.
    #[error("decryption of `{field}` failed")]
    Decrypt { field: &'static str },

    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// A signature did not verify.
    #[error("{which} signature is invalid")]
    Signature { which: SignatureRole },

    /// A signature the verifier requires was not present.
    #[error("{which} signature is missing")]
    MissingSignature { which: SignatureRole },

    /// A field in clear disagrees with the sealed entry.
    #[error("envelope field `{field}` does not match the sealed entry")]
    Mismatch { field: &'static str },

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u64),

    /// Decrypted content is not a well-formed structure.
    #[error("malformed sealed content: {0}")]
    Malformed(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for seal operations.
pub type Result<T> = std::result::Result<T, SealError>;
