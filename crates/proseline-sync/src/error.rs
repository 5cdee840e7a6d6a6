//! Error types for the replication protocol.

use thiserror::Error;

use proseline_core::ValidationError;
use proseline_seal::SealError;

/// Errors decoding replication messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The message is structurally invalid.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationError),

    /// The message carried an invalid envelope.
    #[error("invalid envelope: {0}")]
    Envelope(#[from] SealError),

    /// The `type` tag is not a known message type.
    #[error("unknown message type: {0:?}")]
    UnknownType(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
