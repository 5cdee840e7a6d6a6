//! Error types for the protocol API.

use thiserror::Error;

use proseline_chain::ChainError;
use proseline_core::{CoreError, DiscoveryKey, PublicKey, SchemaError, ValidationError};
use proseline_seal::SealError;
use proseline_sync::SyncError;

/// Errors from a [`LogStore`](crate::LogStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Entries must be appended in index order.
    #[error("log {log}: expected index {expected}, got {got}")]
    OutOfOrder {
        log: PublicKey,
        expected: u64,
        got: u64,
    },

    /// Backend failure.
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Envelope or invitation failure.
    #[error("envelope error: {0}")]
    Seal(#[from] SealError),

    /// Chain integrity failure.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The envelope belongs to another project.
    #[error("envelope for foreign project {discovery_key}")]
    ForeignProject { discovery_key: DiscoveryKey },

    /// Not authorized.
    #[error("not authorized: {0}")]
    NotAuthorized(String),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
