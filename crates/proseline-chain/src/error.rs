//! Error types for chain validation.

use thiserror::Error;

use proseline_core::Digest;

/// Chain-integrity violations for one log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The entry is not the next index of the log.
    #[error("index gap: expected {expected}, got {got}")]
    IndexGap { expected: u64, got: u64 },

    /// The entry's `prior` does not link to the current head.
    #[error("broken link at index {index}: expected prior {expected:?}, got {got:?}")]
    Linkage {
        index: u64,
        expected: Option<Digest>,
        got: Option<Digest>,
    },

    /// A different entry already occupies the index. Signals a fork.
    #[error("conflict at index {index}: have {existing}, offered {offered}")]
    Conflict {
        index: u64,
        existing: Digest,
        offered: Digest,
    },

    /// The log violated an internal invariant and is quarantined.
    #[error("log is invalid: {reason}")]
    LogInvalid { reason: String },

    /// The entry is further ahead of the head than the out-of-order
    /// buffer can hold.
    #[error("index {index} is more than {limit} entries ahead of the head")]
    BufferFull { index: u64, limit: usize },
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
