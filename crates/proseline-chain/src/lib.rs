//! # Proseline Chain
//!
//! Chain integrity for Proseline logs.
//!
//! Each log is a hash chain: entry `n` carries the digest of entry `n - 1`
//! as `prior`. [`LogChain`] tracks the head of one log, rejects gaps and
//! broken links, treats resubmission as a no-op, reports conflicting
//! entries as forks, and buffers entries that arrive before their
//! predecessor.
//!
//! Drafts form a second structure over the chain: [`DraftGraph`] resolves
//! draft parents across every log of a project.
//!
//! ## Key Types
//!
//! - [`ChainHead`] - `(index, digest)` of the last accepted entry
//! - [`ChainLink`] - An entry reduced to index, prior, digest and payload
//! - [`LogChain`] - Per-log state machine
//! - [`LogHealth`] - Healthy, forked, or quarantined
//! - [`DraftGraph`] - Pending/resolved drafts

pub mod drafts;
pub mod error;
pub mod head;
pub mod log;

pub use drafts::{DraftGraph, DraftStatus};
pub use error::{ChainError, Result};
pub use head::{accept_next, ChainHead, ChainLink, ChainMode};
pub use log::{Intake, LogChain, LogHealth, DEFAULT_MAX_PENDING, MAX_MISSING_REPORTED};
