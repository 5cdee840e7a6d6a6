//! Chain heads and the single-step acceptance rule.

use proseline_core::Digest;

use crate::error::{ChainError, Result};

/// The `(index, digest)` of the most recently accepted entry of a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainHead {
    pub index: u64,
    pub digest: Digest,
}

impl ChainHead {
    /// Index the next entry must carry.
    pub fn next_index(&self) -> u64 {
        self.index + 1
    }
}

/// How much of an entry the accepting peer can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainMode {
    /// The peer holds the read key: `prior` links are checked against
    /// entry digests.
    #[default]
    Verifying,
    /// The peer only stores and forwards: digests are envelope digests and
    /// linkage cannot be checked.
    Relaying,
}

/// One entry offered to a log, reduced to what the chain needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink<P> {
    pub index: u64,
    pub prior: Option<Digest>,
    /// Digest identifying this entry: the entry digest when verifying, the
    /// envelope digest when relaying.
    pub digest: Digest,
    pub payload: P,
}

impl<P> ChainLink<P> {
    pub fn new(index: u64, prior: Option<Digest>, digest: Digest, payload: P) -> Self {
        Self {
            index,
            prior,
            digest,
            payload,
        }
    }
}

/// Check that an entry extends `head` and return the new head.
///
/// An empty log (`head == None`) accepts only index 0, which must not carry
/// a `prior`. Every later entry must carry the current head's digest as
/// `prior`. Linkage is skipped in [`ChainMode::Relaying`].
pub fn accept_next(
    index: u64,
    prior: Option<&Digest>,
    digest: Digest,
    head: Option<&ChainHead>,
    mode: ChainMode,
) -> Result<ChainHead> {
    let expected = head.map_or(0, ChainHead::next_index);
    if index != expected {
        return Err(ChainError::IndexGap {
            expected,
            got: index,
        });
    }

    if mode == ChainMode::Verifying {
        let expected_prior = head.map(|h| h.digest);
        if prior.copied() != expected_prior {
            return Err(ChainError::Linkage {
                index,
                expected: expected_prior,
                got: prior.copied(),
            });
        }
    }

    Ok(ChainHead { index, digest })
}
