//! Per-log chain state: head, accepted digests and the out-of-order buffer.
//!
//! A [`LogChain`] must be driven by one writer at a time. Callers that
//! share it across tasks wrap it in a mutex per log, and drain the buffer
//! under the same lock as the append that released it.

use std::collections::BTreeMap;

use proseline_core::Digest;

use crate::error::{ChainError, Result};
use crate::head::{accept_next, ChainHead, ChainLink, ChainMode};

/// Default bound on buffered out-of-order entries per log.
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Most gap indices reported by one [`Intake::Buffered`].
pub const MAX_MISSING_REPORTED: usize = 128;

/// The health status of a log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogHealth {
    /// Every accepted entry extends the chain and no conflict has been seen.
    #[default]
    Healthy,

    /// Two different entries were offered for the same index.
    Forked {
        /// The index where the fork was detected.
        index: u64,
        /// The accepted digest first, then the conflicting one.
        digests: Vec<Digest>,
    },

    /// An internal invariant failed; the log rejects everything until
    /// recovered by hand.
    Invalid { reason: String },
}

impl LogHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, LogHealth::Healthy)
    }

    pub fn is_forked(&self) -> bool {
        matches!(self, LogHealth::Forked { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, LogHealth::Invalid { .. })
    }
}

/// Result of offering an entry to a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake<P> {
    /// The entry extended the log, possibly releasing buffered successors.
    Appended {
        head: ChainHead,
        /// Newly accepted links in index order, starting with the offered one.
        accepted: Vec<ChainLink<P>>,
        /// Buffered successors dropped because they did not link.
        rejected: Vec<(ChainLink<P>, ChainError)>,
    },
    /// The entry arrived ahead of its predecessor and waits in the buffer.
    Buffered { index: u64, missing: Vec<u64> },
    /// The identical entry was already accepted or buffered.
    Duplicate { index: u64 },
}

/// Chain state for one log.
#[derive(Debug, Clone)]
pub struct LogChain<P> {
    mode: ChainMode,
    digests: Vec<Digest>,
    pending: BTreeMap<u64, ChainLink<P>>,
    health: LogHealth,
    max_pending: usize,
    highest_observed: Option<u64>,
}

impl<P> LogChain<P> {
    /// An empty log.
    pub fn new(mode: ChainMode, max_pending: usize) -> Self {
        Self {
            mode,
            digests: Vec::new(),
            pending: BTreeMap::new(),
            health: LogHealth::Healthy,
            max_pending,
            highest_observed: None,
        }
    }

    /// A log whose entries `0..digests.len()` were persisted earlier.
    pub fn restore(mode: ChainMode, max_pending: usize, digests: Vec<Digest>) -> Self {
        let highest_observed = (digests.len() as u64).checked_sub(1);
        Self {
            digests,
            highest_observed,
            ..Self::new(mode, max_pending)
        }
    }

    pub fn mode(&self) -> ChainMode {
        self.mode
    }

    pub fn head(&self) -> Option<ChainHead> {
        self.digests.last().map(|digest| ChainHead {
            index: self.digests.len() as u64 - 1,
            digest: *digest,
        })
    }

    /// Number of accepted entries.
    pub fn len(&self) -> u64 {
        self.digests.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    pub fn digest_at(&self, index: u64) -> Option<&Digest> {
        usize::try_from(index).ok().and_then(|i| self.digests.get(i))
    }

    pub fn health(&self) -> &LogHealth {
        &self.health
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, index: u64) -> bool {
        self.pending.contains_key(&index)
    }

    /// Indices between the head and the highest buffered entry that have
    /// not arrived, lowest first.
    pub fn missing(&self) -> impl Iterator<Item = u64> + '_ {
        let last = self.pending.last_key_value().map_or(0, |(&last, _)| last);
        (self.len()..last).filter(move |index| !self.pending.contains_key(index))
    }

    /// Quarantine the log.
    pub fn mark_invalid(&mut self, reason: impl Into<String>) {
        self.health = LogHealth::Invalid {
            reason: reason.into(),
        };
        self.pending.clear();
    }

    /// Check a head read back from storage against what this chain has
    /// already observed. A lower index quarantines the log.
    pub fn observe_head(&mut self, stored: Option<&ChainHead>) -> Result<()> {
        let stored_index = stored.map(|h| h.index);
        if stored_index < self.highest_observed {
            let reason = format!(
                "stored head {stored_index:?} is behind observed head {:?}",
                self.highest_observed
            );
            self.mark_invalid(reason.clone());
            return Err(ChainError::LogInvalid { reason });
        }
        self.highest_observed = stored_index.max(self.highest_observed);
        Ok(())
    }

    fn ensure_valid(&self) -> Result<()> {
        match &self.health {
            LogHealth::Invalid { reason } => Err(ChainError::LogInvalid {
                reason: reason.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Classify an entry at an index that is already filled.
    fn check_accepted(&mut self, index: u64, offered: Digest) -> Result<Option<Intake<P>>> {
        let Some(existing) = self.digest_at(index).copied() else {
            return Ok(None);
        };
        if existing == offered {
            return Ok(Some(Intake::Duplicate { index }));
        }
        if !self.health.is_forked() {
            self.health = LogHealth::Forked {
                index,
                digests: vec![existing, offered],
            };
        }
        Err(ChainError::Conflict {
            index,
            existing,
            offered,
        })
    }

    fn push(&mut self, link: &ChainLink<P>) -> Result<ChainHead> {
        let head = accept_next(
            link.index,
            link.prior.as_ref(),
            link.digest,
            self.head().as_ref(),
            self.mode,
        )?;
        self.digests.push(head.digest);
        self.highest_observed = Some(head.index).max(self.highest_observed);
        Ok(head)
    }

    /// Accept an entry only if it is the next one.
    ///
    /// Re-offering an accepted entry is a [`Intake::Duplicate`]; a
    /// different entry at a filled index is a [`ChainError::Conflict`].
    pub fn accept_next(&mut self, link: ChainLink<P>) -> Result<Intake<P>> {
        self.ensure_valid()?;
        if let Some(intake) = self.check_accepted(link.index, link.digest)? {
            return Ok(intake);
        }
        let head = self.push(&link)?;
        Ok(Intake::Appended {
            head,
            accepted: vec![link],
            rejected: Vec::new(),
        })
    }

    /// Accept an entry in any order.
    ///
    /// Entries ahead of the head are buffered by index and accepted once
    /// their predecessor lands; the append that fills the gap drains every
    /// contiguous successor.
    pub fn accept_out_of_order(&mut self, link: ChainLink<P>) -> Result<Intake<P>> {
        self.ensure_valid()?;
        if let Some(intake) = self.check_accepted(link.index, link.digest)? {
            return Ok(intake);
        }

        if link.index > self.len() {
            return self.buffer(link);
        }

        let mut head = self.push(&link)?;
        let mut accepted = vec![link];
        let mut rejected = Vec::new();

        while let Some(next) = self.pending.remove(&head.next_index()) {
            match self.push(&next) {
                Ok(new_head) => {
                    head = new_head;
                    accepted.push(next);
                }
                Err(e) => {
                    rejected.push((next, e));
                    break;
                }
            }
        }

        Ok(Intake::Appended {
            head,
            accepted,
            rejected,
        })
    }

    fn buffer(&mut self, link: ChainLink<P>) -> Result<Intake<P>> {
        let index = link.index;
        if let Some(waiting) = self.pending.get(&index) {
            if waiting.digest == link.digest {
                return Ok(Intake::Duplicate { index });
            }
            return Err(ChainError::Conflict {
                index,
                existing: waiting.digest,
                offered: link.digest,
            });
        }
        // The whole gap up to `index` must fit in the buffer.
        let ahead = index - self.len();
        if ahead > self.max_pending as u64 {
            return Err(ChainError::BufferFull {
                index,
                limit: self.max_pending,
            });
        }
        self.pending.insert(index, link);
        Ok(Intake::Buffered {
            index,
            missing: self.missing().take(MAX_MISSING_REPORTED).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(index: u64) -> Digest {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&index.to_be_bytes());
        bytes[31] = 0xee;
        Digest(bytes)
    }

    fn link(index: u64) -> ChainLink<u64> {
        let prior = index.checked_sub(1).map(d);
        ChainLink::new(index, prior, d(index), index)
    }

    fn chain() -> LogChain<u64> {
        LogChain::new(ChainMode::Verifying, DEFAULT_MAX_PENDING)
    }

    fn head_index<P>(intake: &Intake<P>) -> Option<u64> {
        match intake {
            Intake::Appended { head, .. } => Some(head.index),
            _ => None,
        }
    }

    #[test]
    fn test_contiguous_append() {
        let mut log = chain();
        for i in 0..4 {
            let intake = log.accept_next(link(i)).unwrap();
            assert_eq!(head_index(&intake), Some(i));
        }
        assert_eq!(log.head(), Some(ChainHead { index: 3, digest: d(3) }));
        assert!(log.health().is_healthy());
    }

    #[test]
    fn test_strict_rejects_gap() {
        let mut log = chain();
        log.accept_next(link(0)).unwrap();
        assert_eq!(
            log.accept_next(link(2)),
            Err(ChainError::IndexGap { expected: 1, got: 2 })
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_resubmission_is_idempotent() {
        let mut log = chain();
        log.accept_next(link(0)).unwrap();
        log.accept_next(link(1)).unwrap();
        assert_eq!(log.accept_next(link(0)), Ok(Intake::Duplicate { index: 0 }));
        assert_eq!(
            log.accept_out_of_order(link(1)),
            Ok(Intake::Duplicate { index: 1 })
        );
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_conflict_marks_fork() {
        let mut log = chain();
        log.accept_next(link(0)).unwrap();
        log.accept_next(link(1)).unwrap();

        let forged = ChainLink::new(1, Some(d(0)), d(99), 99);
        assert_eq!(
            log.accept_next(forged),
            Err(ChainError::Conflict {
                index: 1,
                existing: d(1),
                offered: d(99),
            })
        );
        assert_eq!(
            log.health(),
            &LogHealth::Forked {
                index: 1,
                digests: vec![d(1), d(99)],
            }
        );
        assert_eq!(head_index(&log.accept_next(link(2)).unwrap()), Some(2));
    }

    #[test]
    fn test_buffer_and_drain() {
        let mut log = chain();
        log.accept_out_of_order(link(0)).unwrap();

        assert_eq!(
            log.accept_out_of_order(link(3)),
            Ok(Intake::Buffered {
                index: 3,
                missing: vec![1, 2],
            })
        );
        assert_eq!(
            log.accept_out_of_order(link(2)),
            Ok(Intake::Buffered {
                index: 2,
                missing: vec![1],
            })
        );
        assert_eq!(log.missing().collect::<Vec<_>>(), vec![1]);
        assert_eq!(
            log.accept_out_of_order(link(2)),
            Ok(Intake::Duplicate { index: 2 })
        );

        match log.accept_out_of_order(link(1)).unwrap() {
            Intake::Appended {
                head,
                accepted,
                rejected,
            } => {
                assert_eq!(head.index, 3);
                let order: Vec<u64> = accepted.iter().map(|l| l.payload).collect();
                assert_eq!(order, vec![1, 2, 3]);
                assert!(rejected.is_empty());
            }
            other => panic!("expected append, got {other:?}"),
        }
        assert_eq!(log.pending_len(), 0);
        assert_eq!(log.missing().next(), None);
    }

    #[test]
    fn test_unlinked_buffered_entry_rejected_on_drain() {
        let mut log = chain();
        log.accept_out_of_order(link(0)).unwrap();
        log.accept_out_of_order(ChainLink::new(2, Some(d(42)), d(2), 2))
            .unwrap();

        match log.accept_out_of_order(link(1)).unwrap() {
            Intake::Appended {
                head, rejected, ..
            } => {
                assert_eq!(head.index, 1);
                assert_eq!(rejected.len(), 1);
                assert!(matches!(rejected[0].1, ChainError::Linkage { index: 2, .. }));
            }
            other => panic!("expected append, got {other:?}"),
        }
        assert_eq!(head_index(&log.accept_out_of_order(link(2)).unwrap()), Some(2));
    }

    #[test]
    fn test_buffer_bound() {
        let mut log = LogChain::new(ChainMode::Verifying, 2);
        log.accept_out_of_order(link(0)).unwrap();
        log.accept_out_of_order(link(2)).unwrap();
        log.accept_out_of_order(link(3)).unwrap();
        assert_eq!(
            log.accept_out_of_order(link(4)),
            Err(ChainError::BufferFull { index: 4, limit: 2 })
        );
        assert_eq!(log.pending_len(), 2);

        log.accept_out_of_order(link(1)).unwrap();
        assert_eq!(head_index(&log.accept_out_of_order(link(4)).unwrap()), Some(4));
    }

    #[test]
    fn test_far_ahead_index_is_refused() {
        let mut log = LogChain::new(ChainMode::Relaying, DEFAULT_MAX_PENDING);
        log.accept_out_of_order(link(0)).unwrap();
        assert_eq!(
            log.accept_out_of_order(ChainLink::new(u64::MAX, Some(d(7)), d(8), 8)),
            Err(ChainError::BufferFull {
                index: u64::MAX,
                limit: DEFAULT_MAX_PENDING,
            })
        );
        assert_eq!(log.pending_len(), 0);
        assert!(log.health().is_healthy());
    }

    #[test]
    fn test_missing_report_is_capped() {
        let mut log = chain();
        let far = DEFAULT_MAX_PENDING as u64;
        match log.accept_out_of_order(link(far)).unwrap() {
            Intake::Buffered { index, missing } => {
                assert_eq!(index, far);
                assert_eq!(missing.len(), MAX_MISSING_REPORTED);
                assert_eq!(missing.first(), Some(&0));
            }
            other => panic!("expected buffer, got {other:?}"),
        }
        assert_eq!(log.missing().count(), DEFAULT_MAX_PENDING);
    }

    #[test]
    fn test_lower_stored_head_quarantines_log() {
        let mut log = chain();
        for i in 0..3 {
            log.accept_next(link(i)).unwrap();
        }
        log.observe_head(Some(&ChainHead { index: 2, digest: d(2) }))
            .unwrap();

        let err = log
            .observe_head(Some(&ChainHead { index: 1, digest: d(1) }))
            .unwrap_err();
        assert!(matches!(err, ChainError::LogInvalid { .. }));
        assert!(log.health().is_invalid());
        assert!(matches!(
            log.accept_next(link(3)),
            Err(ChainError::LogInvalid { .. })
        ));
    }

    #[test]
    fn test_restore() {
        let mut log: LogChain<u64> =
            LogChain::restore(ChainMode::Verifying, 8, vec![d(0), d(1)]);
        assert_eq!(log.head().map(|h| h.index), Some(1));
        assert_eq!(head_index(&log.accept_next(link(2)).unwrap()), Some(2));
        assert!(log.observe_head(None).is_err());
    }

    proptest! {
        #[test]
        fn prop_any_delivery_order_converges(order in Just((0u64..12).collect::<Vec<_>>()).prop_shuffle()) {
            let mut log = chain();
            for i in order {
                log.accept_out_of_order(link(i)).unwrap();
            }
            prop_assert_eq!(log.head(), Some(ChainHead { index: 11, digest: d(11) }));
            prop_assert_eq!(log.pending_len(), 0);
        }
    }
}
