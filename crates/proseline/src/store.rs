//! Store trait: the minimal interface for envelope persistence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use proseline_chain::ChainHead;
use proseline_core::{Digest, PublicKey};
use proseline_seal::OuterEnvelope;

use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// An accepted envelope at its position in a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub index: u64,
    /// Entry digest for readers, envelope digest for relays.
    pub digest: Digest,
    pub envelope: OuterEnvelope,
}

/// Result of appending an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Appended; the log head is now this entry.
    Inserted,
    /// The same entry is already stored (idempotent, not an error).
    AlreadyExists,
    /// A different entry is stored at this index.
    Conflict { existing: Digest },
}

/// Persistence of accepted envelopes keyed by `(log, index)`.
///
/// Appending an entry and moving the log head are one atomic step: a
/// reader never sees a head without its entry.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append the entry following the current head.
    async fn append(&self, log: &PublicKey, entry: StoredEntry) -> StoreResult<InsertResult>;

    /// The envelope at a position.
    async fn get(&self, log: &PublicKey, index: u64) -> StoreResult<Option<OuterEnvelope>>;

    async fn head(&self, log: &PublicKey) -> StoreResult<Option<ChainHead>>;

    /// Digests of the log's entries, in index order from 0.
    async fn digests(&self, log: &PublicKey) -> StoreResult<Vec<Digest>>;

    /// Every log with at least one entry.
    async fn logs(&self) -> StoreResult<Vec<PublicKey>>;
}

/// In-memory store for testing and simple use cases.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    logs: RwLock<HashMap<PublicKey, Vec<StoredEntry>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, log: &PublicKey, entry: StoredEntry) -> StoreResult<InsertResult> {
        let mut logs = self.logs.write().map_err(|_| StoreError::Poisoned)?;
        let entries = logs.entry(*log).or_default();
        let len = entries.len() as u64;

        if entry.index < len {
            let existing = entries[entry.index as usize].digest;
            return Ok(if existing == entry.digest {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Conflict { existing }
            });
        }
        if entry.index > len {
            return Err(StoreError::OutOfOrder {
                log: *log,
                expected: len,
                got: entry.index,
            });
        }

        entries.push(entry);
        Ok(InsertResult::Inserted)
    }

    async fn get(&self, log: &PublicKey, index: u64) -> StoreResult<Option<OuterEnvelope>> {
        let logs = self.logs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(logs
            .get(log)
            .and_then(|entries| usize::try_from(index).ok().and_then(|i| entries.get(i)))
            .map(|stored| stored.envelope.clone()))
    }

    async fn head(&self, log: &PublicKey) -> StoreResult<Option<ChainHead>> {
        let logs = self.logs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(logs
            .get(log)
            .and_then(|entries| entries.last())
            .map(|last| ChainHead {
                index: last.index,
                digest: last.digest,
            }))
    }

    async fn digests(&self, log: &PublicKey) -> StoreResult<Vec<Digest>> {
        let logs = self.logs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(logs
            .get(log)
            .map(|entries| entries.iter().map(|e| e.digest).collect())
            .unwrap_or_default())
    }

    async fn logs(&self) -> StoreResult<Vec<PublicKey>> {
        let logs = self.logs.read().map_err(|_| StoreError::Poisoned)?;
        let mut keys: Vec<PublicKey> = logs
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(key, _)| *key)
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Lets several books, or a book and its caller, share one store.
#[async_trait]
impl<S: LogStore + ?Sized> LogStore for Arc<S> {
    async fn append(&self, log: &PublicKey, entry: StoredEntry) -> StoreResult<InsertResult> {
        (**self).append(log, entry).await
    }

    async fn get(&self, log: &PublicKey, index: u64) -> StoreResult<Option<OuterEnvelope>> {
        (**self).get(log, index).await
    }

    async fn head(&self, log: &PublicKey) -> StoreResult<Option<ChainHead>> {
        (**self).head(log).await
    }

    async fn digests(&self, log: &PublicKey) -> StoreResult<Vec<Digest>> {
        (**self).digests(log).await
    }

    async fn logs(&self) -> StoreResult<Vec<PublicKey>> {
        (**self).logs().await
    }
}
