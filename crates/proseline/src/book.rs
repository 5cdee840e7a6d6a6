//! The log book: intake, storage and replication of one project's logs.
//!
//! Intake is serialized per log and independent across logs. Each log's
//! chain state sits behind its own mutex, and the out-of-order buffer is
//! drained under the lock of the append that released it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use proseline_chain::{
    ChainError, ChainHead, ChainLink, ChainMode, DraftGraph, DraftStatus, Intake, LogChain,
    LogHealth,
};
use proseline_core::{Digest, DiscoveryKey, LogEntry, PublicKey, ReadKey};
use proseline_seal::{EnvelopeCodec, InnerEnvelope, OuterEnvelope};
use proseline_sync::{
    limits, make_reference, offers_for, requests_for, Reference, ReplicationMessage,
};

use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::project::ProjectKeys;
use crate::store::{InsertResult, LogStore, StoredEntry};

/// What this peer can do with the project's envelopes.
#[derive(Debug, Clone)]
enum Access {
    /// Holds the read key: decrypts, verifies and checks linkage.
    Reader {
        read_key: ReadKey,
        project: PublicKey,
        client: Option<PublicKey>,
    },
    /// Holds only the discovery key: stores and forwards.
    Relay,
}

/// An envelope accepted or buffered by a chain.
#[derive(Debug, Clone)]
struct Received {
    envelope: OuterEnvelope,
    /// The opened entry, for readers.
    entry: Option<LogEntry>,
}

type SharedChain = Arc<Mutex<LogChain<Received>>>;

/// Result of receiving an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The envelope extended its log, possibly with buffered successors.
    Appended {
        head: ChainHead,
        /// Every entry appended, in index order.
        appended: Vec<Reference>,
        /// Buffered successors dropped because they did not link.
        rejected: Vec<(Reference, ChainError)>,
        /// Drafts whose ancestry became complete.
        drafts: Vec<Digest>,
    },
    /// The envelope waits for its predecessors.
    Buffered { missing: Vec<Reference> },
    /// The envelope was already received.
    Duplicate,
}

/// Intake and replication state of one project.
pub struct LogBook<S: LogStore> {
    discovery_key: DiscoveryKey,
    access: Access,
    codec: EnvelopeCodec,
    config: ProtocolConfig,
    store: Arc<S>,
    chains: Mutex<HashMap<PublicKey, SharedChain>>,
    drafts: Mutex<DraftGraph>,
}

impl<S: LogStore> LogBook<S> {
    /// A book for a peer holding the project's read key.
    pub fn reader(keys: &ProjectKeys, store: S, config: ProtocolConfig) -> Self {
        let access = Access::Reader {
            read_key: keys.read_key().clone(),
            project: keys.project_public_key(),
            client: None,
        };
        Self::with_access(keys.discovery_key(), access, store, config)
    }

    /// A book for a peer that replicates without reading.
    pub fn relay(discovery_key: DiscoveryKey, store: S, config: ProtocolConfig) -> Self {
        Self::with_access(discovery_key, Access::Relay, store, config)
    }

    fn with_access(
        discovery_key: DiscoveryKey,
        access: Access,
        store: S,
        config: ProtocolConfig,
    ) -> Self {
        Self {
            discovery_key,
            access,
            codec: EnvelopeCodec::new(config.envelope()),
            config,
            store: Arc::new(store),
            chains: Mutex::new(HashMap::new()),
            drafts: Mutex::new(DraftGraph::new()),
        }
    }

    /// Require every entry to carry a valid signature by this client key.
    /// Relays cannot check signatures and ignore it.
    pub fn with_client_key(mut self, key: PublicKey) -> Self {
        if let Access::Reader { client, .. } = &mut self.access {
            *client = Some(key);
        }
        self
    }

    pub fn discovery_key(&self) -> DiscoveryKey {
        self.discovery_key
    }

    pub fn is_relay(&self) -> bool {
        matches!(self.access, Access::Relay)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn mode(&self) -> ChainMode {
        match self.access {
            Access::Reader { .. } => ChainMode::Verifying,
            Access::Relay => ChainMode::Relaying,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Intake
    // ─────────────────────────────────────────────────────────────────────────

    /// Receive an envelope from the network or from a local writer.
    ///
    /// Envelopes may arrive in any order. Re-receiving an accepted envelope
    /// is [`Outcome::Duplicate`]; a different envelope at a filled index is
    /// a [`ChainError::Conflict`] and marks the log forked.
    pub async fn receive(&self, envelope: OuterEnvelope) -> Result<Outcome> {
        let log = envelope.log_public_key;
        let index = envelope.index;

        if envelope.discovery_key != self.discovery_key {
            warn!(log = %log, index, reason = "foreign project", "rejected envelope");
            return Err(Error::ForeignProject {
                discovery_key: envelope.discovery_key,
            });
        }

        let link = self.link(envelope).map_err(|e| {
            warn!(log = %log, index, reason = %e, "rejected envelope");
            e
        })?;

        let chain = self.chain(&log).await?;
        let mut chain = chain.lock().await;

        let intake = chain.accept_out_of_order(link).map_err(|e| {
            warn!(log = %log, index, reason = %e, "rejected envelope");
            e
        })?;

        match intake {
            Intake::Duplicate { index } => {
                debug!(log = %log, index, "duplicate");
                Ok(Outcome::Duplicate)
            }
            Intake::Buffered { index, missing } => {
                debug!(log = %log, index, missing = missing.len(), "buffered");
                Ok(Outcome::Buffered {
                    missing: missing.into_iter().map(|i| make_reference(log, i)).collect(),
                })
            }
            Intake::Appended {
                head,
                accepted,
                rejected,
            } => {
                let mut appended = Vec::with_capacity(accepted.len());
                let mut drafts = Vec::new();
                for link in &accepted {
                    self.persist(&mut chain, &log, link).await?;
                    appended.push(make_reference(log, link.index));
                    if let Some(parents) = link.payload.entry.as_ref().and_then(|e| e.draft_parents()) {
                        drafts.extend(self.resolve_draft(link.digest, parents).await);
                    }
                }

                let stored = self.store.head(&log).await?;
                chain.observe_head(stored.as_ref()).map_err(|e| {
                    warn!(log = %log, index = head.index, reason = %e, "quarantined log");
                    e
                })?;

                let rejected = rejected
                    .into_iter()
                    .map(|(link, e)| {
                        warn!(log = %log, index = link.index, reason = %e, "dropped buffered envelope");
                        (make_reference(log, link.index), e)
                    })
                    .collect();

                debug!(log = %log, index = head.index, count = appended.len(), "appended");
                Ok(Outcome::Appended {
                    head,
                    appended,
                    rejected,
                    drafts,
                })
            }
        }
    }

    /// Reduce an envelope to a chain link, opening it when we can read.
    fn link(&self, envelope: OuterEnvelope) -> Result<ChainLink<Received>> {
        match &self.access {
            Access::Reader {
                read_key,
                project,
                client,
            } => {
                let inner = self.codec.open(&envelope, read_key, *project, *client)?;
                let digest = self.codec.entry_digest(&inner.entry)?;
                Ok(ChainLink::new(
                    envelope.index,
                    inner.entry.chain.prior,
                    digest,
                    Received {
                        envelope,
                        entry: Some(inner.entry),
                    },
                ))
            }
            Access::Relay => {
                let digest = self.codec.envelope_digest(&envelope)?;
                Ok(ChainLink::new(
                    envelope.index,
                    envelope.prior,
                    digest,
                    Received {
                        envelope,
                        entry: None,
                    },
                ))
            }
        }
    }

    /// Store an accepted link. A store that disagrees with the chain
    /// quarantines the log.
    async fn persist(
        &self,
        chain: &mut LogChain<Received>,
        log: &PublicKey,
        link: &ChainLink<Received>,
    ) -> Result<()> {
        let stored = StoredEntry {
            index: link.index,
            digest: link.digest,
            envelope: link.payload.envelope.clone(),
        };
        match self.store.append(log, stored).await {
            Ok(InsertResult::Inserted) | Ok(InsertResult::AlreadyExists) => Ok(()),
            Ok(InsertResult::Conflict { existing }) => {
                let reason = format!("store holds {existing} at index {}", link.index);
                warn!(log = %log, index = link.index, reason = %reason, "quarantined log");
                chain.mark_invalid(reason.clone());
                Err(ChainError::LogInvalid { reason }.into())
            }
            Err(e) => {
                warn!(log = %log, index = link.index, reason = %e, "quarantined log");
                chain.mark_invalid(format!("store write failed at index {}: {e}", link.index));
                Err(e.into())
            }
        }
    }

    /// Record a draft; returns every draft it resolved, itself included.
    async fn resolve_draft(&self, draft: Digest, parents: &[Digest]) -> Vec<Digest> {
        let mut graph = self.drafts.lock().await;
        match graph.insert(draft, parents) {
            DraftStatus::Resolved { released } => {
                let mut resolved = vec![draft];
                resolved.extend(released);
                resolved
            }
            DraftStatus::Pending { missing } => {
                debug!(draft = %draft, missing = missing.len(), "draft waits for parents");
                Vec::new()
            }
        }
    }

    /// The shared chain for a log, loading it on first contact. The map
    /// lock is not held while loading; if two tasks race, the first insert
    /// wins and the other load is discarded.
    async fn chain(&self, log: &PublicKey) -> Result<SharedChain> {
        if let Some(chain) = self.chains.lock().await.get(log) {
            return Ok(Arc::clone(chain));
        }
        let loaded = self.load(log).await?;
        let mut chains = self.chains.lock().await;
        let chain = chains
            .entry(*log)
            .or_insert_with(|| Arc::new(Mutex::new(loaded)));
        Ok(Arc::clone(chain))
    }

    /// Rebuild a log's chain from the store. Readers also re-import the
    /// log's drafts.
    async fn load(&self, log: &PublicKey) -> Result<LogChain<Received>> {
        let digests = self.store.digests(log).await?;
        if let Access::Reader { read_key, .. } = &self.access {
            for (index, digest) in digests.iter().enumerate() {
                let Some(envelope) = self.store.get(log, index as u64).await? else {
                    continue;
                };
                let inner = self.codec.decode(&envelope, read_key)?;
                if inner.entry.draft_parents().is_some() {
                    self.drafts.lock().await.import(*digest);
                }
            }
        }
        if !digests.is_empty() {
            debug!(log = %log, len = digests.len(), "restored log");
        }
        Ok(LogChain::restore(
            self.mode(),
            self.config.max_pending_per_log,
            digests,
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The persisted head of a log.
    pub async fn head(&self, log: &PublicKey) -> Result<Option<ChainHead>> {
        Ok(self.store.head(log).await?)
    }

    /// Health of a log this book has seen.
    pub async fn health(&self, log: &PublicKey) -> Option<LogHealth> {
        let chain = self.chains.lock().await.get(log).cloned()?;
        let chain = chain.lock().await;
        Some(chain.health().clone())
    }

    /// Number of out-of-order entries of a log waiting for predecessors.
    pub async fn pending(&self, log: &PublicKey) -> usize {
        let Some(chain) = self.chains.lock().await.get(log).cloned() else {
            return 0;
        };
        let chain = chain.lock().await;
        chain.pending_len()
    }

    pub async fn is_draft_resolved(&self, draft: &Digest) -> bool {
        self.drafts.lock().await.is_resolved(draft)
    }

    /// Open a stored entry.
    pub async fn read(&self, log: &PublicKey, index: u64) -> Result<Option<InnerEnvelope>> {
        let Access::Reader { read_key, .. } = &self.access else {
            return Err(Error::NotAuthorized("reading requires the read key".into()));
        };
        match self.store.get(log, index).await? {
            Some(envelope) => Ok(Some(self.codec.decode(&envelope, read_key)?)),
            None => Ok(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Replication
    // ─────────────────────────────────────────────────────────────────────────

    /// An offer of every stored log's head.
    pub async fn offers(&self) -> Result<Vec<ReplicationMessage>> {
        let mut heads = Vec::new();
        for log in self.store.logs().await? {
            let head = self.store.head(&log).await?;
            heads.push((log, head.map(|h| h.index)));
        }
        Ok(offers_for(heads))
    }

    /// Requests answering an offer: entries we lack that are not already
    /// buffered. Quarantined logs request nothing.
    pub async fn wants(&self, offer: &Reference) -> Result<Vec<ReplicationMessage>> {
        let chain = self.chain(&offer.log_public_key).await?;
        let chain = chain.lock().await;
        if chain.health().is_invalid() {
            return Ok(Vec::new());
        }
        Ok(requests_for(offer, chain.len(), |index| chain.is_pending(index))
            .into_iter()
            .map(ReplicationMessage::Request)
            .collect())
    }

    /// The envelope answering a request, if stored.
    pub async fn serve(&self, request: &Reference) -> Result<Option<ReplicationMessage>> {
        Ok(self
            .store
            .get(&request.log_public_key, request.index)
            .await?
            .map(ReplicationMessage::Envelope))
    }

    /// Handle one incoming message and return the replies to send.
    pub async fn handle(&self, message: ReplicationMessage) -> Result<Vec<ReplicationMessage>> {
        match message {
            ReplicationMessage::Offer(offer) => self.wants(&offer).await,
            ReplicationMessage::Request(request) => {
                Ok(self.serve(&request).await?.into_iter().collect())
            }
            ReplicationMessage::Envelope(envelope) => match self.receive(envelope).await? {
                Outcome::Buffered { missing } => Ok(missing
                    .into_iter()
                    .take(limits::MAX_REQUESTS_PER_OFFER)
                    .map(ReplicationMessage::Request)
                    .collect()),
                Outcome::Appended { .. } | Outcome::Duplicate => Ok(Vec::new()),
            },
        }
    }
}
