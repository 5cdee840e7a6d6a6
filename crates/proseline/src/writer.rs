//! Appending entries to one's own log.

use tracing::debug;

use proseline_chain::ChainHead;
use proseline_core::{
    ChainFields, Digest, DiscoveryKey, EntryBody, Keypair, LogEntry, PublicKey, ReadKey,
    Timestamp,
};
use proseline_seal::{EnvelopeCodec, OuterEnvelope, SigningKeys};

use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::project::ProjectKeys;

/// An entry just written, ready to store and replicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub envelope: OuterEnvelope,
    /// Digest of the entry; the next entry's `prior`.
    pub digest: Digest,
    pub entry: LogEntry,
}

/// The single writer of one log.
///
/// Builds each entry's chain fields from its own head, so appends through
/// one `LogWriter` are serialized by `&mut self`.
#[derive(Debug)]
pub struct LogWriter {
    log: Keypair,
    project: Keypair,
    client: Option<Keypair>,
    discovery_key: DiscoveryKey,
    read_key: ReadKey,
    codec: EnvelopeCodec,
    head: Option<ChainHead>,
}

impl LogWriter {
    /// A writer for a new, empty log.
    pub fn new(keys: &ProjectKeys, log: Keypair, config: &ProtocolConfig) -> Result<Self> {
        let project = keys.project_keypair().ok_or_else(|| {
            Error::NotAuthorized("writing requires the project write seed".into())
        })?;
        Ok(Self {
            log,
            project,
            client: None,
            discovery_key: keys.discovery_key(),
            read_key: keys.read_key().clone(),
            codec: EnvelopeCodec::new(config.envelope()),
            head: None,
        })
    }

    /// Also sign every entry with a client key.
    pub fn with_client(mut self, client: Keypair) -> Self {
        self.client = Some(client);
        self
    }

    /// Continue a log whose head is already known.
    pub fn resume(mut self, head: ChainHead) -> Self {
        self.head = Some(head);
        self
    }

    pub fn log_public_key(&self) -> PublicKey {
        self.log.public_key()
    }

    pub fn head(&self) -> Option<ChainHead> {
        self.head
    }

    /// Seal the next entry and advance the head.
    pub fn append(&mut self, timestamp: Timestamp, body: EntryBody) -> Result<Appended> {
        let chain = match &self.head {
            None => ChainFields::first(self.discovery_key),
            Some(head) => ChainFields::after(self.discovery_key, head.next_index(), head.digest),
        };
        let entry = LogEntry::new(chain, timestamp, body);
        let keys = SigningKeys {
            log: &self.log,
            project: &self.project,
            client: self.client.as_ref(),
        };
        let envelope = self.codec.seal(&entry, &keys, &self.read_key)?;
        let digest = self.codec.entry_digest(&entry)?;

        self.head = Some(ChainHead {
            index: entry.index(),
            digest,
        });
        debug!(log = %self.log.public_key(), index = entry.index(), kind = %entry.kind(), "appended");

        Ok(Appended {
            envelope,
            digest,
            entry,
        })
    }

    /// [`append`](Self::append) stamped with the current time.
    pub fn append_now(&mut self, body: EntryBody) -> Result<Appended> {
        self.append(Timestamp::now(), body)
    }
}
