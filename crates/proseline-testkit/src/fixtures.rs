//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use rand::RngCore;
use serde_json::{Map, Value};

use proseline::{LogBook, LogWriter, MemoryLogStore, ProjectKeys, ProtocolConfig};
use proseline_core::{
    ChainFields, Digest, DiscoveryKey, EntryBody, Keypair, LogEntry, MarkId, NoteRange,
    Timestamp,
};
use proseline_seal::{
    EnvelopeBody, EnvelopeCodec, OuterEnvelope, SealError, SigningKeys, VerifyingKeys,
};

/// Fixed timestamp, so ciphertexts and digests are reproducible.
pub const TIMESTAMP: &str = "2024-01-15T10:30:00.000Z";

/// A project with write access and one log of its own.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    pub keys: ProjectKeys,
    pub project: Keypair,
    pub log: Keypair,
    pub client: Keypair,
    pub config: ProtocolConfig,
}

impl ProjectFixture {
    /// A new project under the default configuration.
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default())
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        let keys = ProjectKeys::generate(Some("Fixture".into()));
        Self::from_keys(keys, Keypair::generate(), config)
    }

    /// Create with a deterministic log key from seed.
    pub fn with_log_seed(seed: [u8; 32]) -> Self {
        let keys = ProjectKeys::generate(None);
        Self::from_keys(keys, Keypair::from_seed(&seed), ProtocolConfig::default())
    }

    fn from_keys(keys: ProjectKeys, log: Keypair, config: ProtocolConfig) -> Self {
        let project = match keys.project_keypair() {
            Some(project) => project,
            None => Keypair::generate(),
        };
        Self {
            keys,
            project,
            log,
            client: Keypair::generate(),
            config,
        }
    }

    /// Another device on the same project, with its own log.
    pub fn peer(&self) -> Self {
        Self {
            log: Keypair::generate(),
            client: Keypair::generate(),
            ..self.clone()
        }
    }

    pub fn discovery_key(&self) -> DiscoveryKey {
        self.keys.discovery_key()
    }

    pub fn codec(&self) -> EnvelopeCodec {
        EnvelopeCodec::new(self.config.envelope())
    }

    pub fn signing(&self, with_client: bool) -> SigningKeys<'_> {
        SigningKeys {
            log: &self.log,
            project: &self.project,
            client: with_client.then_some(&self.client),
        }
    }

    pub fn verifying(&self, with_client: bool) -> VerifyingKeys {
        VerifyingKeys {
            log: self.log.public_key(),
            project: self.project.public_key(),
            client: with_client.then(|| self.client.public_key()),
        }
    }

    /// The first entry of a log.
    pub fn first(&self, body: EntryBody) -> LogEntry {
        LogEntry::new(ChainFields::first(self.discovery_key()), timestamp(), body)
    }

    /// An entry at `index` following `prior`.
    pub fn after(&self, index: u64, prior: Digest, body: EntryBody) -> LogEntry {
        LogEntry::new(
            ChainFields::after(self.discovery_key(), index, prior),
            timestamp(),
            body,
        )
    }

    /// Sign and seal an entry with the log and project keys.
    pub fn seal(&self, entry: &LogEntry) -> Result<OuterEnvelope, SealError> {
        self.codec()
            .seal(entry, &self.signing(false), self.keys.read_key())
    }

    /// A writer for this fixture's log.
    pub fn writer(&self) -> LogWriter {
        LogWriter::new(&self.keys, self.log.clone(), &self.config)
            .expect("fixture holds the write seed")
    }

    pub fn reader_book(&self) -> LogBook<MemoryLogStore> {
        LogBook::reader(&self.keys, MemoryLogStore::new(), self.config)
    }

    pub fn relay_book(&self) -> LogBook<MemoryLogStore> {
        LogBook::relay(self.discovery_key(), MemoryLogStore::new(), self.config)
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create several devices sharing one project.
pub fn multi_party_fixtures(count: usize) -> Vec<ProjectFixture> {
    let first = ProjectFixture::new();
    let mut parties: Vec<ProjectFixture> = (1..count).map(|_| first.peer()).collect();
    parties.insert(0, first);
    parties
}

pub fn timestamp() -> Timestamp {
    Timestamp::parse(TIMESTAMP).expect("fixture timestamp is valid")
}

/// Digest of 64 random bytes, standing in for an unknown predecessor.
pub fn random_digest() -> Digest {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    Digest::hash(&bytes)
}

/// Draft text: a single `body` member.
/// Flip one bit of an envelope's ciphertext, wrapping past the end.
pub fn flip_ciphertext_bit(envelope: &mut OuterEnvelope, bit: usize) {
    let ciphertext = match &mut envelope.body {
        EnvelopeBody::Sealed { ciphertext } => ciphertext,
        EnvelopeBody::Detached { ciphertext, .. } => ciphertext,
    };
    if ciphertext.is_empty() {
        return;
    }
    let bit = bit % (ciphertext.len() * 8);
    ciphertext[bit / 8] ^= 1 << (bit % 8);
}

pub fn draft_text(body: &str) -> Map<String, Value> {
    let mut text = Map::new();
    text.insert("body".into(), Value::String(body.into()));
    text
}

pub fn intro(name: &str, device: &str) -> EntryBody {
    EntryBody::Intro {
        name: name.into(),
        device: device.into(),
        email: None,
        phone: None,
    }
}

/// One body of every kind, plus each optional intro field present and absent.
pub fn sample_bodies() -> Vec<EntryBody> {
    let draft = Digest([0xd1; 32]);
    let note = Digest([0xe2; 32]);
    let mut bodies = vec![
        EntryBody::Draft {
            parents: vec![],
            text: draft_text("Call me Ishmael."),
        },
        EntryBody::Draft {
            parents: vec![draft, Digest([0xd2; 32])],
            text: draft_text("Merged."),
        },
        EntryBody::Mark {
            identifier: MarkId([1, 2, 3, 4]),
            name: "final".into(),
            draft,
        },
        EntryBody::Reply {
            parent: note,
            text: "Agreed.".into(),
        },
        EntryBody::Correction {
            note,
            text: "Typo fixed.".into(),
        },
    ];
    if let Ok(range) = NoteRange::new(0, 12) {
        bodies.push(EntryBody::Note {
            draft,
            range,
            text: "Too long.".into(),
        });
    }
    for email in [None, Some("kyle@example.com")] {
        for phone in [None, Some("+15555550100")] {
            bodies.push(EntryBody::Intro {
                name: "Kyle E. Mitchell".into(),
                device: "laptop".into(),
                email: email.map(String::from),
                phone: phone.map(String::from),
            });
        }
    }
    bodies
}
