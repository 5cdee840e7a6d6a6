//! Signed, encrypted envelopes around log entries.
//!
//! An [`OuterEnvelope`] exposes only what a replication-only peer needs:
//! discovery key, log public key, index, prior and nonce. Everything else
//! travels as ciphertext under the project's read key.
//!
//! Two versions exist on the wire:
//!
//! - **Version 2 (sealed)**: the canonical [`InnerEnvelope`] (entry plus
//!   signatures) is encrypted as one unit.
//! - **Version 1 (detached)**: only the canonical entry is encrypted; the
//!   signatures sit beside it in clear. Envelopes without a `version` field
//!   are version 1.
//!
//! In both versions every signature covers
//! `"proseline/entry-sig/v1" || canonical(entry)`, so verification always
//! needs the plaintext entry and therefore the read key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use proseline_core::json::{self, Object};
use proseline_core::{
    sign_message, BinaryEncoding, CanonicalEncoder, CanonicalJson, CryptoProvider, Digest,
    DiscoveryKey, Keypair, LogEntry, Nonce, PublicKey, ReadKey, SchemaRegistry, Signature,
    StandardCrypto, ValidationError, ValidationReason, MAC_LEN,
};

use crate::error::{Result, SealError, SignatureRole};

/// Wire version of an outer envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EnvelopeVersion {
    /// Signatures in clear beside an encrypted entry.
    Detached = 1,
    /// Signatures sealed together with the entry.
    Sealed = 2,
}

impl EnvelopeVersion {
    pub fn from_wire(version: u64) -> Result<Self> {
        match version {
            1 => Ok(EnvelopeVersion::Detached),
            2 => Ok(EnvelopeVersion::Sealed),
            other => Err(SealError::UnsupportedVersion(other)),
        }
    }
}

/// Per-deployment envelope settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Text encoding of every binary field.
    pub encoding: BinaryEncoding,
    /// Produce version-1 envelopes with signatures outside the ciphertext.
    pub signatures_in_clear: bool,
}

impl EnvelopeConfig {
    /// Version produced when encoding.
    pub fn version(&self) -> EnvelopeVersion {
        if self.signatures_in_clear {
            EnvelopeVersion::Detached
        } else {
            EnvelopeVersion::Sealed
        }
    }
}

/// The signatures over one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signatures {
    pub log: Signature,
    pub project: Signature,
    pub client: Option<Signature>,
}

impl Signatures {
    pub fn get(&self, which: SignatureRole) -> Option<&Signature> {
        match which {
            SignatureRole::Log => Some(&self.log),
            SignatureRole::Project => Some(&self.project),
            SignatureRole::Client => self.client.as_ref(),
        }
    }

    fn write_into(&self, object: &mut Object, encoding: BinaryEncoding) {
        object.insert(
            SignatureRole::Log.field().into(),
            self.log.encode(encoding).into(),
        );
        object.insert(
            SignatureRole::Project.field().into(),
            self.project.encode(encoding).into(),
        );
        if let Some(client) = &self.client {
            object.insert(
                SignatureRole::Client.field().into(),
                client.encode(encoding).into(),
            );
        }
    }

    fn read_from(object: &Object, encoding: BinaryEncoding) -> Result<Self> {
        let read = |which: SignatureRole| -> Result<Option<Signature>> {
            Ok(json::opt_bytes::<64>(object, which.field(), encoding)?.map(Signature))
        };
        let require = |which: SignatureRole| -> Result<Signature> {
            read(which)?.ok_or(SealError::MissingSignature { which })
        };
        Ok(Self {
            log: require(SignatureRole::Log)?,
            project: require(SignatureRole::Project)?,
            client: read(SignatureRole::Client)?,
        })
    }
}

const SIGNATURE_FIELDS: [&str; 3] = ["logSignature", "projectSignature", "clientSignature"];

/// An entry together with its signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerEnvelope {
    pub entry: LogEntry,
    pub signatures: Signatures,
}

impl InnerEnvelope {
    pub fn to_json(&self, encoding: BinaryEncoding) -> Value {
        let mut object = Map::new();
        object.insert("entry".into(), self.entry.to_json(encoding));
        self.signatures.write_into(&mut object, encoding);
        Value::Object(object)
    }

    pub fn from_json(value: &Value, encoding: BinaryEncoding) -> Result<Self> {
        let object = json::as_object(value, "$")?;
        let mut allowed = vec!["entry"];
        allowed.extend(SIGNATURE_FIELDS);
        json::deny_unknown(object, &allowed)?;

        let entry = LogEntry::from_json(json::required(object, "entry")?, encoding)?;
        let signatures = Signatures::read_from(object, encoding)?;
        Ok(Self { entry, signatures })
    }
}

/// Content of an outer envelope beyond its clear header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeBody {
    /// Version 2: ciphertext of the canonical inner envelope.
    Sealed { ciphertext: Vec<u8> },
    /// Version 1: clear signatures and ciphertext of the canonical entry.
    Detached {
        signatures: Signatures,
        ciphertext: Vec<u8>,
    },
}

impl EnvelopeBody {
    pub fn ciphertext(&self) -> &[u8] {
        match self {
            EnvelopeBody::Sealed { ciphertext } => ciphertext,
            EnvelopeBody::Detached { ciphertext, .. } => ciphertext,
        }
    }
}

/// The transport-visible wrapper around an encrypted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterEnvelope {
    pub discovery_key: DiscoveryKey,
    pub log_public_key: PublicKey,
    pub index: u64,
    /// Clear copy of the entry's `prior`.
    pub prior: Option<Digest>,
    pub nonce: Nonce,
    pub body: EnvelopeBody,
}

const OUTER_V2_FIELDS: [&str; 7] = [
    "version",
    "discoveryKey",
    "logPublicKey",
    "index",
    "prior",
    "nonce",
    "encryptedInnerEnvelope",
];

const OUTER_V1_FIELDS: [&str; 9] = [
    "version",
    "discoveryKey",
    "logPublicKey",
    "index",
    "prior",
    "logSignature",
    "projectSignature",
    "clientSignature",
    "entry",
];

impl OuterEnvelope {
    pub fn version(&self) -> EnvelopeVersion {
        match self.body {
            EnvelopeBody::Sealed { .. } => EnvelopeVersion::Sealed,
            EnvelopeBody::Detached { .. } => EnvelopeVersion::Detached,
        }
    }

    pub fn to_json(&self, encoding: BinaryEncoding) -> Value {
        let mut object = Map::new();
        object.insert("version".into(), (self.version() as u8).into());
        object.insert(
            "discoveryKey".into(),
            self.discovery_key.encode(encoding).into(),
        );
        object.insert(
            "logPublicKey".into(),
            self.log_public_key.encode(encoding).into(),
        );
        object.insert("index".into(), self.index.into());
        if let Some(prior) = &self.prior {
            object.insert("prior".into(), prior.encode(encoding).into());
        }

        match &self.body {
            EnvelopeBody::Sealed { ciphertext } => {
                object.insert("nonce".into(), self.nonce.encode(encoding).into());
                object.insert(
                    "encryptedInnerEnvelope".into(),
                    encoding.encode(ciphertext).into(),
                );
            }
            EnvelopeBody::Detached {
                signatures,
                ciphertext,
            } => {
                signatures.write_into(&mut object, encoding);
                let mut sealed = Map::new();
                sealed.insert("nonce".into(), self.nonce.encode(encoding).into());
                sealed.insert("ciphertext".into(), encoding.encode(ciphertext).into());
                object.insert("entry".into(), Value::Object(sealed));
            }
        }
        Value::Object(object)
    }

    /// Parse and structurally validate an outer envelope.
    pub fn from_json(value: &Value, encoding: BinaryEncoding) -> Result<Self> {
        let object = json::as_object(value, "$")?;
        let version = match object.get("version") {
            None => EnvelopeVersion::Detached,
            Some(v) => EnvelopeVersion::from_wire(
                v.as_u64()
                    .ok_or_else(|| ValidationError::wrong_type("version", "non-negative integer"))?,
            )?,
        };

        let discovery_key = DiscoveryKey(json::bytes::<32>(object, "discoveryKey", encoding)?);
        let log_public_key = PublicKey(json::bytes::<32>(object, "logPublicKey", encoding)?);
        let index = json::uint(object, "index")?;
        let prior = json::opt_bytes::<32>(object, "prior", encoding)?.map(Digest);
        if index > 0 && prior.is_none() {
            return Err(ValidationError::missing("prior").into());
        }

        let (nonce, body) = match version {
            EnvelopeVersion::Sealed => {
                json::deny_unknown(object, &OUTER_V2_FIELDS)?;
                let nonce = Nonce(json::bytes::<24>(object, "nonce", encoding)?);
                let ciphertext = ciphertext(object, "encryptedInnerEnvelope", encoding)?;
                (nonce, EnvelopeBody::Sealed { ciphertext })
            }
            EnvelopeVersion::Detached => {
                json::deny_unknown(object, &OUTER_V1_FIELDS)?;
                let signatures = Signatures::read_from(object, encoding)?;
                let sealed = json::as_object(json::required(object, "entry")?, "entry")?;
                json::deny_unknown(sealed, &["nonce", "ciphertext"])?;
                let nonce = Nonce(json::bytes::<24>(sealed, "nonce", encoding)?);
                let ciphertext = ciphertext(sealed, "ciphertext", encoding)?;
                (
                    nonce,
                    EnvelopeBody::Detached {
                        signatures,
                        ciphertext,
                    },
                )
            }
        };

        Ok(Self {
            discovery_key,
            log_public_key,
            index,
            prior,
            nonce,
            body,
        })
    }
}

fn ciphertext(object: &Object, field: &str, encoding: BinaryEncoding) -> Result<Vec<u8>> {
    let bytes = json::var_bytes(object, field, encoding)?;
    if bytes.len() <= MAC_LEN {
        return Err(ValidationError::new(
            field,
            ValidationReason::Length {
                min: encoding.encoded_len(MAC_LEN + 1),
                max: None,
                actual: encoding.encoded_len(bytes.len()),
            },
        )
        .into());
    }
    Ok(bytes)
}

/// Keys that sign an entry.
#[derive(Debug, Clone, Copy)]
pub struct SigningKeys<'a> {
    pub log: &'a Keypair,
    pub project: &'a Keypair,
    pub client: Option<&'a Keypair>,
}

/// Public keys an entry's signatures are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyingKeys {
    pub log: PublicKey,
    pub project: PublicKey,
    /// When set, a valid client signature is required.
    pub client: Option<PublicKey>,
}

impl VerifyingKeys {
    pub fn get(&self, which: SignatureRole) -> Option<&PublicKey> {
        match which {
            SignatureRole::Log => Some(&self.log),
            SignatureRole::Project => Some(&self.project),
            SignatureRole::Client => self.client.as_ref(),
        }
    }
}

/// Builds, opens and verifies envelopes.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec<C = StandardCrypto, E = CanonicalJson> {
    config: EnvelopeConfig,
    crypto: C,
    encoder: E,
    registry: SchemaRegistry,
}

impl EnvelopeCodec {
    /// A codec using the standard primitives.
    pub fn new(config: EnvelopeConfig) -> Self {
        Self::with_parts(config, StandardCrypto, CanonicalJson)
    }
}

impl<C: CryptoProvider, E: CanonicalEncoder> EnvelopeCodec<C, E> {
    /// A codec using the given capabilities.
    pub fn with_parts(config: EnvelopeConfig, crypto: C, encoder: E) -> Self {
        Self {
            config,
            crypto,
            encoder,
            registry: SchemaRegistry::new(config.encoding),
        }
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    /// Canonical bytes of an entry.
    pub fn canonical_entry(&self, entry: &LogEntry) -> Result<Vec<u8>> {
        Ok(entry.canonical_bytes(self.config.encoding, &self.encoder)?)
    }

    /// Digest of an entry: the value the next entry carries as `prior`.
    pub fn entry_digest(&self, entry: &LogEntry) -> Result<Digest> {
        Ok(entry.digest(self.config.encoding, &self.encoder, &self.crypto)?)
    }

    /// Digest of an envelope's wire form. Relays use it to tell duplicates
    /// from conflicts without the read key.
    pub fn envelope_digest(&self, envelope: &OuterEnvelope) -> Result<Digest> {
        let bytes = self.encoder.encode(&envelope.to_json(self.config.encoding))?;
        Ok(self.crypto.digest(&bytes))
    }

    /// Sign canonical entry bytes with every supplied key.
    pub fn sign(&self, canonical_entry: &[u8], keys: &SigningKeys<'_>) -> Signatures {
        let message = sign_message(canonical_entry);
        Signatures {
            log: self.crypto.sign(keys.log, &message),
            project: self.crypto.sign(keys.project, &message),
            client: keys.client.map(|client| self.crypto.sign(client, &message)),
        }
    }

    /// Validate, sign and encrypt an entry under `read_key` and `nonce`.
    pub fn encode(
        &self,
        entry: &LogEntry,
        keys: &SigningKeys<'_>,
        read_key: &ReadKey,
        nonce: Nonce,
    ) -> Result<OuterEnvelope> {
        let encoding = self.config.encoding;
        let entry_json = entry.to_json(encoding);
        self.registry.validate_entry(&entry_json)?;
        if entry.index() == 0 && entry.prior().is_some() {
            return Err(ValidationError::new(
                "prior",
                ValidationReason::Inconsistent("the first entry has no prior"),
            )
            .into());
        }

        let canonical = self.encoder.encode(&entry_json)?;
        let signatures = self.sign(&canonical, keys);

        let body = match self.config.version() {
            EnvelopeVersion::Detached => EnvelopeBody::Detached {
                signatures,
                ciphertext: self.crypto.seal(read_key.as_bytes(), &nonce, &canonical)?,
            },
            EnvelopeVersion::Sealed => {
                let inner = InnerEnvelope {
                    entry: entry.clone(),
                    signatures,
                };
                let plaintext = self.encoder.encode(&inner.to_json(encoding))?;
                EnvelopeBody::Sealed {
                    ciphertext: self.crypto.seal(read_key.as_bytes(), &nonce, &plaintext)?,
                }
            }
        };

        Ok(OuterEnvelope {
            discovery_key: entry.chain.discovery_key,
            log_public_key: keys.log.public_key(),
            index: entry.index(),
            prior: entry.chain.prior,
            nonce,
            body,
        })
    }

    /// [`encode`](Self::encode) with a fresh random nonce.
    pub fn seal(
        &self,
        entry: &LogEntry,
        keys: &SigningKeys<'_>,
        read_key: &ReadKey,
    ) -> Result<OuterEnvelope> {
        self.encode(entry, keys, read_key, Nonce::generate())
    }

    /// Decrypt an envelope and check it against its clear header.
    ///
    /// Does not verify signatures; see [`verify`](Self::verify).
    pub fn decode(&self, outer: &OuterEnvelope, read_key: &ReadKey) -> Result<InnerEnvelope> {
        let encoding = self.config.encoding;
        let inner = match &outer.body {
            EnvelopeBody::Sealed { ciphertext } => {
                let plaintext = self
                    .crypto
                    .open(read_key.as_bytes(), &outer.nonce, ciphertext)
                    .map_err(|_| SealError::Decrypt {
                        field: "encryptedInnerEnvelope",
                    })?;
                let value = parse(&plaintext)?;
                let inner = InnerEnvelope::from_json(&value, encoding)?;
                self.require_canonical(&inner.to_json(encoding), &plaintext)?;
                inner
            }
            EnvelopeBody::Detached {
                signatures,
                ciphertext,
            } => {
                let plaintext = self
                    .crypto
                    .open(read_key.as_bytes(), &outer.nonce, ciphertext)
                    .map_err(|_| SealError::Decrypt { field: "entry" })?;
                let value = parse(&plaintext)?;
                let entry = LogEntry::from_json(&value, encoding)?;
                self.require_canonical(&entry.to_json(encoding), &plaintext)?;
                InnerEnvelope {
                    entry,
                    signatures: *signatures,
                }
            }
        };

        let entry = &inner.entry;
        if entry.index() != outer.index {
            return Err(SealError::Mismatch { field: "index" });
        }
        if entry.chain.prior != outer.prior {
            return Err(SealError::Mismatch { field: "prior" });
        }
        if entry.chain.discovery_key != outer.discovery_key {
            return Err(SealError::Mismatch {
                field: "discoveryKey",
            });
        }
        Ok(inner)
    }

    /// Check every required signature against the canonical entry.
    pub fn verify(&self, inner: &InnerEnvelope, keys: &VerifyingKeys) -> Result<()> {
        let message = sign_message(&self.canonical_entry(&inner.entry)?);
        for which in [SignatureRole::Log, SignatureRole::Project, SignatureRole::Client] {
            let Some(key) = keys.get(which) else {
                continue;
            };
            let signature = inner
                .signatures
                .get(which)
                .ok_or(SealError::MissingSignature { which })?;
            self.crypto
                .verify(key, &message, signature)
                .map_err(|_| SealError::Signature { which })?;
        }
        Ok(())
    }

    /// Decrypt and verify, using the envelope's own log public key.
    pub fn open(
        &self,
        outer: &OuterEnvelope,
        read_key: &ReadKey,
        project: PublicKey,
        client: Option<PublicKey>,
    ) -> Result<InnerEnvelope> {
        let inner = self.decode(outer, read_key)?;
        self.verify(
            &inner,
            &VerifyingKeys {
                log: outer.log_public_key,
                project,
                client,
            },
        )?;
        Ok(inner)
    }

    fn require_canonical(&self, value: &Value, plaintext: &[u8]) -> Result<()> {
        if self.encoder.encode(value)? != plaintext {
            return Err(SealError::Malformed("content is not in canonical form".into()));
        }
        Ok(())
    }
}

fn parse(plaintext: &[u8]) -> Result<Value> {
    serde_json::from_slice(plaintext).map_err(|e| SealError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proseline_core::{ChainFields, EntryBody, Timestamp};

    struct Keys {
        log: Keypair,
        project: Keypair,
        client: Keypair,
        read: ReadKey,
    }

    impl Keys {
        fn new() -> Self {
            Self {
                log: Keypair::generate(),
                project: Keypair::generate(),
                client: Keypair::generate(),
                read: ReadKey::generate(),
            }
        }

        fn signing(&self) -> SigningKeys<'_> {
            SigningKeys {
                log: &self.log,
                project: &self.project,
                client: None,
            }
        }

        fn verifying(&self) -> VerifyingKeys {
            VerifyingKeys {
                log: self.log.public_key(),
                project: self.project.public_key(),
                client: None,
            }
        }
    }

    fn entry(index: u64) -> LogEntry {
        let dk = DiscoveryKey([4; 32]);
        let chain = match index {
            0 => ChainFields::first(dk),
            i => ChainFields::after(dk, i, Digest([8; 32])),
        };
        LogEntry::new(
            chain,
            Timestamp::parse("2024-05-05T09:30:00.000Z").unwrap(),
            EntryBody::Correction {
                note: Digest([6; 32]),
                text: "second thoughts".into(),
            },
        )
    }

    fn codec(signatures_in_clear: bool) -> EnvelopeCodec {
        EnvelopeCodec::new(EnvelopeConfig {
            encoding: BinaryEncoding::Hex,
            signatures_in_clear,
        })
    }

    #[test]
    fn test_roundtrip_both_versions() {
        let keys = Keys::new();
        for in_clear in [false, true] {
            let codec = codec(in_clear);
            let outer = codec.seal(&entry(3), &keys.signing(), &keys.read).unwrap();
            assert_eq!(outer.version(), codec.config().version());
            assert_eq!(outer.index, 3);
            assert_eq!(outer.prior, Some(Digest([8; 32])));

            let inner = codec.decode(&outer, &keys.read).unwrap();
            assert_eq!(inner.entry, entry(3));
            codec.verify(&inner, &keys.verifying()).unwrap();
        }
    }

    #[test]
    fn test_wire_roundtrip_both_versions() {
        let keys = Keys::new();
        for in_clear in [false, true] {
            let codec = codec(in_clear);
            let outer = codec.seal(&entry(1), &keys.signing(), &keys.read).unwrap();
            let wire = outer.to_json(BinaryEncoding::Hex);
            assert_eq!(
                OuterEnvelope::from_json(&wire, BinaryEncoding::Hex).unwrap(),
                outer
            );
        }
    }

    #[test]
    fn test_signature_placement() {
        let keys = Keys::new();
        let sealed = codec(false)
            .seal(&entry(0), &keys.signing(), &keys.read)
            .unwrap()
            .to_json(BinaryEncoding::Hex);
        assert!(sealed.get("logSignature").is_none());
        assert!(sealed.get("encryptedInnerEnvelope").is_some());

        let detached = codec(true)
            .seal(&entry(0), &keys.signing(), &keys.read)
            .unwrap()
            .to_json(BinaryEncoding::Hex);
        assert!(detached.get("logSignature").is_some());
        assert!(detached["entry"].get("ciphertext").is_some());
    }

    #[test]
    fn test_missing_version_is_detached() {
        let keys = Keys::new();
        let outer = codec(true).seal(&entry(0), &keys.signing(), &keys.read).unwrap();
        let mut wire = outer.to_json(BinaryEncoding::Hex);
        wire.as_object_mut().unwrap().remove("version");
        let parsed = OuterEnvelope::from_json(&wire, BinaryEncoding::Hex).unwrap();
        assert_eq!(parsed.version(), EnvelopeVersion::Detached);
        assert_eq!(parsed, outer);
    }

    #[test]
    fn test_unsupported_version() {
        let keys = Keys::new();
        let mut wire = codec(false)
            .seal(&entry(0), &keys.signing(), &keys.read)
            .unwrap()
            .to_json(BinaryEncoding::Hex);
        wire["version"] = 7.into();
        assert_eq!(
            OuterEnvelope::from_json(&wire, BinaryEncoding::Hex),
            Err(SealError::UnsupportedVersion(7))
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails_decrypt() {
        let keys = Keys::new();
        let codec = codec(false);
        let outer = codec.seal(&entry(2), &keys.signing(), &keys.read).unwrap();
        for bit in [0, 7, 100, 1000] {
            let mut tampered = outer.clone();
            let (EnvelopeBody::Sealed { ciphertext } | EnvelopeBody::Detached { ciphertext, .. }) =
                &mut tampered.body;
            let bit = bit % (ciphertext.len() * 8);
            ciphertext[bit / 8] ^= 1 << (bit % 8);
            assert_eq!(
                codec.decode(&tampered, &keys.read),
                Err(SealError::Decrypt {
                    field: "encryptedInnerEnvelope"
                })
            );
        }
    }

    #[test]
    fn test_wrong_read_key_fails_decrypt() {
        let keys = Keys::new();
        let codec = codec(true);
        let outer = codec.seal(&entry(2), &keys.signing(), &keys.read).unwrap();
        assert_eq!(
            codec.decode(&outer, &ReadKey::generate()),
            Err(SealError::Decrypt { field: "entry" })
        );
    }

    #[test]
    fn test_signature_failures_name_the_key() {
        let keys = Keys::new();
        let codec = codec(false);
        let outer = codec.seal(&entry(0), &keys.signing(), &keys.read).unwrap();
        let inner = codec.decode(&outer, &keys.read).unwrap();

        let mut wrong = keys.verifying();
        wrong.project = Keypair::generate().public_key();
        assert_eq!(
            codec.verify(&inner, &wrong),
            Err(SealError::Signature {
                which: SignatureRole::Project
            })
        );

        let mut wrong = keys.verifying();
        wrong.log = Keypair::generate().public_key();
        assert_eq!(
            codec.verify(&inner, &wrong),
            Err(SealError::Signature {
                which: SignatureRole::Log
            })
        );
    }

    #[test]
    fn test_client_signature() {
        let keys = Keys::new();
        let codec = codec(false);
        let mut verifying = keys.verifying();
        verifying.client = Some(keys.client.public_key());

        let unsigned = codec.seal(&entry(0), &keys.signing(), &keys.read).unwrap();
        let inner = codec.decode(&unsigned, &keys.read).unwrap();
        assert_eq!(
            codec.verify(&inner, &verifying),
            Err(SealError::MissingSignature {
                which: SignatureRole::Client
            })
        );

        let mut signing = keys.signing();
        signing.client = Some(&keys.client);
        let signed = codec.seal(&entry(0), &signing, &keys.read).unwrap();
        let inner = codec.decode(&signed, &keys.read).unwrap();
        assert!(inner.signatures.client.is_some());
        codec.verify(&inner, &verifying).unwrap();
    }

    #[test]
    fn test_header_must_match_sealed_entry() {
        let keys = Keys::new();
        let codec = codec(false);
        let mut outer = codec.seal(&entry(2), &keys.signing(), &keys.read).unwrap();
        outer.index = 5;
        assert_eq!(
            codec.decode(&outer, &keys.read),
            Err(SealError::Mismatch { field: "index" })
        );
    }

    #[test]
    fn test_invalid_entry_not_encoded() {
        let keys = Keys::new();
        let mut bad = entry(0);
        bad.body = EntryBody::Correction {
            note: Digest([6; 32]),
            text: String::new(),
        };
        let err = codec(false)
            .seal(&bad, &keys.signing(), &keys.read)
            .unwrap_err();
        assert!(matches!(err, SealError::Schema(e) if e.field() == Some("text")));
    }

    #[test]
    fn test_envelope_prior_required_after_first() {
        let keys = Keys::new();
        let outer = codec(false).seal(&entry(1), &keys.signing(), &keys.read).unwrap();
        let mut wire = outer.to_json(BinaryEncoding::Hex);
        wire.as_object_mut().unwrap().remove("prior");
        assert_eq!(
            OuterEnvelope::from_json(&wire, BinaryEncoding::Hex),
            Err(SealError::Invalid(ValidationError::missing("prior")))
        );
    }

    #[test]
    fn test_envelope_digest_distinguishes_nonces() {
        let keys = Keys::new();
        let codec = codec(false);
        let a = codec.seal(&entry(0), &keys.signing(), &keys.read).unwrap();
        let b = codec.seal(&entry(0), &keys.signing(), &keys.read).unwrap();
        assert_eq!(codec.envelope_digest(&a).unwrap(), codec.envelope_digest(&a).unwrap());
        assert_ne!(codec.envelope_digest(&a).unwrap(), codec.envelope_digest(&b).unwrap());
    }
}
