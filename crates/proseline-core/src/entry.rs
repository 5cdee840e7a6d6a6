//! Log entries: the six kinds of content a device appends to its log.
//!
//! Every entry carries the same chain fields ([`ChainFields`]) plus the
//! fields of its kind ([`EntryBody`]). The JSON form is flat: chain fields,
//! `kind`, `timestamp` and the body fields all sit in one object.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::canonical::CanonicalEncoder;
use crate::crypto::{fixed_bytes, CryptoProvider, Digest, DiscoveryKey};
use crate::encoding::BinaryEncoding;
use crate::error::{CoreError, SchemaError, UnknownKindError, ValidationError, ValidationReason};
use crate::json::{self, Object};
use crate::schema::SchemaRegistry;

/// Discriminator for the six entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Draft,
    Mark,
    Note,
    Reply,
    Correction,
    Intro,
}

impl EntryKind {
    /// Every kind, in registry order.
    pub const ALL: [EntryKind; 6] = [
        EntryKind::Draft,
        EntryKind::Mark,
        EntryKind::Note,
        EntryKind::Reply,
        EntryKind::Correction,
        EntryKind::Intro,
    ];

    /// The wire tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntryKind::Draft => "draft",
            EntryKind::Mark => "mark",
            EntryKind::Note => "note",
            EntryKind::Reply => "reply",
            EntryKind::Correction => "correction",
            EntryKind::Intro => "intro",
        }
    }

    /// Parse a wire tag.
    pub fn parse(tag: &str) -> Result<Self, UnknownKindError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| UnknownKindError(tag.to_string()))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Fields linking an entry into its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFields {
    /// Project the log belongs to.
    pub discovery_key: DiscoveryKey,
    /// Position in the log, starting at 0.
    pub index: u64,
    /// Digest of the entry at `index - 1`. Absent only at index 0.
    pub prior: Option<Digest>,
}

impl ChainFields {
    /// Chain fields for the first entry of a log.
    pub fn first(discovery_key: DiscoveryKey) -> Self {
        Self {
            discovery_key,
            index: 0,
            prior: None,
        }
    }

    /// Chain fields for the entry following `prior` at `index - 1`.
    pub fn after(discovery_key: DiscoveryKey, index: u64, prior: Digest) -> Self {
        Self {
            discovery_key,
            index,
            prior: Some(prior),
        }
    }
}

/// An RFC 3339 date-time, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(String);

impl Timestamp {
    /// Parse and keep a date-time string.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        DateTime::parse_from_rfc3339(text)
            .map_err(|_| ValidationError::new("timestamp", ValidationReason::Pattern("RFC 3339 date-time")))?;
        Ok(Self(text.to_string()))
    }

    /// The current time, millisecond precision, UTC.
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fixed_bytes!(
    /// Stable 4-byte identifier of a mark, unchanged across renames.
    MarkId,
    4,
    "MarkId"
);

impl MarkId {
    /// Generate a random identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// A span of a draft a note refers to. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteRange {
    start: u64,
    end: u64,
}

impl NoteRange {
    /// Create a non-empty range.
    pub fn new(start: u64, end: u64) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::new(
                "range",
                ValidationReason::Inconsistent("end must be greater than start"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }
}

/// Kind-specific content of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    /// A version of the document, based on up to two earlier drafts.
    Draft {
        parents: Vec<Digest>,
        text: Map<String, Value>,
    },
    /// Moves a named pointer onto a draft.
    Mark {
        identifier: MarkId,
        name: String,
        draft: Digest,
    },
    /// Comment on a range of a draft.
    Note {
        draft: Digest,
        range: NoteRange,
        text: String,
    },
    /// Comment on a note or another reply.
    Reply { parent: Digest, text: String },
    /// Replacement text for a note.
    Correction { note: Digest, text: String },
    /// Associates a person and device with the log.
    Intro {
        name: String,
        device: String,
        email: Option<String>,
        phone: Option<String>,
    },
}

impl EntryBody {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryBody::Draft { .. } => EntryKind::Draft,
            EntryBody::Mark { .. } => EntryKind::Mark,
            EntryBody::Note { .. } => EntryKind::Note,
            EntryBody::Reply { .. } => EntryKind::Reply,
            EntryBody::Correction { .. } => EntryKind::Correction,
            EntryBody::Intro { .. } => EntryKind::Intro,
        }
    }

    fn write_fields(&self, object: &mut Object, encoding: BinaryEncoding) {
        let digest = |d: &Digest| Value::String(d.encode(encoding));
        match self {
            EntryBody::Draft { parents, text } => {
                object.insert(
                    "parents".into(),
                    Value::Array(parents.iter().map(digest).collect()),
                );
                object.insert("text".into(), Value::Object(text.clone()));
            }
            EntryBody::Mark {
                identifier,
                name,
                draft,
            } => {
                object.insert("identifier".into(), identifier.encode(encoding).into());
                object.insert("name".into(), name.clone().into());
                object.insert("draft".into(), digest(draft));
            }
            EntryBody::Note { draft, range, text } => {
                let mut span = Map::new();
                span.insert("start".into(), range.start.into());
                span.insert("end".into(), range.end.into());
                object.insert("draft".into(), digest(draft));
                object.insert("range".into(), Value::Object(span));
                object.insert("text".into(), text.clone().into());
            }
            EntryBody::Reply { parent, text } => {
                object.insert("parent".into(), digest(parent));
                object.insert("text".into(), text.clone().into());
            }
            EntryBody::Correction { note, text } => {
                object.insert("note".into(), digest(note));
                object.insert("text".into(), text.clone().into());
            }
            EntryBody::Intro {
                name,
                device,
                email,
                phone,
            } => {
                object.insert("name".into(), name.clone().into());
                object.insert("device".into(), device.clone().into());
                if let Some(email) = email {
                    object.insert("email".into(), email.clone().into());
                }
                if let Some(phone) = phone {
                    object.insert("phone".into(), phone.clone().into());
                }
            }
        }
    }

    fn read_fields(
        kind: EntryKind,
        object: &Object,
        encoding: BinaryEncoding,
    ) -> Result<Self, ValidationError> {
        let digest = |field: &str| json::bytes::<32>(object, field, encoding).map(Digest);
        let text = || json::string(object, "text").map(str::to_string);

        Ok(match kind {
            EntryKind::Draft => {
                let parents = json::required(object, "parents")?
                    .as_array()
                    .ok_or_else(|| ValidationError::wrong_type("parents", "array"))?
                    .iter()
                    .map(|item| {
                        let text = item
                            .as_str()
                            .ok_or_else(|| ValidationError::wrong_type("parents", "string"))?;
                        Digest::decode(encoding, text)
                            .map_err(|e| ValidationError::new("parents", ValidationReason::Encoding(e)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let text = json::required(object, "text")?
                    .as_object()
                    .cloned()
                    .ok_or_else(|| ValidationError::wrong_type("text", "object"))?;
                EntryBody::Draft { parents, text }
            }
            EntryKind::Mark => EntryBody::Mark {
                identifier: MarkId(json::bytes::<4>(object, "identifier", encoding)?),
                name: json::string(object, "name")?.to_string(),
                draft: digest("draft")?,
            },
            EntryKind::Note => {
                let span = json::as_object(json::required(object, "range")?, "range")?;
                let range = NoteRange::new(json::uint(span, "start")?, json::uint(span, "end")?)?;
                EntryBody::Note {
                    draft: digest("draft")?,
                    range,
                    text: text()?,
                }
            }
            EntryKind::Reply => EntryBody::Reply {
                parent: digest("parent")?,
                text: text()?,
            },
            EntryKind::Correction => EntryBody::Correction {
                note: digest("note")?,
                text: text()?,
            },
            EntryKind::Intro => EntryBody::Intro {
                name: json::string(object, "name")?.to_string(),
                device: json::string(object, "device")?.to_string(),
                email: json::opt_string(object, "email")?.map(str::to_string),
                phone: json::opt_string(object, "phone")?.map(str::to_string),
            },
        })
    }
}

/// One entry in a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub chain: ChainFields,
    pub timestamp: Timestamp,
    pub body: EntryBody,
}

impl LogEntry {
    pub fn new(chain: ChainFields, timestamp: Timestamp, body: EntryBody) -> Self {
        Self {
            chain,
            timestamp,
            body,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.body.kind()
    }

    pub fn index(&self) -> u64 {
        self.chain.index
    }

    pub fn prior(&self) -> Option<&Digest> {
        self.chain.prior.as_ref()
    }

    /// Parents of a draft entry, `None` for other kinds.
    pub fn draft_parents(&self) -> Option<&[Digest]> {
        match &self.body {
            EntryBody::Draft { parents, .. } => Some(parents),
            _ => None,
        }
    }

    /// The wire form of the entry.
    pub fn to_json(&self, encoding: BinaryEncoding) -> Value {
        let mut object = Map::new();
        object.insert("kind".into(), self.kind().as_str().into());
        object.insert("timestamp".into(), self.timestamp.as_str().into());
        object.insert(
            "discoveryKey".into(),
            self.chain.discovery_key.encode(encoding).into(),
        );
        object.insert("index".into(), self.chain.index.into());
        if let Some(prior) = &self.chain.prior {
            object.insert("prior".into(), prior.encode(encoding).into());
        }
        self.body.write_fields(&mut object, encoding);
        Value::Object(object)
    }

    /// Validate a candidate against the registry and decode it.
    pub fn from_json(value: &Value, encoding: BinaryEncoding) -> Result<Self, SchemaError> {
        let kind = SchemaRegistry::new(encoding).validate_entry(value)?;
        let object = json::as_object(value, "$")?;

        let chain = ChainFields {
            discovery_key: DiscoveryKey(json::bytes::<32>(object, "discoveryKey", encoding)?),
            index: json::uint(object, "index")?,
            prior: json::opt_bytes::<32>(object, "prior", encoding)?.map(Digest),
        };
        let timestamp = Timestamp::parse(json::string(object, "timestamp")?)?;
        let body = EntryBody::read_fields(kind, object, encoding)?;

        Ok(Self {
            chain,
            timestamp,
            body,
        })
    }

    /// Canonical bytes: the input to signatures, digests and encryption.
    pub fn canonical_bytes(
        &self,
        encoding: BinaryEncoding,
        encoder: &impl CanonicalEncoder,
    ) -> Result<Vec<u8>, CoreError> {
        encoder.encode(&self.to_json(encoding))
    }

    /// The digest later entries use as `prior` and drafts use as parents.
    pub fn digest(
        &self,
        encoding: BinaryEncoding,
        encoder: &impl CanonicalEncoder,
        crypto: &impl CryptoProvider,
    ) -> Result<Digest, CoreError> {
        Ok(crypto.digest(&self.canonical_bytes(encoding, encoder)?))
    }
}
