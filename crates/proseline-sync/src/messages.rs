//! Replication message types.
//!
//! Peers exchange three messages: an offer of a log's head, a request for
//! one entry, and the envelope answering a request.

use serde_json::{Map, Value};

use proseline_core::json;
use proseline_core::BinaryEncoding;
use proseline_seal::OuterEnvelope;

use crate::error::{Result, SyncError};
use crate::reference::Reference;

/// Message size limits.
pub mod limits {
    /// Max requests planned in answer to one offer.
    pub const MAX_REQUESTS_PER_OFFER: usize = 100;
}

/// One replication message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationMessage {
    /// "I have this log up to this index."
    Offer(Reference),
    /// "Send me this entry."
    Request(Reference),
    /// An entry, as its outer envelope.
    Envelope(OuterEnvelope),
}

impl ReplicationMessage {
    /// The `type` tag on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            ReplicationMessage::Offer(_) => "offer",
            ReplicationMessage::Request(_) => "request",
            ReplicationMessage::Envelope(_) => "envelope",
        }
    }

    /// The entry this message concerns.
    pub fn reference(&self) -> Reference {
        match self {
            ReplicationMessage::Offer(r) | ReplicationMessage::Request(r) => *r,
            ReplicationMessage::Envelope(envelope) => Reference::from(envelope),
        }
    }

    pub fn to_json(&self, encoding: BinaryEncoding) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), self.type_name().into());
        match self {
            ReplicationMessage::Offer(r) | ReplicationMessage::Request(r) => {
                object.insert("reference".into(), r.to_json(encoding));
            }
            ReplicationMessage::Envelope(envelope) => {
                object.insert("envelope".into(), envelope.to_json(encoding));
            }
        }
        Value::Object(object)
    }

    pub fn from_json(value: &Value, encoding: BinaryEncoding) -> Result<Self> {
        let object = json::as_object(value, "$")?;
        let tag = json::string(object, "type")?;
        match tag {
            "offer" | "request" => {
                json::deny_unknown(object, &["type", "reference"])?;
                let reference = Reference::from_json(json::required(object, "reference")?, encoding)?;
                Ok(if tag == "offer" {
                    ReplicationMessage::Offer(reference)
                } else {
                    ReplicationMessage::Request(reference)
                })
            }
            "envelope" => {
                json::deny_unknown(object, &["type", "envelope"])?;
                let envelope = OuterEnvelope::from_json(json::required(object, "envelope")?, encoding)?;
                Ok(ReplicationMessage::Envelope(envelope))
            }
            other => Err(SyncError::UnknownType(other.to_string())),
        }
    }

    /// Serialize to JSON bytes for a transport.
    pub fn to_bytes(&self, encoding: BinaryEncoding) -> Vec<u8> {
        self.to_json(encoding).to_string().into_bytes()
    }

    /// Parse JSON bytes from a transport.
    pub fn from_bytes(bytes: &[u8], encoding: BinaryEncoding) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|_| {
            proseline_core::ValidationError::wrong_type("$", "JSON object")
        })?;
        Self::from_json(&value, encoding)
    }
}
