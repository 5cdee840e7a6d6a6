//! References: `(logPublicKey, index)` pointers to single entries.

use serde_json::{Map, Value};
use std::fmt;

use proseline_core::json;
use proseline_core::{BinaryEncoding, PublicKey, ValidationError};
use proseline_seal::OuterEnvelope;

/// Points at one entry of one log. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    pub log_public_key: PublicKey,
    pub index: u64,
}

/// Build a reference.
pub fn make_reference(log_public_key: PublicKey, index: u64) -> Reference {
    Reference {
        log_public_key,
        index,
    }
}

impl Reference {
    pub fn to_json(&self, encoding: BinaryEncoding) -> Value {
        let mut object = Map::new();
        object.insert(
            "logPublicKey".into(),
            self.log_public_key.encode(encoding).into(),
        );
        object.insert("index".into(), self.index.into());
        Value::Object(object)
    }

    pub fn from_json(value: &Value, encoding: BinaryEncoding) -> Result<Self, ValidationError> {
        let object = json::as_object(value, "reference")?;
        json::deny_unknown(object, &["logPublicKey", "index"])?;
        Ok(Self {
            log_public_key: PublicKey(json::bytes::<32>(object, "logPublicKey", encoding)?),
            index: json::uint(object, "index")?,
        })
    }
}

impl From<&OuterEnvelope> for Reference {
    fn from(envelope: &OuterEnvelope) -> Self {
        make_reference(envelope.log_public_key, envelope.index)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.log_public_key, self.index)
    }
}
