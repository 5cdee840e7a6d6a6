//! Per-deployment protocol settings.

use serde::{Deserialize, Serialize};

use proseline_chain::DEFAULT_MAX_PENDING;
use proseline_core::BinaryEncoding;
use proseline_seal::{EnvelopeConfig, InvitationCodec};

/// Choices every peer of a deployment must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Text encoding of binary fields on the wire.
    pub encoding: BinaryEncoding,
    /// Produce version-1 envelopes, with signatures outside the ciphertext.
    pub signatures_in_clear: bool,
    /// Encrypt the replication key inside invitations.
    pub seal_replication_key: bool,
    /// How far ahead of a log's head an entry may be buffered.
    pub max_pending_per_log: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            encoding: BinaryEncoding::Hex,
            signatures_in_clear: false,
            seal_replication_key: false,
            max_pending_per_log: DEFAULT_MAX_PENDING,
        }
    }
}

impl ProtocolConfig {
    /// The subset the envelope codec consumes.
    pub fn envelope(&self) -> EnvelopeConfig {
        EnvelopeConfig {
            encoding: self.encoding,
            signatures_in_clear: self.signatures_in_clear,
        }
    }

    pub fn invitations(&self) -> InvitationCodec {
        InvitationCodec::new(self.seal_replication_key)
    }
}
