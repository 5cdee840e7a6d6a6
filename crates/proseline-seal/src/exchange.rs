//! X25519 key agreement for invitation keys.
//!
//! Two devices that know each other's exchange public keys derive the same
//! [`InvitationKey`] without sending it.

use rand::RngCore;
use std::fmt;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};

use proseline_core::{BinaryEncoding, CoreError, EncodingError, InvitationKey};

use crate::error::Result;

/// BLAKE3 key-derivation context for invitation keys.
pub const INVITATION_KEY_CONTEXT: &str = "proseline 2024-01 invitation key";

/// A device's X25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangePublicKey(pub [u8; 32]);

impl ExchangePublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn encode(&self, encoding: BinaryEncoding) -> String {
        encoding.encode(&self.0)
    }

    pub fn decode(encoding: BinaryEncoding, text: &str) -> std::result::Result<Self, EncodingError> {
        encoding.decode_exact::<32>(text).map(Self)
    }
}

/// A device's X25519 secret.
pub struct ExchangeSecret(StaticSecret);

impl ExchangeSecret {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(StaticSecret::from(bytes))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn public_key(&self) -> ExchangePublicKey {
        ExchangePublicKey(*DalekPublicKey::from(&self.0).as_bytes())
    }

    /// Derive the invitation key shared with `peer`.
    ///
    /// `context` binds the key to one invitation, e.g. the project's
    /// discovery key. Fails on low-order peer keys.
    pub fn invitation_key(&self, peer: &ExchangePublicKey, context: &[u8]) -> Result<InvitationKey> {
        let shared = self.0.diffie_hellman(&DalekPublicKey::from(peer.0));
        if !shared.was_contributory() {
            return Err(CoreError::InvalidPublicKey.into());
        }
        let mut hasher = blake3::Hasher::new_derive_key(INVITATION_KEY_CONTEXT);
        hasher.update(shared.as_bytes());
        hasher.update(context);
        Ok(InvitationKey::from_bytes(*hasher.finalize().as_bytes()))
    }
}

impl fmt::Debug for ExchangeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExchangeSecret({:?})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SealError;

    #[test]
    fn test_both_sides_derive_same_key() {
        let alice = ExchangeSecret::generate();
        let bob = ExchangeSecret::generate();

        let k1 = alice.invitation_key(&bob.public_key(), b"project").unwrap();
        let k2 = bob.invitation_key(&alice.public_key(), b"project").unwrap();
        assert_eq!(k1, k2);

        let other = alice.invitation_key(&bob.public_key(), b"other project").unwrap();
        assert_ne!(k1, other);
    }

    #[test]
    fn test_low_order_point_rejected() {
        let alice = ExchangeSecret::generate();
        assert_eq!(
            alice.invitation_key(&ExchangePublicKey([0; 32]), b"project"),
            Err(SealError::Core(CoreError::InvalidPublicKey))
        );
    }

    #[test]
    fn test_public_key_wire() {
        let key = ExchangeSecret::from_bytes([5; 32]).public_key();
        let text = key.encode(BinaryEncoding::Base64);
        assert_eq!(ExchangePublicKey::decode(BinaryEncoding::Base64, &text).unwrap(), key);
    }
}
