//! Cryptographic primitives for the Proseline protocol.
//!
//! Wraps Ed25519 signing, BLAKE3 hashing and XChaCha20-Poly1305 sealing
//! behind strong types, and exposes them to the rest of the workspace
//! through the [`CryptoProvider`] capability.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use std::fmt;

use crate::encoding::{BinaryEncoding, EncodingError};
use crate::error::CoreError;

/// Length of the Poly1305 authentication tag appended to every ciphertext.
pub const MAC_LEN: usize = 16;

/// Domain separation prefix for entry signatures.
pub const ENTRY_SIGN_DOMAIN: &[u8] = b"proseline/entry-sig/v1";

/// BLAKE3 key-derivation context for discovery keys.
pub const DISCOVERY_CONTEXT: &str = "proseline 2024-01 discovery key";

/// Public fixed-size byte newtype with hex/base64 wire helpers.
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length in bytes.
            pub const LEN: usize = $len;

            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Encode for the wire.
            pub fn encode(&self, encoding: $crate::encoding::BinaryEncoding) -> String {
                encoding.encode(&self.0)
            }

            /// Decode from the wire, enforcing the exact length.
            pub fn decode(
                encoding: $crate::encoding::BinaryEncoding,
                text: &str,
            ) -> Result<Self, $crate::encoding::EncodingError> {
                encoding.decode_exact::<$len>(text).map(Self)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({}...)"), &self.to_hex()[..8])
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", &self.to_hex()[..16usize.min($len * 2)])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }
    };
}

/// Secret 32-byte key material. Never printed, never copied implicitly.
macro_rules! secret_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Length in bytes.
            pub const LEN: usize = 32;

            /// Generate new random key material.
            pub fn generate() -> Self {
                let mut bytes = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                Self(bytes)
            }

            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Encode for the wire.
            pub fn encode(&self, encoding: BinaryEncoding) -> String {
                encoding.encode(&self.0)
            }

            /// Decode from the wire, enforcing the exact length.
            pub fn decode(encoding: BinaryEncoding, text: &str) -> Result<Self, EncodingError> {
                encoding.decode_exact::<32>(text).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

pub(crate) use fixed_bytes;

fixed_bytes!(
    /// A 32-byte BLAKE3 digest of an entry's canonical serialization.
    Digest,
    32,
    "Digest"
);

fixed_bytes!(
    /// A 32-byte Ed25519 public key (a log key or the project key).
    PublicKey,
    32,
    "PublicKey"
);

fixed_bytes!(
    /// A 64-byte Ed25519 signature.
    Signature,
    64,
    "Sig"
);

fixed_bytes!(
    /// A 24-byte XChaCha20-Poly1305 nonce.
    Nonce,
    24,
    "Nonce"
);

fixed_bytes!(
    /// One-way derivation of a project's replication key.
    ///
    /// Lets replication-only peers recognize which logs belong to a project
    /// without learning how to decrypt them.
    DiscoveryKey,
    32,
    "DiscoveryKey"
);

secret_key!(
    /// Shared secret granting the ability to locate and exchange a project's
    /// encrypted entries.
    ReplicationKey
);

secret_key!(
    /// Shared secret granting the ability to decrypt a project's entries.
    ReadKey
);

secret_key!(
    /// Seed of the project keypair; holding it grants authorship.
    WriteSeed
);

secret_key!(
    /// Symmetric key protecting the secret fields of an invitation.
    InvitationKey
);

impl Nonce {
    /// Generate a new random nonce.
    ///
    /// 192-bit nonces are safe to draw at random for the lifetime of a key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl Digest {
    /// Compute the BLAKE3 digest of the given data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

impl PublicKey {
    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = DalekSignature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl ReplicationKey {
    /// Derive the project's discovery key.
    pub fn discovery_key(&self) -> DiscoveryKey {
        DiscoveryKey(blake3::derive_key(DISCOVERY_CONTEXT, &self.0))
    }
}

/// An Ed25519 keypair: a log key or the project (write) key.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Derive the project keypair from a write seed.
    pub fn from_write_seed(seed: &WriteSeed) -> Self {
        Self::from_seed(seed.as_bytes())
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// The cryptographic capability the protocol is written against.
///
/// Codecs and validators take a provider instead of calling primitives
/// directly, so deployments can swap in a different implementation.
pub trait CryptoProvider: Send + Sync {
    /// Hash arbitrary bytes.
    fn digest(&self, data: &[u8]) -> Digest;

    /// Derive the discovery key from a replication key.
    fn discovery_key(&self, replication_key: &ReplicationKey) -> DiscoveryKey;

    /// Sign a message.
    fn sign(&self, keypair: &Keypair, message: &[u8]) -> Signature;

    /// Verify a signature.
    fn verify(
        &self,
        public_key: &PublicKey,
        message: &[u8],
        signature: &Signature,
    ) -> Result<(), CoreError>;

    /// Authenticated encryption. Output length is `plaintext.len() + MAC_LEN`.
    fn seal(&self, key: &[u8; 32], nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>, CoreError>;

    /// Authenticated decryption.
    fn open(&self, key: &[u8; 32], nonce: &Nonce, ciphertext: &[u8])
        -> Result<Vec<u8>, CoreError>;
}

/// Ed25519, BLAKE3 and XChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCrypto;

impl CryptoProvider for StandardCrypto {
    fn digest(&self, data: &[u8]) -> Digest {
        Digest::hash(data)
    }

    fn discovery_key(&self, replication_key: &ReplicationKey) -> DiscoveryKey {
        replication_key.discovery_key()
    }

    fn sign(&self, keypair: &Keypair, message: &[u8]) -> Signature {
        keypair.sign(message)
    }

    fn verify(
        &self,
        public_key: &PublicKey,
        message: &[u8],
        signature: &Signature,
    ) -> Result<(), CoreError> {
        public_key.verify(message, signature)
    }

    fn seal(&self, key: &[u8; 32], nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>, CoreError> {
        let cipher = XChaCha20Poly1305::new_from_slice(key)
            .map_err(|e| CoreError::Encryption(e.to_string()))?;
        cipher
            .encrypt(XNonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CoreError::Encryption(e.to_string()))
    }

    fn open(
        &self,
        key: &[u8; 32],
        nonce: &Nonce,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CoreError> {
        let cipher =
            XChaCha20Poly1305::new_from_slice(key).map_err(|_| CoreError::Decryption)?;
        cipher
            .decrypt(XNonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CoreError::Decryption)
    }
}

/// Build the signed message for an entry (with domain separation).
pub fn sign_message(canonical_entry: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(ENTRY_SIGN_DOMAIN.len() + canonical_entry.len());
    msg.extend_from_slice(ENTRY_SIGN_DOMAIN);
    msg.extend_from_slice(canonical_entry);
    msg
}
