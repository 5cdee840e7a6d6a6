//! # Proseline Core
//!
//! Pure primitives for the Proseline log protocol: binary codecs, keys,
//! log entries, canonical encoding and the entry schema registry.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`LogEntry`] - One signed unit of content in a device's log
//! - [`EntryKind`] - Discriminator for the six entry kinds
//! - [`SchemaRegistry`] - Field contracts and structural validation per kind
//! - [`Digest`] - BLAKE3 hash of an entry's canonical form
//! - [`DiscoveryKey`] - One-way identifier of a project's logs
//!
//! ## Capabilities
//!
//! Hashing, signing and sealing go through [`CryptoProvider`]; canonical
//! serialization through [`CanonicalEncoder`]; structural checks through
//! [`StructuralValidator`]. [`StandardCrypto`], [`CanonicalJson`] and
//! [`ContractValidator`] are the defaults.

pub mod canonical;
pub mod crypto;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod json;
pub mod schema;

pub use canonical::{CanonicalEncoder, CanonicalJson};
pub use crypto::{
    sign_message, CryptoProvider, Digest, DiscoveryKey, InvitationKey, Keypair, Nonce, PublicKey,
    ReadKey, ReplicationKey, Signature, StandardCrypto, WriteSeed, MAC_LEN,
};
pub use encoding::{BinaryEncoding, EncodingError};
pub use entry::{ChainFields, EntryBody, EntryKind, LogEntry, MarkId, NoteRange, Timestamp};
pub use error::{CoreError, SchemaError, UnknownKindError, ValidationError, ValidationReason};
pub use schema::{
    describe, ContractValidator, FieldContract, FieldShape, FieldSpec, SchemaRegistry,
    StructuralValidator,
};
