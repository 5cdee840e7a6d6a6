//! # Proseline Seal
//!
//! Envelopes and invitations: everything that signs or encrypts.
//!
//! ## Envelopes
//!
//! [`EnvelopeCodec`] turns a validated [`LogEntry`](proseline_core::LogEntry)
//! into an [`OuterEnvelope`] signed by the log key and the project key (and
//! optionally a client key) and encrypted under the project's read key.
//! Peers holding only the discovery key can store and forward outer
//! envelopes; peers holding the read key can [`decode`](EnvelopeCodec::decode)
//! and [`verify`](EnvelopeCodec::verify) them.
//!
//! ## Invitations
//!
//! [`InvitationCodec`] bundles the replication key, read key, and optionally
//! write seed and title, each sealed under an invitation key. The key may be
//! agreed over X25519 with [`ExchangeSecret::invitation_key`].

pub mod envelope;
pub mod error;
pub mod exchange;
pub mod invitation;

pub use envelope::{
    EnvelopeBody, EnvelopeCodec, EnvelopeConfig, EnvelopeVersion, InnerEnvelope, OuterEnvelope,
    Signatures, SigningKeys, VerifyingKeys,
};
pub use error::{Result, SealError, SignatureRole};
pub use exchange::{ExchangePublicKey, ExchangeSecret, INVITATION_KEY_CONTEXT};
pub use invitation::{
    Invitation, InvitationCodec, InvitationSecrets, OpenedInvitation, ReplicationKeyField,
    SealedField,
};
