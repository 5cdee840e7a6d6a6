//! # Proseline Sync
//!
//! The reference protocol peers use to replicate logs.
//!
//! A [`Reference`] names one entry by `(logPublicKey, index)`. Peers
//! [`Offer`](ReplicationMessage::Offer) the head of each log they hold,
//! [`Request`](ReplicationMessage::Request) entries they lack, and answer
//! requests with the entry's [`Envelope`](ReplicationMessage::Envelope).
//! Nothing here needs the read key: relays replicate with the discovery
//! key alone.

pub mod error;
pub mod messages;
pub mod plan;
pub mod reference;

pub use error::{Result, SyncError};
pub use messages::{limits, ReplicationMessage};
pub use plan::{offers_for, requests_for};
pub use reference::{make_reference, Reference};
