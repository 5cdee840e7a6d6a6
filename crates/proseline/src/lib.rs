//! # Proseline
//!
//! Collaborative writing over encrypted, append-only logs.
//!
//! ## Overview
//!
//! Every device writes its own log of entries (drafts, marks, notes,
//! replies, corrections, intros). Entries are signed, sealed under the
//! project's read key, and hash-chained per log. Peers replicate envelopes
//! by discovery key without needing to read them.
//!
//! - **ProjectKeys**: the replication key, read key and optional write seed
//! - **LogWriter**: appends entries to one's own log
//! - **LogBook**: receives envelopes in any order, checks them, stores
//!   them, and plans replication
//!
//! ## Usage
//!
//! ```rust,no_run
//! use proseline::{LogBook, LogWriter, MemoryLogStore, ProjectKeys, ProtocolConfig};
//! use proseline::core::{EntryBody, Keypair};
//!
//! async fn example() -> proseline::Result<()> {
//!     let config = ProtocolConfig::default();
//!     let keys = ProjectKeys::generate(Some("Essay".into()));
//!
//!     let mut writer = LogWriter::new(&keys, Keypair::generate(), &config)?;
//!     let book = LogBook::reader(&keys, MemoryLogStore::new(), config);
//!
//!     let appended = writer.append_now(EntryBody::Intro {
//!         name: "Ada".into(),
//!         device: "laptop".into(),
//!         email: None,
//!         phone: None,
//!     })?;
//!     book.receive(appended.envelope).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `proseline::core` - keys, entries and the schema registry
//! - `proseline::seal` - envelopes and invitations
//! - `proseline::chain` - chain heads, log health and draft resolution
//! - `proseline::sync` - references and replication messages

pub mod book;
pub mod config;
pub mod error;
pub mod project;
pub mod store;
pub mod writer;

// Re-export component crates
pub use proseline_chain as chain;
pub use proseline_core as core;
pub use proseline_seal as seal;
pub use proseline_sync as sync;

// Re-export main types for convenience
pub use book::{LogBook, Outcome};
pub use config::ProtocolConfig;
pub use error::{Error, Result, StoreError};
pub use project::ProjectKeys;
pub use store::{InsertResult, LogStore, MemoryLogStore, StoreResult, StoredEntry};
pub use writer::{Appended, LogWriter};

// Re-export commonly used types
pub use proseline_chain::{ChainError, ChainHead, LogHealth};
pub use proseline_core::{Digest, DiscoveryKey, EntryBody, EntryKind, Keypair, LogEntry, PublicKey};
pub use proseline_seal::{Invitation, InvitationCodec, OuterEnvelope, SealError};
pub use proseline_sync::{Reference, ReplicationMessage};
