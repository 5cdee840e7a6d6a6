//! # Proseline Testkit
//!
//! Testing utilities for the Proseline protocol.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a project with write access, its keys and codecs, and
//!   sample bodies of every entry kind
//! - **Generators**: Proptest strategies for entries, keys and configurations
//!
//! Cross-crate scenario tests live under `tests/`.
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use proseline_testkit::generators::{discovery_key, entry};
//!
//! proptest! {
//!     #[test]
//!     fn entries_validate(sample in discovery_key().prop_flat_map(entry)) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use proseline_testkit::fixtures::{intro, ProjectFixture};
//!
//! let fixture = ProjectFixture::new();
//! let entry = fixture.first(intro("Ada", "laptop"));
//! let envelope = fixture.seal(&entry).unwrap();
//! assert_eq!(envelope.index, 0);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_party_fixtures, sample_bodies, ProjectFixture};
