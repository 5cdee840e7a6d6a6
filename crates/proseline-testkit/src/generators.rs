//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use proseline_core::{
    BinaryEncoding, ChainFields, Digest, DiscoveryKey, EntryBody, Keypair, LogEntry, MarkId,
    NoteRange, Timestamp,
};
use proseline_seal::EnvelopeConfig;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random digest.
pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest)
}

pub fn discovery_key() -> impl Strategy<Value = DiscoveryKey> {
    any::<[u8; 32]>().prop_map(DiscoveryKey)
}

pub fn mark_id() -> impl Strategy<Value = MarkId> {
    any::<[u8; 4]>().prop_map(MarkId)
}

/// RFC 3339 timestamps, with and without fractional seconds.
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    "20[0-9]{2}-(0[1-9]|1[0-2])-(0[1-9]|1[0-9]|2[0-8])T([01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9](\\.[0-9]{3})?Z"
        .prop_filter_map("valid timestamp", |text| Timestamp::parse(&text).ok())
}

/// A person or device name.
pub fn name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z .'-]{0,40}".prop_map(String::from)
}

/// Free text of at least one character.
pub fn text() -> impl Strategy<Value = String> {
    "[ -~]{1,80}".prop_map(String::from)
}

pub fn email() -> impl Strategy<Value = String> {
    "[a-z0-9.]{1,12}@[a-z]{1,10}\\.(com|org|net)".prop_map(String::from)
}

pub fn phone() -> impl Strategy<Value = String> {
    "\\+[0-9]{7,14}".prop_map(String::from)
}

/// Up to two distinct draft parents.
pub fn parents() -> impl Strategy<Value = Vec<Digest>> {
    prop::collection::btree_set(digest(), 0..=2).prop_map(|set| set.into_iter().collect())
}

pub fn note_range() -> impl Strategy<Value = NoteRange> {
    (0u64..100_000, 1u64..10_000)
        .prop_filter_map("non-empty range", |(start, len)| NoteRange::new(start, start + len).ok())
}

/// Draft text: an object of string members.
pub fn draft_text() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,8}", "[ -~]{0,40}", 0..4).prop_map(|members| {
        members
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect()
    })
}

/// A body of any kind, with optional fields present or absent.
pub fn entry_body() -> impl Strategy<Value = EntryBody> {
    prop_oneof![
        (parents(), draft_text()).prop_map(|(parents, text)| EntryBody::Draft { parents, text }),
        (mark_id(), name(), digest()).prop_map(|(identifier, name, draft)| EntryBody::Mark {
            identifier,
            name,
            draft,
        }),
        (digest(), note_range(), text()).prop_map(|(draft, range, text)| EntryBody::Note {
            draft,
            range,
            text,
        }),
        (digest(), text()).prop_map(|(parent, text)| EntryBody::Reply { parent, text }),
        (digest(), text()).prop_map(|(note, text)| EntryBody::Correction { note, text }),
        (name(), name(), prop::option::of(email()), prop::option::of(phone())).prop_map(
            |(name, device, email, phone)| EntryBody::Intro {
                name,
                device,
                email,
                phone,
            }
        ),
    ]
}

/// Chain fields in `discovery_key`: index 0 without prior, or a later
/// index with one.
pub fn chain_fields(discovery_key: DiscoveryKey) -> impl Strategy<Value = ChainFields> {
    prop_oneof![
        Just(ChainFields::first(discovery_key)),
        (1u64..1_000_000, digest())
            .prop_map(move |(index, prior)| ChainFields::after(discovery_key, index, prior)),
    ]
}

/// A well-formed entry of any kind in `discovery_key`.
pub fn entry(discovery_key: DiscoveryKey) -> impl Strategy<Value = LogEntry> {
    (chain_fields(discovery_key), timestamp(), entry_body())
        .prop_map(|(chain, timestamp, body)| LogEntry::new(chain, timestamp, body))
}

pub fn encoding() -> impl Strategy<Value = BinaryEncoding> {
    prop_oneof![Just(BinaryEncoding::Hex), Just(BinaryEncoding::Base64)]
}

/// Both envelope versions under both encodings.
pub fn envelope_config() -> impl Strategy<Value = EnvelopeConfig> {
    (encoding(), any::<bool>()).prop_map(|(encoding, signatures_in_clear)| EnvelopeConfig {
        encoding,
        signatures_in_clear,
    })
}
