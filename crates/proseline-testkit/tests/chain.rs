//! Chain acceptance over sealed entries.

use proseline_chain::{ChainError, ChainLink, ChainMode, Intake, LogChain, DEFAULT_MAX_PENDING};
use proseline_core::{Digest, EntryBody};
use proseline_seal::OuterEnvelope;
use proseline_testkit::fixtures::{intro, ProjectFixture};

/// Seal `count` linked entries and reduce them to links, as a reader would.
fn sealed_log(fixture: &ProjectFixture, tag: &str, count: usize) -> Vec<ChainLink<OuterEnvelope>> {
    let codec = fixture.codec();
    let mut links = Vec::new();
    let mut prior: Option<Digest> = None;
    for index in 0..count as u64 {
        let body = EntryBody::Reply {
            parent: Digest([7; 32]),
            text: format!("{tag} {index}"),
        };
        let entry = match prior {
            None => fixture.first(body),
            Some(prior) => fixture.after(index, prior, body),
        };
        let envelope = fixture.seal(&entry).unwrap();
        let inner = codec.decode(&envelope, fixture.keys.read_key()).unwrap();
        let digest = codec.entry_digest(&inner.entry).unwrap();
        links.push(ChainLink::new(index, inner.entry.chain.prior, digest, envelope));
        prior = Some(digest);
    }
    links
}

fn chain() -> LogChain<OuterEnvelope> {
    LogChain::new(ChainMode::Verifying, DEFAULT_MAX_PENDING)
}

#[test]
fn test_accept_next_is_monotonic() {
    let fixture = ProjectFixture::new();
    let links = sealed_log(&fixture, "a", 3);
    let mut log = chain();

    assert!(matches!(
        log.accept_next(links[1].clone()),
        Err(ChainError::IndexGap { expected: 0, got: 1 })
    ));
    log.accept_next(links[0].clone()).unwrap();
    assert!(matches!(
        log.accept_next(links[2].clone()),
        Err(ChainError::IndexGap { expected: 1, got: 2 })
    ));
    log.accept_next(links[1].clone()).unwrap();
    log.accept_next(links[2].clone()).unwrap();
    assert_eq!(log.head().unwrap().digest, links[2].digest);
}

#[test]
fn test_prior_must_be_head_digest() {
    let fixture = ProjectFixture::new();
    let links = sealed_log(&fixture, "a", 2);
    let other = sealed_log(&fixture, "b", 2);
    let mut log = chain();

    log.accept_next(links[0].clone()).unwrap();
    assert!(matches!(
        log.accept_next(other[1].clone()),
        Err(ChainError::Linkage { index: 1, .. })
    ));
}

#[test]
fn test_resubmission_and_conflict() {
    let fixture = ProjectFixture::new();
    let links = sealed_log(&fixture, "a", 1);
    let rival = sealed_log(&fixture, "b", 1);
    let mut log = chain();

    log.accept_next(links[0].clone()).unwrap();
    assert!(matches!(
        log.accept_next(links[0].clone()),
        Ok(Intake::Duplicate { index: 0 })
    ));
    assert!(matches!(
        log.accept_next(rival[0].clone()),
        Err(ChainError::Conflict { index: 0, .. })
    ));
    assert!(log.health().is_forked());
}

#[test]
fn test_relay_chain_uses_envelope_digests() {
    let fixture = ProjectFixture::new();
    let codec = fixture.codec();
    let first = fixture.seal(&fixture.first(intro("Ada", "laptop"))).unwrap();
    let resealed = fixture.seal(&fixture.first(intro("Ada", "laptop"))).unwrap();
    let mut log: LogChain<()> = LogChain::new(ChainMode::Relaying, DEFAULT_MAX_PENDING);

    let digest = codec.envelope_digest(&first).unwrap();
    log.accept_next(ChainLink::new(0, None, digest, ())).unwrap();
    assert!(matches!(
        log.accept_next(ChainLink::new(0, None, digest, ())),
        Ok(Intake::Duplicate { index: 0 })
    ));

    // Same entry under a fresh nonce is a different envelope.
    let other = codec.envelope_digest(&resealed).unwrap();
    assert_ne!(digest, other);
    assert!(log.accept_next(ChainLink::new(0, None, other, ())).is_err());
}
