//! Replication planning: which offers to make and which entries to request.

use proseline_core::PublicKey;

use crate::messages::{limits, ReplicationMessage};
use crate::reference::{make_reference, Reference};

/// One offer per log, naming the head index. Empty logs are not offered.
pub fn offers_for<I>(heads: I) -> Vec<ReplicationMessage>
where
    I: IntoIterator<Item = (PublicKey, Option<u64>)>,
{
    let mut offers: Vec<Reference> = heads
        .into_iter()
        .filter_map(|(log, head)| head.map(|index| make_reference(log, index)))
        .collect();
    offers.sort();
    offers.into_iter().map(ReplicationMessage::Offer).collect()
}

/// References to request after an offer.
///
/// `held` is the number of entries already accepted for the log;
/// `is_pending` reports indices already waiting in the out-of-order buffer.
/// At most [`limits::MAX_REQUESTS_PER_OFFER`] references are returned, the
/// lowest indices first.
pub fn requests_for(
    offer: &Reference,
    held: u64,
    is_pending: impl Fn(u64) -> bool,
) -> Vec<Reference> {
    (held..=offer.index)
        .filter(|index| !is_pending(*index))
        .take(limits::MAX_REQUESTS_PER_OFFER)
        .map(|index| make_reference(offer.log_public_key, index))
        .collect()
}
