//! Batched signature verification.
//!
//! Attestations with identical data have the same signing root. Those with disjoint participants
//! are verified with a single aggregate check. Individual verification is only needed when the
//! aggregate check fails or participants overlap.

use core::time::Duration;
use std::sync::Arc;

use bls::{traits::Signature as _, Signature};
use hashlink::LinkedHashMap;
use log::debug;
use tokio::{
    sync::mpsc::Receiver,
    time::{sleep_until, Instant},
};
use types::{
    nonstandard::ReceivedAttestation, phase0::containers::AttestationData, preset::Preset,
};

use crate::{
    aggregate_verifier::AggregateVerifier, error::Error, state_verifier::VerifiedAttestation,
};

pub type Outcome<P> = (Arc<ReceivedAttestation<P>>, Result<(), Error>);

/// Verifies signatures of a batch of attestations.
///
/// Outcomes are returned in no particular order.
#[must_use]
pub fn verify_batch<P: Preset>(batch: Vec<VerifiedAttestation<P>>) -> Vec<Outcome<P>> {
    let mut outcomes = Vec::with_capacity(batch.len());
    let mut groups =
        LinkedHashMap::<AttestationData, Vec<(VerifiedAttestation<P>, Signature)>>::new();

    for verified in batch {
        match Signature::try_from(verified.attestation.attestation.signature) {
            Ok(signature) => groups
                .entry(verified.attestation.data())
                .or_insert_with(Vec::new)
                .push((verified, signature)),
            Err(_) => outcomes.push((verified.attestation, Err(Error::SignatureUndecodable))),
        }
    }

    for (_, mut group) in groups {
        // Attestations with fewer participants are folded first. The sort is stable, so
        // attestations with equal counts stay in arrival order.
        group.sort_by_key(|(verified, _)| {
            verified.attestation.attestation.aggregation_bits.count_ones()
        });

        let mut aggregate_verifier = AggregateVerifier::<P>::default();

        let (folded, deferred): (Vec<_>, Vec<_>) =
            group.into_iter().partition(|(verified, signature)| {
                aggregate_verifier.add(
                    &verified.attestation.attestation.aggregation_bits,
                    verified.public_key,
                    *signature,
                )
            });

        let aggregate_valid = folded.first().is_some_and(|(verified, _)| {
            aggregate_verifier.verify(verified.signing_root)
        });

        if aggregate_valid {
            outcomes.extend(
                folded
                    .into_iter()
                    .map(|(verified, _)| (verified.attestation, Ok(()))),
            );
        } else {
            if !folded.is_empty() {
                debug!(
                    "aggregate signature of {} attestations is invalid, verifying individually",
                    folded.len(),
                );
            }

            outcomes.extend(folded.into_iter().map(verify_individually));
        }

        outcomes.extend(deferred.into_iter().map(verify_individually));
    }

    outcomes
}

fn verify_individually<P: Preset>(
    (verified, signature): (VerifiedAttestation<P>, Signature),
) -> Outcome<P> {
    let result = if signature.verify(verified.signing_root, &verified.public_key) {
        Ok(())
    } else {
        Err(Error::SignatureInvalid)
    };

    (verified.attestation, result)
}

/// Collects items from `rx` into batches and passes them to `flush`.
///
/// A batch is flushed when it reaches `max_batch_size` items or `max_batch_delay` after its first
/// item was received, whichever comes first. Remaining items are flushed when `rx` is closed.
pub async fn batch_window<T>(
    mut rx: Receiver<T>,
    max_batch_size: usize,
    max_batch_delay: Duration,
    mut flush: impl FnMut(Vec<T>),
) {
    let mut buffer = vec![];
    let mut deadline = None;

    loop {
        tokio::select! {
            item = rx.recv() => match item {
                Some(item) => {
                    if buffer.is_empty() {
                        deadline = Some(Instant::now() + max_batch_delay);
                    }

                    buffer.push(item);

                    if buffer.len() >= max_batch_size {
                        flush(core::mem::take(&mut buffer));
                        deadline = None;
                    }
                }
                None => break,
            },
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                flush(core::mem::take(&mut buffer));
                deadline = None;
            }
        }
    }

    if !buffer.is_empty() {
        flush(buffer);
    }
}
