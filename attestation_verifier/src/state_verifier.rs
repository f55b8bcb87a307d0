//! Checks that depend on the state attestations were made in.
//!
//! Attestations are batched by target checkpoint and voted block. Every attestation in a batch
//! can be verified against the same state, so the state only has to be computed once.

use std::sync::Arc;

use bls::{traits::PublicKey as _, PublicKey};
use fork_choice_store::StoreView;
use hashlink::LinkedHashMap;
use helper_functions::{accessors, misc, signing::SignForSingleFork as _};
use itertools::Itertools as _;
use log::warn;
use std_ext::ArcExt as _;
use transition_functions::StateTransition;
use types::{
    config::Config,
    nonstandard::{AttestationEpoch, ReceivedAttestation, RelativeEpoch},
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, Checkpoint},
        primitives::{ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::error::Error;

/// Target checkpoint and voted block root.
pub type BatchKey = (Checkpoint, H256);

/// An attestation that passed every check except signature verification.
#[derive(Clone, Debug)]
pub struct VerifiedAttestation<P: Preset> {
    pub attestation: Arc<ReceivedAttestation<P>>,
    pub attesting_indices: Vec<ValidatorIndex>,
    /// Aggregate of the public keys of all attesting validators.
    pub public_key: PublicKey,
    pub signing_root: H256,
}

#[derive(Debug)]
pub struct Rejection<P: Preset> {
    pub attestation: Arc<ReceivedAttestation<P>>,
    pub reason: Error,
}

pub type Outcome<P> = Result<VerifiedAttestation<P>, Rejection<P>>;

/// Batches waiting for verification, oldest first.
pub struct PendingBatches<P: Preset> {
    batches: LinkedHashMap<BatchKey, Vec<Arc<ReceivedAttestation<P>>>>,
}

impl<P: Preset> Default for PendingBatches<P> {
    fn default() -> Self {
        Self {
            batches: LinkedHashMap::new(),
        }
    }
}

impl<P: Preset> PendingBatches<P> {
    // A batch keeps its position when more attestations are added to it.
    // `LinkedHashMap::entry` would move an existing batch to the back.
    pub fn push(&mut self, attestation: Arc<ReceivedAttestation<P>>) {
        let data = attestation.data();
        let key = (data.target, data.beacon_block_root);

        if let Some(batch) = self.batches.get_mut(&key) {
            batch.push(attestation);
        } else {
            self.batches.insert(key, vec![attestation]);
        }
    }

    /// Number of attestations in all batches.
    #[must_use]
    pub fn attestation_count(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    pub fn take(&mut self) -> Option<(BatchKey, Vec<Arc<ReceivedAttestation<P>>>)> {
        self.batches.pop_front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }
}

/// Verifies a batch of attestations with the same target voting for the same block.
///
/// The block must already be in `store`.
pub fn verify_batch<P: Preset>(
    store: &impl StoreView<P>,
    transition: &impl StateTransition<P>,
    (target, block_root): BatchKey,
    batch: Vec<Arc<ReceivedAttestation<P>>>,
) -> Vec<Outcome<P>> {
    let block_state = store
        .state(block_root)
        .unwrap_or_else(|| panic!("state of block {block_root:?} should be in the store"));

    assert!(
        store.block(block_root).is_some(),
        "block {block_root:?} should be in the store",
    );

    let block_epoch = misc::compute_epoch_at_slot::<P>(block_state.slot);

    let batch_error = if block_epoch > target.epoch {
        Some(Error::BlockEpochAfterTarget {
            block_epoch,
            target_epoch: target.epoch,
        })
    } else if block_epoch < target.epoch && target.root != block_root {
        // Without blocks in between, the voted block is the target block.
        Some(Error::TargetRootMismatch {
            target_root: target.root,
            block_root,
        })
    } else {
        None
    };

    if let Some(reason) = batch_error {
        return reject_all(batch, reason);
    }

    let target_state = if block_epoch == target.epoch {
        block_state.clone_arc()
    } else {
        let mut state = block_state.clone_arc();
        let target_slot = misc::compute_start_slot_at_epoch::<P>(target.epoch);

        if let Err(error) = transition.process_slots(state.make_mut(), target_slot) {
            warn!("failed to advance state of block {block_root:?} to slot {target_slot}: {error}");

            return reject_all(
                batch,
                Error::TargetStateUnavailable {
                    target_epoch: target.epoch,
                },
            );
        }

        state
    };

    batch
        .into_iter()
        .map(|attestation| verify_attestation(store.chain_config(), &target_state, attestation))
        .collect()
}

/// Checks that don't require computing a state, followed by signing root computation.
///
/// `state` must be in the epoch of the attestation target.
pub fn verify_attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    attestation: Arc<ReceivedAttestation<P>>,
) -> Outcome<P> {
    match verify_fields(config, state, &attestation.attestation) {
        Ok((attesting_indices, public_key, signing_root)) => Ok(VerifiedAttestation {
            attestation,
            attesting_indices,
            public_key,
            signing_root,
        }),
        Err(reason) => Err(Rejection {
            attestation,
            reason,
        }),
    }
}

fn verify_fields<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    attestation: &Attestation<P>,
) -> Result<(Vec<ValidatorIndex>, PublicKey, H256), Error> {
    let data = attestation.data;
    let attestation_epoch = misc::compute_epoch_at_slot::<P>(data.slot);

    let relative_epoch = match accessors::attestation_epoch(state, attestation_epoch) {
        Ok(AttestationEpoch::Current) => RelativeEpoch::Current,
        Ok(AttestationEpoch::Previous) => RelativeEpoch::Previous,
        Err(_) => {
            return Err(Error::SlotOutsideStateEpochs {
                slot: data.slot,
                state_epoch: accessors::get_current_epoch(state),
            })
        }
    };

    let committees_per_slot = accessors::get_committee_count_per_slot(state, relative_epoch);

    if data.index >= committees_per_slot {
        return Err(Error::CommitteeIndexOutOfRange {
            index: data.index,
            committees_per_slot,
        });
    }

    let committee = accessors::beacon_committee(state, data.slot, data.index).map_err(|_| {
        Error::CommitteeUnavailable {
            slot: data.slot,
            index: data.index,
        }
    })?;

    let bitfield_length = attestation.aggregation_bits.len();

    if bitfield_length != committee.len() {
        return Err(Error::BitfieldLengthMismatch {
            bitfield_length,
            committee_size: committee.len(),
        });
    }

    let attesting_indices = committee
        .into_iter()
        .zip(attestation.aggregation_bits.iter())
        .filter_map(|(validator_index, bit)| bit.then_some(validator_index))
        .collect_vec();

    let public_keys = attesting_indices.iter().map(|validator_index| {
        accessors::public_key(state, *validator_index)
            .ok()
            .and_then(|cached| cached.decompress().ok())
            .copied()
            .ok_or(Error::PublicKeyUnavailable {
                validator_index: *validator_index,
            })
    });

    let public_key = itertools::process_results(public_keys, |public_keys| {
        PublicKey::aggregate_nonempty(public_keys)
    })?
        .map_err(|_| Error::NoAggregationBits)?;

    let signing_root = data.signing_root(config, state);

    Ok((attesting_indices, public_key, signing_root))
}

fn reject_all<P: Preset>(
    batch: Vec<Arc<ReceivedAttestation<P>>>,
    reason: Error,
) -> Vec<Outcome<P>> {
    batch
        .into_iter()
        .map(|attestation| Err(Rejection { attestation, reason }))
        .collect()
}
