use core::num::NonZeroU64;

use anyhow::{bail, ensure, Result};
use bls::CachedPublicKey;
use itertools::Itertools as _;
use typenum::Unsigned;
use types::{
    collections::BitList,
    config::Config,
    nonstandard::{AttestationEpoch, RelativeEpoch},
    phase0::{
        beacon_state::BeaconState,
        consts::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, GENESIS_EPOCH},
        containers::{Attestation, AttestationData, IndexedAttestation},
        primitives::{CommitteeIndex, Domain, DomainType, Epoch, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub fn get_previous_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    get_current_epoch(state)
        .saturating_sub(1)
        .max(GENESIS_EPOCH)
}

#[must_use]
pub fn get_current_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    misc::compute_epoch_at_slot::<P>(state.slot)
}

#[must_use]
pub fn get_next_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    get_current_epoch(state) + 1
}

#[must_use]
pub fn absolute_epoch<P: Preset>(state: &BeaconState<P>, relative_epoch: RelativeEpoch) -> Epoch {
    match relative_epoch {
        RelativeEpoch::Previous => get_previous_epoch(state),
        RelativeEpoch::Current => get_current_epoch(state),
        RelativeEpoch::Next => get_next_epoch(state),
    }
}

pub fn attestation_epoch<P: Preset>(
    state: &BeaconState<P>,
    epoch: Epoch,
) -> Result<AttestationEpoch> {
    match get_current_epoch(state).checked_sub(epoch) {
        None => bail!(Error::EpochInTheFuture),
        Some(0) => Ok(AttestationEpoch::Current),
        Some(1) => Ok(AttestationEpoch::Previous),
        Some(_) => bail!(Error::EpochBeforePrevious),
    }
}

pub fn relative_epoch<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> Result<RelativeEpoch> {
    match get_next_epoch(state).checked_sub(epoch) {
        None => bail!(Error::EpochAfterNext),
        Some(0) => Ok(RelativeEpoch::Next),
        Some(1) => Ok(RelativeEpoch::Current),
        Some(2) => Ok(RelativeEpoch::Previous),
        Some(_) => bail!(Error::EpochBeforePrevious),
    }
}

pub fn get_block_root_at_slot<P: Preset>(state: &BeaconState<P>, slot: Slot) -> Result<H256> {
    ensure!(slot < state.slot, Error::SlotOutOfRange);

    ensure!(
        state.slot <= slot + P::SlotsPerHistoricalRoot::U64,
        Error::SlotOutOfRange,
    );

    Ok(state.block_roots[mod_index::<P::SlotsPerHistoricalRoot>(slot)])
}

#[must_use]
pub fn get_randao_mix<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> H256 {
    state.randao_mixes[mod_index::<P::EpochsPerHistoricalVector>(epoch)]
}

pub fn public_key<P: Preset>(
    state: &BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<&CachedPublicKey> {
    let validator = usize::try_from(validator_index)
        .ok()
        .and_then(|index| state.validators.get(index))
        .ok_or(Error::ValidatorNotFound { validator_index })?;

    Ok(&validator.pubkey)
}

pub fn get_active_validator_indices<P: Preset>(
    state: &BeaconState<P>,
    relative_epoch: RelativeEpoch,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    let epoch = absolute_epoch(state, relative_epoch);

    (0..)
        .zip(&state.validators)
        .filter(move |(_, validator)| predicates::is_active_validator(validator, epoch))
        .map(|(index, _)| index)
}

fn get_seed<P: Preset>(state: &BeaconState<P>, epoch: Epoch, domain_type: DomainType) -> H256 {
    let mix = get_randao_mix(
        state,
        epoch + P::EpochsPerHistoricalVector::U64 - P::MIN_SEED_LOOKAHEAD - 1,
    );

    hashing::hash_32_64_256(domain_type.to_fixed_bytes(), epoch, mix)
}

#[must_use]
pub fn get_committee_count_per_slot<P: Preset>(
    state: &BeaconState<P>,
    relative_epoch: RelativeEpoch,
) -> u64 {
    let active_validator_count = get_active_validator_indices(state, relative_epoch).count();

    misc::committee_count_from_active_validator_count::<P>(
        active_validator_count
            .try_into()
            .expect("number of validators fits in u64"),
    )
}

/// [`get_beacon_committee`](https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/beacon-chain.md#get_beacon_committee)
///
/// Committees are not cached. Every call reshuffles the members of the requested committee.
pub fn beacon_committee<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);
    let relative_epoch = relative_epoch(state, epoch)?;
    let committees_per_slot = get_committee_count_per_slot(state, relative_epoch);

    ensure!(
        committee_index < committees_per_slot,
        Error::CommitteeIndexOutOfBounds {
            index: committee_index,
            committees_per_slot,
        },
    );

    let indices = get_active_validator_indices(state, relative_epoch).collect_vec();

    let Some(index_count) = NonZeroU64::new(indices.len().try_into()?) else {
        bail!(Error::NoActiveValidators);
    };

    let seed = get_seed(state, epoch, DOMAIN_BEACON_ATTESTER);
    let committees_in_epoch = committees_per_slot * P::SlotsPerEpoch::U64;
    let slots_since_epoch_start = misc::slots_since_epoch_start::<P>(slot);
    let index_in_epoch = slots_since_epoch_start * committees_per_slot + committee_index;
    let start = index_count.get() * index_in_epoch / committees_in_epoch;
    let end = index_count.get() * (index_in_epoch + 1) / committees_in_epoch;

    (start..end)
        .map(|position| -> Result<ValidatorIndex> {
            let shuffled = misc::compute_shuffled_index::<P>(position, index_count, seed);
            Ok(indices[usize::try_from(shuffled)?])
        })
        .collect()
}

/// [`get_beacon_proposer_index`](https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/beacon-chain.md#get_beacon_proposer_index)
pub fn get_beacon_proposer_index<P: Preset>(state: &BeaconState<P>) -> Result<ValidatorIndex> {
    let epoch = get_current_epoch(state);
    let seed = hashing::hash_256_64(get_seed(state, epoch, DOMAIN_BEACON_PROPOSER), state.slot);
    let indices = get_active_validator_indices(state, RelativeEpoch::Current).collect_vec();

    misc::compute_proposer_index(state, &indices, seed)
}

#[must_use]
pub fn get_domain<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    domain_type: DomainType,
    epoch: Option<Epoch>,
) -> Domain {
    let epoch = epoch.unwrap_or_else(|| get_current_epoch(state));
    let fork = state.fork;

    let fork_version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    misc::compute_domain(
        config,
        domain_type,
        Some(fork_version),
        Some(state.genesis_validators_root),
    )
}

pub fn get_indexed_attestation<P: Preset>(
    state: &BeaconState<P>,
    attestation: &Attestation<P>,
) -> Result<IndexedAttestation> {
    let mut attesting_indices =
        get_attesting_indices(state, attestation.data, &attestation.aggregation_bits)?
            .collect_vec();

    // Sorting a slice is faster than building a `BTreeSet`.
    attesting_indices.sort_unstable();

    Ok(IndexedAttestation {
        attesting_indices,
        data: attestation.data,
        signature: attestation.signature,
    })
}

pub fn get_attesting_indices<'bits, P: Preset>(
    state: &BeaconState<P>,
    attestation_data: AttestationData,
    aggregation_bits: &'bits BitList<P::MaxValidatorsPerCommittee>,
) -> Result<impl Iterator<Item = ValidatorIndex> + 'bits> {
    let committee = beacon_committee(state, attestation_data.slot, attestation_data.index)?;

    ensure!(
        committee.len() == aggregation_bits.len(),
        Error::CommitteeLengthMismatch {
            aggregation_bitlist_length: aggregation_bits.len(),
            committee_length: committee.len(),
        },
    );

    Ok(aggregation_bits
        .iter()
        .zip(committee)
        .filter_map(|(present, validator_index)| present.then_some(validator_index)))
}

fn mod_index<N: Unsigned>(index: u64) -> usize {
    usize::try_from(index % N::U64).expect("remainder of division by vector length fits in usize")
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;
    use types::preset::Minimal;

    use super::*;

    fn genesis_state() -> BeaconState<Minimal> {
        interop::quick_start_beacon_state(&Config::minimal(), 0, nonzero!(64_u64))
    }

    #[test]
    fn test_get_current_epoch_genesis() {
        assert_eq!(get_current_epoch(&genesis_state()), GENESIS_EPOCH);
    }

    #[test]
    fn test_get_previous_epoch() {
        let mut state = genesis_state();
        state.slot = 35;

        assert_eq!(get_current_epoch(&state), 4);
        assert_eq!(get_previous_epoch(&state), 3);
    }

    #[test]
    fn test_get_previous_epoch_genesis() {
        assert_eq!(get_previous_epoch(&genesis_state()), GENESIS_EPOCH);
    }

    #[test]
    fn test_attestation_epoch() -> Result<()> {
        let mut state = genesis_state();
        state.slot = 17;

        assert_eq!(attestation_epoch(&state, 2)?, AttestationEpoch::Current);
        assert_eq!(attestation_epoch(&state, 1)?, AttestationEpoch::Previous);
        attestation_epoch(&state, 0).expect_err("epoch 0 is before previous epoch");
        attestation_epoch(&state, 3).expect_err("epoch 3 is in the future");

        Ok(())
    }

    #[test]
    fn test_get_block_root_at_slot() -> Result<()> {
        let mut state = genesis_state();
        state.slot = 2;
        state.block_roots.set(1, H256::repeat_byte(1));

        assert_eq!(get_block_root_at_slot(&state, 1)?, H256::repeat_byte(1));
        get_block_root_at_slot(&state, 2).expect_err("root of block at state slot is not known");

        Ok(())
    }

    #[test]
    fn test_public_key_of_unknown_validator() {
        public_key(&genesis_state(), 64).expect_err("registry only has 64 validators");
    }

    #[test]
    fn committees_of_a_slot_are_disjoint_and_cover_its_share_of_validators() -> Result<()> {
        let state = genesis_state();
        let committees_per_slot = get_committee_count_per_slot(&state, RelativeEpoch::Current);

        // 64 validators, 8 slots per epoch and a target committee size of 4.
        assert_eq!(committees_per_slot, 2);

        let members = (0..committees_per_slot)
            .map(|index| beacon_committee(&state, 0, index))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect_vec();

        assert_eq!(members.len(), 8);
        assert!(members.iter().all_unique());

        Ok(())
    }

    #[test]
    fn every_validator_is_in_exactly_one_committee_per_epoch() -> Result<()> {
        let state = genesis_state();

        let mut members = vec![];

        for slot in misc::slots_in_epoch::<Minimal>(0) {
            for index in 0..get_committee_count_per_slot(&state, RelativeEpoch::Current) {
                members.extend(beacon_committee(&state, slot, index)?);
            }
        }

        members.sort_unstable();

        itertools::assert_equal(members, 0..64);

        Ok(())
    }

    #[test]
    fn proposer_index_is_stable_within_a_slot_and_changes_across_slots() -> Result<()> {
        let mut state = genesis_state();

        let proposers = (0..8)
            .map(|slot| {
                state.slot = slot;
                get_beacon_proposer_index(&state)
            })
            .collect::<Result<Vec<_>>>()?;

        state.slot = 0;

        assert_eq!(get_beacon_proposer_index(&state)?, proposers[0]);
        assert!(proposers.iter().all(|index| *index < 64));
        assert!(!proposers.iter().all_equal());

        Ok(())
    }

    #[test]
    fn beacon_committee_rejects_out_of_bounds_index() {
        beacon_committee(&genesis_state(), 0, 2).expect_err("there are 2 committees per slot");
    }

    #[test]
    fn attesting_indices_follow_aggregation_bits() -> Result<()> {
        let state = genesis_state();
        let committee = beacon_committee(&state, 3, 1)?;

        let mut aggregation_bits = BitList::with_length(committee.len())?;
        aggregation_bits.set(1, true);

        let data = AttestationData {
            slot: 3,
            index: 1,
            ..AttestationData::default()
        };

        itertools::assert_equal(
            get_attesting_indices(&state, data, &aggregation_bits)?,
            [committee[1]],
        );

        Ok(())
    }

    #[test]
    fn attesting_indices_require_matching_bitlist_length() -> Result<()> {
        let state = genesis_state();
        let aggregation_bits = BitList::with_length(1)?;

        get_attesting_indices(&state, AttestationData::default(), &aggregation_bits)
            .map(Iterator::count)
            .expect_err("committees have more than one member");

        Ok(())
    }
}
