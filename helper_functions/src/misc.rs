use core::{num::NonZeroU64, ops::Range};

use anyhow::Result;
use bit_field::BitArray as _;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{ForkData, SigningData},
        primitives::{Domain, DomainType, Epoch, Slot, ValidatorIndex, Version, H256},
    },
    preset::Preset,
    traits::SszHash,
};

use crate::error::Error;

const BITS_PER_HASH: u64 = 256;

#[must_use]
pub fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SlotsPerEpoch::U64
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(P::SlotsPerEpoch::U64)
}

#[must_use]
pub fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slots_since_epoch_start::<P>(slot) == 0
}

#[must_use]
pub fn slots_since_epoch_start<P: Preset>(slot: Slot) -> u64 {
    slot - compute_start_slot_at_epoch::<P>(compute_epoch_at_slot::<P>(slot))
}

#[must_use]
pub const fn slots_in_epoch<P: Preset>(epoch: Epoch) -> Range<Slot> {
    compute_start_slot_at_epoch::<P>(epoch)..compute_start_slot_at_epoch::<P>(epoch + 1)
}

// > Return the 32-byte fork data root for the ``current_version`` and ``genesis_validators_root``.
// > This is used primarily in signature domains to avoid collisions across forks/chains.
fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_domain(
    config: &Config,
    domain_type: DomainType,
    fork_version: Option<Version>,
    genesis_validators_root: Option<H256>,
) -> Domain {
    let fork_version = fork_version.unwrap_or(config.genesis_fork_version);
    let genesis_validators_root = genesis_validators_root.unwrap_or_else(H256::zero);
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = Domain::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

pub fn compute_signing_root(object: &(impl SszHash + ?Sized), domain: Domain) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

/// [`compute_shuffled_index`](https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/beacon-chain.md#compute_shuffled_index)
///
/// Swap-or-not shuffle of a single index. Committees are small enough that computing each
/// member separately is cheaper than shuffling the whole active validator list.
#[must_use]
pub fn compute_shuffled_index<P: Preset>(
    mut index: ValidatorIndex,
    index_count: NonZeroU64,
    seed: H256,
) -> ValidatorIndex {
    assert!(index < index_count.get());

    for round in 0..P::SHUFFLE_ROUND_COUNT {
        let pivot = compute_pivot(seed, round, index_count);
        let flip = (pivot + index_count.get() - index) % index_count;
        let position = index.max(flip);

        // Truncate to match the behavior of `compute_shuffled_index` in `consensus-specs`.
        #[expect(clippy::cast_possible_truncation)]
        let position_window = (position / BITS_PER_HASH) as u32;

        let source = hashing::hash_256_8_32(seed, round, position_window);
        let bit_index = position.to_le_bytes()[0].into();

        if source.as_bytes().get_bit(bit_index) {
            index = flip;
        }
    }

    index
}

fn compute_pivot(seed: H256, round: u8, index_count: NonZeroU64) -> u64 {
    let value = hashing::hash_256_8(seed, round).as_bytes()[..size_of::<u64>()]
        .try_into()
        .map(u64::from_le_bytes)
        .expect("slice has the same size as u64");

    value % index_count
}

/// [`compute_proposer_index`](https://github.com/ethereum/consensus-specs/blob/v1.4.0/specs/phase0/beacon-chain.md#compute_proposer_index)
pub fn compute_proposer_index<P: Preset>(
    state: &BeaconState<P>,
    indices: &[ValidatorIndex],
    seed: H256,
) -> Result<ValidatorIndex> {
    let total = NonZeroU64::new(indices.len().try_into()?).ok_or(Error::NoActiveValidators)?;
    let max_random_byte = u64::from(u8::MAX);
    let bytes_per_hash = H256::len_bytes() as u64;

    let proposer_index = (0..u64::MAX / bytes_per_hash)
        .flat_map(|quotient| {
            hashing::hash_256_64(seed, quotient)
                .to_fixed_bytes()
                .into_iter()
                .map(u64::from)
        })
        .zip(0..)
        .find_map(|(random_byte, attempt)| {
            let shuffled = compute_shuffled_index::<P>(attempt % total, total, seed);

            let candidate_index = usize::try_from(shuffled)
                .ok()
                .and_then(|position| indices.get(position))
                .copied()
                .expect("compute_shuffled_index returns a value less than indices.len()");

            let effective_balance = usize::try_from(candidate_index)
                .ok()
                .and_then(|index| state.validators.get(index))
                .expect("candidate_index was produced by enumerating active validators")
                .effective_balance;

            (effective_balance * max_random_byte >= P::MAX_EFFECTIVE_BALANCE * random_byte)
                .then_some(candidate_index)
        })
        .expect("the loop eventually finds a proposer with overwhelming probability");

    Ok(proposer_index)
}

#[must_use]
pub fn committee_count_from_active_validator_count<P: Preset>(active_validator_count: u64) -> u64 {
    (active_validator_count / P::SlotsPerEpoch::U64 / P::TARGET_COMMITTEE_SIZE)
        .clamp(1, P::MAX_COMMITTEES_PER_SLOT.get())
}
