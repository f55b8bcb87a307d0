//! Builders for blocks and attestations used in tests.
//!
//! Blocks are built on top of interop genesis states and are not signed.
//! Attestations are signed with interop secret keys.

use core::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{ensure, Context as _, Result};
use bls::{traits::Signature as _, Signature, SignatureBytes};
use helper_functions::{accessors, misc, signing::SignForSingleFork as _};
use std_ext::ArcExt as _;
use transition_functions::{ProcessSlots, StateRootPolicy};
use typenum::Unsigned as _;
use types::{
    collections::BitList,
    config::Config,
    nonstandard::RelativeEpoch,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, AttestationData, BeaconBlock, BeaconBlockBody, Checkpoint},
        primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
    traits::SszHash as _,
};

type BlockWithState<P> = (Arc<BeaconBlock<P>>, Arc<BeaconState<P>>);

/// Genesis state with enough validators to fill one committee of
/// [`Preset::TARGET_COMMITTEE_SIZE`] in every slot, along with its block.
pub fn min_genesis_state<P: Preset>(
    config: &Config,
) -> Result<(Arc<BeaconState<P>>, Arc<BeaconBlock<P>>)> {
    let slots_per_epoch =
        NonZeroU64::new(P::SlotsPerEpoch::U64).context("SlotsPerEpoch is nonzero")?;

    let validator_count = P::TARGET_COMMITTEE_SIZE.saturating_mul(slots_per_epoch);
    let state = interop::quick_start_beacon_state::<P>(config, 0, validator_count);
    let block = interop::quick_start_genesis_block(&state);

    Ok((Arc::new(state), Arc::new(block)))
}

pub fn empty_block<P: Preset>(
    pre_state: Arc<BeaconState<P>>,
    slot: Slot,
    graffiti: H256,
) -> Result<BlockWithState<P>> {
    block_with_attestations(pre_state, slot, graffiti, vec![])
}

/// Builds a block at `slot` on top of the block `pre_state` is the post-state of.
///
/// `graffiti` makes blocks with the same parent and slot distinct.
pub fn block_with_attestations<P: Preset>(
    mut state: Arc<BeaconState<P>>,
    slot: Slot,
    graffiti: H256,
    attestations: Vec<Attestation<P>>,
) -> Result<BlockWithState<P>> {
    let state_mut = state.make_mut();

    transition_functions::process_slots(state_mut, slot)?;

    let mut block = BeaconBlock {
        slot,
        proposer_index: accessors::get_beacon_proposer_index(state_mut)?,
        parent_root: state_mut.latest_block_header.hash_tree_root(),
        state_root: H256::zero(),
        body: BeaconBlockBody {
            randao_reveal: SignatureBytes::empty(),
            graffiti,
            attestations,
        },
    };

    transition_functions::state_transition(
        state_mut,
        &block,
        ProcessSlots::Never,
        StateRootPolicy::Trust,
    )?;

    block.state_root = state_mut.hash_tree_root();

    Ok((Arc::new(block), state))
}

/// Builds consecutive empty blocks on top of `state`, one for every slot in `slots`.
pub fn empty_chain<P: Preset>(
    mut state: Arc<BeaconState<P>>,
    slots: impl IntoIterator<Item = Slot>,
) -> Result<Vec<BlockWithState<P>>> {
    let mut blocks = vec![];

    for slot in slots {
        let (block, post_state) = empty_block(state, slot, H256::zero())?;
        state = post_state.clone_arc();
        blocks.push((block, post_state));
    }

    Ok(blocks)
}

/// Root of the block that `state` is the post-state of, possibly advanced through empty slots.
#[must_use]
pub fn latest_block_root<P: Preset>(state: &BeaconState<P>) -> H256 {
    let mut header = state.latest_block_header;

    if header.state_root.is_zero() {
        header.state_root = state.hash_tree_root();
    }

    header.hash_tree_root()
}

/// Data of an attestation made at `slot` by committee `committee_index`, voting for the block
/// `state` is the post-state of.
///
/// `state` must not be older than the epoch before the one containing `slot`.
pub fn attestation_data<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<AttestationData> {
    let beacon_block_root = latest_block_root(state);
    let target_epoch = misc::compute_epoch_at_slot::<P>(slot);
    let target_slot = misc::compute_start_slot_at_epoch::<P>(target_epoch);

    let target_root = if state.slot <= target_slot {
        beacon_block_root
    } else {
        accessors::get_block_root_at_slot(state, target_slot)?
    };

    Ok(AttestationData {
        slot,
        index: committee_index,
        beacon_block_root,
        source: state.current_justified_checkpoint,
        target: Checkpoint {
            epoch: target_epoch,
            root: target_root,
        },
    })
}

/// Builds an attestation with `data` signed by committee members at `positions`.
///
/// Committees are looked up in `state`, which must be in the epoch of the attestation target or
/// the one after it.
pub fn attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    data: AttestationData,
    positions: impl IntoIterator<Item = usize>,
) -> Result<Attestation<P>> {
    let committee = accessors::beacon_committee(state, data.slot, data.index)?;
    let mut aggregation_bits = BitList::with_length(committee.len())?;

    let signatures = positions.into_iter().map(|position| -> Result<_> {
        let validator_index = committee
            .get(position)
            .copied()
            .with_context(|| format!("position {position} is outside of committee"))?;

        ensure!(
            aggregation_bits.set(position, true),
            "position {position} is outside of aggregation bits",
        );

        Ok(data.sign(config, state, &interop::secret_key(validator_index)))
    });

    let signature = itertools::process_results(signatures, |signatures| {
        signatures.reduce(Signature::aggregate)
    })?
    .context("attestation must have at least one participant")?;

    Ok(Attestation {
        aggregation_bits,
        data,
        signature: signature.into(),
    })
}

/// Builds an attestation made by `validator_index` in `epoch` with only its bit set.
///
/// The attestation votes for the block `state` is the post-state of.
pub fn singular_attestation<P: Preset>(
    config: &Config,
    state: Arc<BeaconState<P>>,
    epoch: Epoch,
    validator_index: ValidatorIndex,
) -> Result<Attestation<P>> {
    let committee_state = state_in_epoch(state.clone_arc(), epoch)?;
    let committees_per_slot =
        accessors::get_committee_count_per_slot(&committee_state, RelativeEpoch::Current);

    for slot in misc::slots_in_epoch::<P>(epoch) {
        for committee_index in 0..committees_per_slot {
            let committee = accessors::beacon_committee(&committee_state, slot, committee_index)?;

            if let Some(position) = committee.iter().position(|index| *index == validator_index) {
                let data = attestation_data(&state, slot, committee_index)?;
                return attestation(config, &committee_state, data, [position]);
            }
        }
    }

    anyhow::bail!("validator {validator_index} is not in any committee in epoch {epoch}")
}

/// Committee positions that validators in `validator_indices` occupy in the committee that
/// attests at `slot`.
pub fn committee_positions<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
    validator_indices: impl IntoIterator<Item = ValidatorIndex>,
) -> Result<Vec<usize>> {
    let committee = accessors::beacon_committee(state, slot, committee_index)?;

    validator_indices
        .into_iter()
        .map(|validator_index| {
            committee
                .iter()
                .position(|index| *index == validator_index)
                .with_context(|| format!("validator {validator_index} is not in committee"))
        })
        .collect()
}

fn state_in_epoch<P: Preset>(
    mut state: Arc<BeaconState<P>>,
    epoch: Epoch,
) -> Result<Arc<BeaconState<P>>> {
    let start_slot = misc::compute_start_slot_at_epoch::<P>(epoch);

    if state.slot < start_slot {
        transition_functions::process_slots(state.make_mut(), start_slot)?;
    }

    ensure!(
        accessors::get_current_epoch(&state) == epoch,
        "state is past epoch {epoch}",
    );

    Ok(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use helper_functions::{predicates, verifier::SingleVerifier};
    use itertools::Itertools as _;
    use types::preset::Minimal;

    use super::*;

    #[test]
    fn min_genesis_state_fills_one_committee_per_slot() -> Result<()> {
        let (state, block) = min_genesis_state::<Minimal>(&Config::minimal())?;

        assert_eq!(state.validators.len(), 32);
        assert_eq!(
            accessors::get_committee_count_per_slot(&state, RelativeEpoch::Current),
            1,
        );
        assert_eq!(latest_block_root(&state), block.hash_tree_root());

        Ok(())
    }

    #[test]
    fn empty_chain_links_blocks_to_their_parents() -> Result<()> {
        let (genesis_state, genesis_block) = min_genesis_state::<Minimal>(&Config::minimal())?;
        let blocks = empty_chain(genesis_state, [1, 2, 5])?;

        let parent_roots = blocks.iter().map(|(block, _)| block.parent_root).collect_vec();
        let block_roots = core::iter::once(genesis_block.hash_tree_root())
            .chain(blocks.iter().map(|(block, _)| block.hash_tree_root()))
            .collect_vec();

        assert_eq!(parent_roots, block_roots[..3]);

        for (block, state) in &blocks {
            assert_eq!(block.state_root, state.hash_tree_root());
            assert_eq!(latest_block_root(state), block.hash_tree_root());
        }

        Ok(())
    }

    #[test]
    fn graffiti_distinguishes_sibling_blocks() -> Result<()> {
        let (genesis_state, _) = min_genesis_state::<Minimal>(&Config::minimal())?;

        let (block_a, _) = empty_block(genesis_state.clone_arc(), 1, H256::repeat_byte(1))?;
        let (block_b, _) = empty_block(genesis_state, 1, H256::repeat_byte(2))?;

        assert_eq!(block_a.parent_root, block_b.parent_root);
        assert_ne!(block_a.hash_tree_root(), block_b.hash_tree_root());

        Ok(())
    }

    #[test]
    fn singular_attestation_has_one_bit_and_valid_signature() -> Result<()> {
        let config = Config::minimal();
        let (genesis_state, genesis_block) = min_genesis_state::<Minimal>(&config)?;

        let attestation = singular_attestation(&config, genesis_state.clone_arc(), 0, 17)?;

        assert_eq!(attestation.aggregation_bits.count_ones(), 1);
        assert_eq!(
            attestation.data.beacon_block_root,
            genesis_block.hash_tree_root(),
        );
        assert_eq!(attestation.data.target.root, genesis_block.hash_tree_root());

        let indexed = accessors::get_indexed_attestation(&genesis_state, &attestation)?;

        assert_eq!(indexed.attesting_indices, [17]);

        predicates::validate_received_indexed_attestation(
            &config,
            &genesis_state,
            &indexed,
            SingleVerifier,
        )
    }

    #[test]
    fn attestation_aggregates_signatures_of_all_participants() -> Result<()> {
        let config = Config::minimal();
        let (genesis_state, _) = min_genesis_state::<Minimal>(&config)?;
        let data = attestation_data(&genesis_state, 3, 0)?;

        let attestation = attestation(&config, &genesis_state, data, [0, 2, 3])?;
        let indexed = accessors::get_indexed_attestation(&genesis_state, &attestation)?;

        assert_eq!(attestation.aggregation_bits.count_ones(), 3);
        assert_eq!(indexed.attesting_indices.len(), 3);

        predicates::validate_received_indexed_attestation(
            &config,
            &genesis_state,
            &indexed,
            SingleVerifier,
        )
    }

    #[test]
    fn committee_positions_cover_whole_committee() -> Result<()> {
        let (genesis_state, _) = min_genesis_state::<Minimal>(&Config::minimal())?;
        let committee = accessors::beacon_committee(&genesis_state, 4, 0)?;

        let positions = committee_positions(&genesis_state, 4, 0, committee.iter().copied())?;

        assert_eq!(
            positions.into_iter().collect::<HashSet<_>>(),
            (0..committee.len()).collect(),
        );

        Ok(())
    }

    #[test]
    fn attestation_rejects_position_outside_committee() -> Result<()> {
        let config = Config::minimal();
        let (genesis_state, _) = min_genesis_state::<Minimal>(&config)?;
        let data = attestation_data(&genesis_state, 0, 0)?;

        attestation(&config, &genesis_state, data, [4])
            .expect_err("committee in minimal genesis state has 4 members");

        Ok(())
    }
}
