use helper_functions::accessors;
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlock, BeaconBlockHeader},
        primitives::H256,
    },
    preset::Preset,
    traits::SszHash as _,
};

use crate::error::Error;

pub fn process_block_header<P: Preset>(
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
) -> Result<(), Error> {
    // > Verify that the slots match
    if block.slot != state.slot {
        return Err(Error::SlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        });
    }

    // > Verify that the block is newer than latest block header
    if block.slot <= state.latest_block_header.slot {
        return Err(Error::BlockNotNewerThanLatestBlockHeader {
            block_slot: block.slot,
            block_header_slot: state.latest_block_header.slot,
        });
    }

    // > Verify that proposer index is the correct index
    let computed = accessors::get_beacon_proposer_index(state)?;

    if block.proposer_index != computed {
        return Err(Error::ProposerIndexMismatch {
            computed,
            in_block: block.proposer_index,
        });
    }

    // > Verify that the parent matches
    let computed = state.latest_block_header.hash_tree_root();

    if block.parent_root != computed {
        return Err(Error::ParentRootMismatch {
            computed,
            in_block: block.parent_root,
        });
    }

    // > Cache current block as the new latest block
    state.latest_block_header = BeaconBlockHeader {
        // > Overwritten in the next process_slot call
        state_root: H256::zero(),
        ..block.to_header()
    };

    // > Verify proposer is not slashed
    let proposer_slashed = usize::try_from(block.proposer_index)
        .ok()
        .and_then(|index| state.validators.get(index))
        .is_some_and(|proposer| proposer.slashed);

    if proposer_slashed {
        return Err(Error::ProposerSlashed {
            index: block.proposer_index,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;
    use types::{config::Config, preset::Minimal};

    use crate::slot_processing;

    use super::*;

    fn state_and_block_at_slot_1() -> Result<(BeaconState<Minimal>, BeaconBlock<Minimal>), Error> {
        let mut state = interop::quick_start_beacon_state(&Config::minimal(), 0, nonzero!(8_u64));

        slot_processing::process_slots(&mut state, 1)?;

        let block = BeaconBlock {
            slot: 1,
            proposer_index: accessors::get_beacon_proposer_index(&state)?,
            parent_root: state.latest_block_header.hash_tree_root(),
            ..BeaconBlock::default()
        };

        Ok((state, block))
    }

    #[test]
    fn valid_header_becomes_latest_block_header() -> Result<(), Error> {
        let (mut state, block) = state_and_block_at_slot_1()?;

        process_block_header(&mut state, &block)?;

        assert_eq!(state.latest_block_header.slot, 1);
        assert_eq!(state.latest_block_header.parent_root, block.parent_root);
        assert!(state.latest_block_header.state_root.is_zero());

        Ok(())
    }

    #[test]
    fn header_with_wrong_parent_is_rejected() -> Result<(), Error> {
        let (mut state, mut block) = state_and_block_at_slot_1()?;

        block.parent_root = H256::repeat_byte(1);

        assert!(matches!(
            process_block_header(&mut state, &block),
            Err(Error::ParentRootMismatch { .. }),
        ));

        Ok(())
    }

    #[test]
    fn header_with_wrong_proposer_is_rejected() -> Result<(), Error> {
        let (mut state, mut block) = state_and_block_at_slot_1()?;

        block.proposer_index = (block.proposer_index + 1) % 8;

        assert!(matches!(
            process_block_header(&mut state, &block),
            Err(Error::ProposerIndexMismatch { .. }),
        ));

        Ok(())
    }

    #[test]
    fn header_with_wrong_slot_is_rejected() -> Result<(), Error> {
        let (mut state, mut block) = state_and_block_at_slot_1()?;

        block.slot = 2;

        assert!(matches!(
            process_block_header(&mut state, &block),
            Err(Error::SlotMismatch {
                state_slot: 1,
                block_slot: 2,
            }),
        ));

        Ok(())
    }
}
