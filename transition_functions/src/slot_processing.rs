use typenum::Unsigned as _;
use types::{
    phase0::{beacon_state::BeaconState, primitives::Slot},
    preset::Preset,
    traits::SszHash as _,
};

use crate::error::Error;

pub fn process_slots<P: Preset>(state: &mut BeaconState<P>, slot: Slot) -> Result<(), Error> {
    if state.slot >= slot {
        return Err(Error::SlotNotLater {
            current: state.slot,
            target: slot,
        });
    }

    while state.slot < slot {
        process_slot(state);

        // Epoch processing would run here when `state.slot + 1` starts an epoch.

        state.slot += 1;
    }

    Ok(())
}

pub fn process_slot<P: Preset>(state: &mut BeaconState<P>) {
    let index = usize::try_from(state.slot % P::SlotsPerHistoricalRoot::U64)
        .expect("remainder of division by vector length fits in usize");

    // > Cache state root
    let previous_state_root = state.hash_tree_root();
    state.state_roots.set(index, previous_state_root);

    // > Cache latest block header state root
    if state.latest_block_header.state_root.is_zero() {
        state.latest_block_header.state_root = previous_state_root;
    }

    // > Cache block root
    let previous_block_root = state.latest_block_header.hash_tree_root();
    state.block_roots.set(index, previous_block_root);
}
