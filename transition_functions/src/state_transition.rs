use types::{
    phase0::{beacon_state::BeaconState, containers::BeaconBlock, primitives::Slot},
    preset::Preset,
    traits::SszHash as _,
};

use crate::{block_processing, error::Error, slot_processing};

/// State transition capability consumed by fork choice.
///
/// Implementations must be deterministic. Fork choice calls them on clones of stored states.
pub trait StateTransition<P: Preset>: Send + Sync + 'static {
    fn process_slots(&self, state: &mut BeaconState<P>, slot: Slot) -> Result<(), Error>;

    fn state_transition(
        &self,
        state: &mut BeaconState<P>,
        block: &BeaconBlock<P>,
    ) -> Result<(), Error>;
}

/// Phase 0 slot and block header processing with state root verification.
#[derive(Clone, Copy, Default, Debug)]
pub struct Phase0;

impl<P: Preset> StateTransition<P> for Phase0 {
    fn process_slots(&self, state: &mut BeaconState<P>, slot: Slot) -> Result<(), Error> {
        slot_processing::process_slots(state, slot)
    }

    fn state_transition(
        &self,
        state: &mut BeaconState<P>,
        block: &BeaconBlock<P>,
    ) -> Result<(), Error> {
        state_transition(
            state,
            block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Verify,
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ProcessSlots {
    Always,
    IfNeeded,
    Never,
}

impl ProcessSlots {
    #[must_use]
    pub fn should_process<P: Preset>(self, state: &BeaconState<P>, block: &BeaconBlock<P>) -> bool {
        match self {
            Self::Always => true,
            // The test for equality is intentional. It ensures that blocks attempting to "rewind"
            // the state are rejected early by `slot_processing::process_slots`.
            Self::IfNeeded => state.slot != block.slot,
            Self::Never => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum StateRootPolicy {
    Verify,
    /// Used when building blocks, before the state root in the block is known.
    Trust,
}

impl StateRootPolicy {
    pub fn verify<P: Preset>(
        self,
        state: &BeaconState<P>,
        block: &BeaconBlock<P>,
    ) -> Result<(), Error> {
        match self {
            Self::Verify => {
                let computed = state.hash_tree_root();
                let in_block = block.state_root;

                if computed != in_block {
                    return Err(Error::StateRootMismatch { computed, in_block });
                }
            }
            Self::Trust => {}
        }

        Ok(())
    }
}

pub fn state_transition<P: Preset>(
    state: &mut BeaconState<P>,
    block: &BeaconBlock<P>,
    process_slots: ProcessSlots,
    state_root_policy: StateRootPolicy,
) -> Result<(), Error> {
    // > Process slots (including those with no blocks) since block
    if process_slots.should_process(state, block) {
        slot_processing::process_slots(state, block.slot)?;
    }

    // > Process block
    block_processing::process_block_header(state, block)?;

    // > Verify state root
    state_root_policy.verify(state, block)
}
