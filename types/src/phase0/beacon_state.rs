use core::marker::PhantomData;

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::{
    phase0::{
        containers::{BeaconBlockHeader, Checkpoint, Fork, Validator},
        primitives::{Gwei, Slot, UnixSeconds, H256},
    },
    preset::Preset,
};

/// Phase 0 beacon state without the fields used only by epoch processing and block operations.
///
/// Lists and vectors are persistent so that cloning a state to advance it through empty slots
/// does not copy the validator registry.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(bound = "", deny_unknown_fields)]
pub struct BeaconState<P: Preset> {
    // > Versioning
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: H256,
    pub slot: Slot,
    pub fork: Fork,

    // > History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: Vector<H256>,
    pub state_roots: Vector<H256>,

    // > Registry
    pub validators: Vector<Validator>,
    pub balances: Vector<Gwei>,

    // > Randomness
    pub randao_mixes: Vector<H256>,

    // > Finality
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    #[serde(skip)]
    pub phantom: PhantomData<P>,
}
