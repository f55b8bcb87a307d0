use log::debug;
use types::{
    phase0::{
        containers::BeaconBlock,
        primitives::{Slot, H256},
    },
    preset::Preset,
};

use crate::unbounded_sink::UnboundedSink;

/// Published whenever the canonical head changes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct HeadEvent {
    pub block_root: H256,
    pub state_root: H256,
    pub slot: Slot,
}

impl HeadEvent {
    #[must_use]
    pub const fn new<P: Preset>(block_root: H256, block: &BeaconBlock<P>) -> Self {
        Self {
            block_root,
            state_root: block.state_root,
            slot: block.slot,
        }
    }

    pub fn send(self, tx: &impl UnboundedSink<Self>) {
        if tx.unbounded_send(self).is_err() {
            debug!("send to head event subscriber failed because the receiver was dropped");
        }
    }
}
