use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use derivative::Derivative;
use types::{
    nonstandard::ReceivedAttestation,
    phase0::{
        containers::BeaconBlock,
        primitives::{Slot, H256},
    },
    preset::Preset,
};

#[derive(Clone, Debug)]
pub struct PendingBlock<P: Preset> {
    pub block: Arc<BeaconBlock<P>>,
    /// Whether the block has already been delayed once.
    pub retried: bool,
}

impl<P: Preset> PendingBlock<P> {
    #[must_use]
    pub const fn new(block: Arc<BeaconBlock<P>>) -> Self {
        Self {
            block,
            retried: false,
        }
    }

    #[must_use]
    pub fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

pub type PendingAttestation<P> = Arc<ReceivedAttestation<P>>;

/// Objects that arrived too early to be applied to the store.
///
/// The queues are unbounded and entries never expire. An entry is removed exactly when it is
/// taken to be retried.
#[derive(Derivative)]
#[derivative(Default(bound = ""))]
pub struct DelayedQueues<P: Preset> {
    blocks_until_slot: BTreeMap<Slot, Vec<PendingBlock<P>>>,
    blocks_until_parent: HashMap<H256, Vec<PendingBlock<P>>>,
    attestations_until_tick: Vec<PendingAttestation<P>>,
    attestations_until_block: HashMap<H256, Vec<PendingAttestation<P>>>,
}

impl<P: Preset> DelayedQueues<P> {
    pub fn delay_block_until_slot(&mut self, pending_block: PendingBlock<P>) {
        self.blocks_until_slot
            .entry(pending_block.block.slot)
            .or_default()
            .push(pending_block);
    }

    pub fn delay_block_until_parent(&mut self, pending_block: PendingBlock<P>) {
        self.blocks_until_parent
            .entry(pending_block.block.parent_root)
            .or_default()
            .push(pending_block);
    }

    pub fn delay_attestation_until_tick(&mut self, attestation: PendingAttestation<P>) {
        self.attestations_until_tick.push(attestation);
    }

    pub fn delay_attestation_until_block(
        &mut self,
        block_root: H256,
        attestation: PendingAttestation<P>,
    ) {
        self.attestations_until_block
            .entry(block_root)
            .or_default()
            .push(attestation);
    }

    /// Removes blocks from slots up to and including `slot`, oldest slot first.
    pub fn take_blocks_until_slot(&mut self, slot: Slot) -> impl Iterator<Item = PendingBlock<P>> {
        match slot.checked_add(1) {
            Some(next_slot) => {
                let later = self.blocks_until_slot.split_off(&next_slot);
                core::mem::replace(&mut self.blocks_until_slot, later)
            }
            None => core::mem::take(&mut self.blocks_until_slot),
        }
        .into_values()
        .flatten()
    }

    pub fn take_blocks_until_parent(&mut self, parent_root: H256) -> Vec<PendingBlock<P>> {
        self.blocks_until_parent
            .remove(&parent_root)
            .unwrap_or_default()
    }

    pub fn take_attestations_until_tick(&mut self) -> Vec<PendingAttestation<P>> {
        core::mem::take(&mut self.attestations_until_tick)
    }

    pub fn take_attestations_until_block(&mut self, block_root: H256) -> Vec<PendingAttestation<P>> {
        self.attestations_until_block
            .remove(&block_root)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks_until_slot.values().map(Vec::len).sum::<usize>()
            + self.blocks_until_parent.values().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn attestation_count(&self) -> usize {
        self.attestations_until_tick.len()
            + self
                .attestations_until_block
                .values()
                .map(Vec::len)
                .sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block_count() == 0 && self.attestation_count() == 0
    }
}
