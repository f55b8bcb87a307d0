use anyhow::Result;
use fork_choice_store::{LatestMessages, StoreView};
use helper_functions::misc;
use log::debug;
use types::{
    nonstandard::LatestMessage,
    phase0::{
        containers::{BeaconBlock, Checkpoint},
        primitives::{ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{events::HeadEvent, unbounded_sink::UnboundedSink};

/// Owns the latest message cache and the cached head.
///
/// The cache is separate from the latest messages kept in the store. It is cleared whenever the
/// justified checkpoint advances, so only votes seen since the last justification influence the
/// head.
pub struct ForkChoiceProcessor<S> {
    justified_checkpoint: Checkpoint,
    latest_messages: LatestMessages,
    head: Option<H256>,
    head_tx: S,
}

impl<S: UnboundedSink<HeadEvent>> ForkChoiceProcessor<S> {
    #[must_use]
    pub fn new(head_tx: S) -> Self {
        Self {
            justified_checkpoint: Checkpoint::EMPTY,
            latest_messages: LatestMessages::default(),
            head: None,
            head_tx,
        }
    }

    #[must_use]
    pub const fn head(&self) -> Option<H256> {
        self.head
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    #[must_use]
    pub const fn latest_messages(&self) -> &LatestMessages {
        &self.latest_messages
    }

    pub fn on_attestation<P: Preset>(
        &mut self,
        store: &impl StoreView<P>,
        attesting_indices: &[ValidatorIndex],
        message: LatestMessage,
    ) -> Result<()> {
        self.record_votes(attesting_indices, message);
        self.update_head(store)
    }

    /// Merges votes into the cache without recomputing the head.
    ///
    /// Used to apply a burst of attestations before a single call to [`Self::update_head`].
    pub fn record_votes(&mut self, attesting_indices: &[ValidatorIndex], message: LatestMessage) {
        for validator_index in attesting_indices.iter().copied() {
            self.latest_messages.merge(validator_index, message);
        }
    }

    pub fn on_justified_checkpoint<P: Preset>(
        &mut self,
        store: &impl StoreView<P>,
        checkpoint: Checkpoint,
    ) -> Result<()> {
        if checkpoint.epoch <= self.justified_checkpoint.epoch {
            return Ok(());
        }

        debug!(
            "justified checkpoint advanced from {:?} to {checkpoint:?}, \
             dropping {} cached latest messages",
            self.justified_checkpoint,
            self.latest_messages.len(),
        );

        self.justified_checkpoint = checkpoint;
        self.latest_messages.clear();
        self.update_head(store)
    }

    /// Folds votes contained in `block` into the cache if the block passes
    /// [`Self::is_justified_ancestor`]. Returns whether the votes were folded.
    ///
    /// Does not recompute the head.
    pub fn on_block<P: Preset>(
        &mut self,
        store: &impl StoreView<P>,
        block: &BeaconBlock<P>,
        attestations: impl IntoIterator<Item = (Vec<ValidatorIndex>, LatestMessage)>,
    ) -> bool {
        if !self.is_justified_ancestor(store, block) {
            debug!(
                "ignoring attestations in block at slot {} because it does not pass the \
                 justified ancestor check (justified checkpoint: {:?})",
                block.slot, self.justified_checkpoint,
            );

            return false;
        }

        for (attesting_indices, message) in attestations {
            self.record_votes(&attesting_indices, message);
        }

        true
    }

    /// Recomputes the head and publishes a [`HeadEvent`] if it changed.
    pub fn update_head<P: Preset>(&mut self, store: &impl StoreView<P>) -> Result<()> {
        let head = fork_choice_store::get_head(store, &self.latest_messages)?;

        if self.head == Some(head) {
            return Ok(());
        }

        let block = store
            .block(head)
            .expect("get_head only returns roots of blocks in the store");

        debug!("head changed to {head:?} at slot {}", block.slot);

        self.head = Some(head);

        HeadEvent::new(head, block).send(&self.head_tx);

        Ok(())
    }

    // The walk compares the justified root against the grandparent of each block visited rather
    // than the parent. A direct child of the justified block is therefore only accepted through one
    // of its descendants.
    fn is_justified_ancestor<P: Preset>(
        &self,
        store: &impl StoreView<P>,
        block: &BeaconBlock<P>,
    ) -> bool {
        let justified_checkpoint = self.justified_checkpoint;

        if justified_checkpoint.is_empty() && block.slot == 0 {
            return true;
        }

        let mut ancestor = block;

        while misc::compute_epoch_at_slot::<P>(ancestor.slot) >= justified_checkpoint.epoch {
            let Some(parent) = store.block(ancestor.parent_root) else {
                return false;
            };

            if parent.parent_root == justified_checkpoint.root {
                return true;
            }

            ancestor = parent;
        }

        false
    }
}
