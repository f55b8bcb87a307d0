use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use derivative::Derivative;
use helper_functions::{accessors, misc, predicates, verifier::Verifier};
use im::Vector;
use log::debug;
use parking_lot::{Mutex, MutexGuard};
use std_ext::ArcExt as _;
use transition_functions::StateTransition;
use types::{
    config::Config as ChainConfig,
    nonstandard::LatestMessage,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, BeaconBlock, Checkpoint},
        primitives::{Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
    traits::SszHash as _,
};

use crate::{
    error::Error,
    lmd_ghost,
    store::{Store, StoreView},
    store_config::StoreConfig,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockOutcome {
    Imported { block_root: H256 },
    AlreadyKnown { block_root: H256 },
}

impl BlockOutcome {
    #[must_use]
    pub const fn block_root(self) -> H256 {
        match self {
            Self::Imported { block_root } | Self::AlreadyKnown { block_root } => block_root,
        }
    }
}

/// Fork choice store with a single writer and any number of lock-free readers.
///
/// Changes are made through a [`StoreTx`] and become visible to readers all at once when the
/// transaction is committed.
pub struct TransactionalStore<P: Preset, T> {
    committed: ArcSwap<Store<P>>,
    writer: Mutex<()>,
    transition: T,
}

impl<P: Preset, T: StateTransition<P>> TransactionalStore<P, T> {
    pub fn new(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        transition: T,
        anchor_block: Arc<BeaconBlock<P>>,
        anchor_state: Arc<BeaconState<P>>,
    ) -> anyhow::Result<Self> {
        let store = Store::new(chain_config, store_config, anchor_block, anchor_state)?;

        Ok(Self {
            committed: ArcSwap::from_pointee(store),
            writer: Mutex::new(()),
            transition,
        })
    }

    /// Latest committed store. Never blocks.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Store<P>> {
        self.committed.load_full()
    }

    /// Opens a transaction on top of the latest committed store.
    ///
    /// Blocks until any other open transaction is committed or dropped.
    pub fn new_tx(&self) -> StoreTx<'_, P, T> {
        let writer = self.writer.lock();
        let base = self.committed.load_full();

        StoreTx {
            store: self,
            writer,
            base,
            overlay: Overlay::default(),
        }
    }

    pub const fn transition(&self) -> &T {
        &self.transition
    }
}

#[derive(Derivative)]
#[derivative(Default(bound = ""))]
struct Overlay<P: Preset> {
    time: Option<UnixSeconds>,
    justified_checkpoint: Option<Checkpoint>,
    best_justified_checkpoint: Option<Checkpoint>,
    finalized_checkpoint: Option<Checkpoint>,
    blocks: HashMap<H256, Arc<BeaconBlock<P>>>,
    block_states: HashMap<H256, Arc<BeaconState<P>>>,
    checkpoint_states: HashMap<Checkpoint, Arc<BeaconState<P>>>,
    children: HashMap<H256, Vec<H256>>,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
    discard_base_latest_messages: bool,
}

/// Uncommitted changes layered over a committed [`Store`].
///
/// Reads see the changes made in the transaction. Nothing is visible outside of it until
/// [`StoreTx::commit`] is called. Dropping the transaction discards the changes.
pub struct StoreTx<'store, P: Preset, T> {
    store: &'store TransactionalStore<P, T>,
    writer: MutexGuard<'store, ()>,
    base: Arc<Store<P>>,
    overlay: Overlay<P>,
}

impl<P: Preset, T: StateTransition<P>> StoreTx<'_, P, T> {
    /// [`on_tick`](https://github.com/ethereum/consensus-specs/blob/v0.12.3/specs/phase0/fork-choice.md#on_tick)
    pub fn on_tick(&mut self, time: UnixSeconds) {
        if time <= self.time() {
            return;
        }

        let previous_slot = self.current_slot();

        self.overlay.time = Some(time);

        let current_slot = self.current_slot();

        // > Not a new epoch, return
        if current_slot <= previous_slot || !misc::is_epoch_start::<P>(current_slot) {
            return;
        }

        // > Update store.justified_checkpoint if a better checkpoint is known
        let best_justified_checkpoint = self.best_justified_checkpoint();

        if best_justified_checkpoint.epoch > self.justified_checkpoint().epoch {
            debug!(
                "promoting best justified checkpoint at slot {current_slot}: \
                 {best_justified_checkpoint:?}",
            );

            self.overlay.justified_checkpoint = Some(best_justified_checkpoint);
        }
    }

    /// [`on_block`](https://github.com/ethereum/consensus-specs/blob/v0.12.3/specs/phase0/fork-choice.md#on_block)
    pub fn on_block(&mut self, block: Arc<BeaconBlock<P>>) -> Result<BlockOutcome, Error> {
        let block_root = block.hash_tree_root();

        if self.contains_block(block_root) {
            return Ok(BlockOutcome::AlreadyKnown { block_root });
        }

        let parent_root = block.parent_root;

        let Some(parent_state) = self.state(parent_root).cloned() else {
            return Err(Error::NoParentBlock {
                block_root,
                parent_root,
            });
        };

        let current_slot = self.current_slot();

        // > Blocks cannot be in the future.
        if block.slot > current_slot {
            return Err(Error::BlockInFuture {
                block_slot: block.slot,
                current_slot,
            });
        }

        // > Check that block is later than the finalized epoch slot
        let finalized_checkpoint = self.finalized_checkpoint();
        let finalized_slot = self.finalized_slot();

        if block.slot <= finalized_slot {
            return Err(Error::BlockFinalized {
                block_slot: block.slot,
                finalized_slot,
            });
        }

        // > Check block is a descendant of the finalized block at the checkpoint finalized slot
        if lmd_ghost::ancestor(self, parent_root, finalized_slot)? != Some(finalized_checkpoint.root)
        {
            return Err(Error::BlockNotDescendantOfFinalized {
                block_root,
                finalized_root: finalized_checkpoint.root,
            });
        }

        let max_empty_slots = self.store_config().max_empty_slots;

        if parent_state.slot + max_empty_slots < block.slot {
            return Err(Error::TooManyEmptySlots {
                state_slot: parent_state.slot,
                max_empty_slots,
                slot: block.slot,
            });
        }

        // > Check the block is valid and compute the post-state
        let mut state = parent_state.as_ref().clone();

        self.store.transition.state_transition(&mut state, &block)?;

        let state_justified_checkpoint = state.current_justified_checkpoint;
        let state_finalized_checkpoint = state.finalized_checkpoint;

        // > Add new block to the store
        // > Add new state for this block to the store
        self.overlay.blocks.insert(block_root, block);
        self.overlay.block_states.insert(block_root, Arc::new(state));
        self.overlay
            .children
            .entry(parent_root)
            .or_default()
            .push(block_root);

        self.update_justified_checkpoint(state_justified_checkpoint)?;
        self.update_finalized_checkpoint(state_finalized_checkpoint, state_justified_checkpoint)?;

        Ok(BlockOutcome::Imported { block_root })
    }

    /// [`on_attestation`](https://github.com/ethereum/consensus-specs/blob/v0.12.3/specs/phase0/fork-choice.md#on_attestation)
    ///
    /// Returns the indices of validators whose votes were taken into account.
    pub fn on_attestation(
        &mut self,
        attestation: &Attestation<P>,
        verifier: impl Verifier,
    ) -> Result<Vec<ValidatorIndex>, Error> {
        let data = attestation.data;
        let target = data.target;
        let current_slot = self.current_slot();
        let current_epoch = self.current_epoch();

        // > Attestations must be from the current or previous epoch
        if target.epoch > current_epoch {
            return Err(Error::EarlyForkChoiceConsideration {
                attestation_slot: data.slot,
                current_slot,
            });
        }

        if target.epoch < self.previous_epoch() {
            return Err(Error::TargetEpochTooOld {
                target_epoch: target.epoch,
                current_epoch,
            });
        }

        if target.epoch != misc::compute_epoch_at_slot::<P>(data.slot) {
            return Err(Error::TargetEpochMismatch {
                target_epoch: target.epoch,
                attestation_slot: data.slot,
            });
        }

        // > Attestations target be for a known block.
        let Some(target_state) = self.state(target.root).cloned() else {
            return Err(Error::UnknownTargetRoot {
                target_root: target.root,
            });
        };

        // > Attestations cannot be from future epochs.
        let target_slot = misc::compute_start_slot_at_epoch::<P>(target.epoch);

        if current_slot < target_slot {
            return Err(Error::EarlyForkChoiceConsideration {
                attestation_slot: data.slot,
                current_slot,
            });
        }

        // > Attestations must be for a known block.
        let Some(block) = self.block(data.beacon_block_root) else {
            return Err(Error::UnknownBlockRoot {
                block_root: data.beacon_block_root,
            });
        };

        // > Attestations must not be for blocks in the future.
        if block.slot > data.slot {
            return Err(Error::BlockAfterAttestation {
                block_slot: block.slot,
                attestation_slot: data.slot,
            });
        }

        let block_epoch = misc::compute_epoch_at_slot::<P>(block.slot);

        if block_epoch > target.epoch {
            return Err(Error::BlockEpochAfterTarget {
                block_epoch,
                target_epoch: target.epoch,
            });
        }

        // > LMD vote must be consistent with FFG vote target
        if lmd_ghost::ancestor(self, data.beacon_block_root, target_slot)? != Some(target.root) {
            return Err(Error::LmdGhostInconsistentWithFfgTarget {
                beacon_block_root: data.beacon_block_root,
                target_root: target.root,
            });
        }

        // > Store target checkpoint state if not yet seen
        let checkpoint_state = self.checkpoint_state_for(target, target_state, target_slot)?;

        // > Attestations can only affect the fork choice of subsequent slots.
        if current_slot < data.slot + 1 {
            return Err(Error::EarlyForkChoiceConsideration {
                attestation_slot: data.slot,
                current_slot,
            });
        }

        // > Get state at the `target` to fully validate attestation
        let indexed_attestation = accessors::get_indexed_attestation(&checkpoint_state, attestation)
            .map_err(|source| Error::InvalidAttestation {
                attestation_slot: data.slot,
                source,
            })?;

        predicates::validate_received_indexed_attestation(
            self.chain_config(),
            &checkpoint_state,
            &indexed_attestation,
            verifier,
        )
        .map_err(|source| Error::InvalidAttestation {
            attestation_slot: data.slot,
            source,
        })?;

        // > Update latest messages for attesting indices
        let message = LatestMessage {
            epoch: target.epoch,
            root: data.beacon_block_root,
        };

        for validator_index in indexed_attestation.attesting_indices.iter().copied() {
            self.merge_latest_message(validator_index, message);
        }

        Ok(indexed_attestation.attesting_indices)
    }

    /// Forgets every latest message, including those merged earlier in the transaction.
    ///
    /// Used when the justified checkpoint advances and votes cast before it no longer count.
    pub fn discard_latest_messages(&mut self) {
        self.overlay.latest_messages.clear();
        self.overlay.discard_base_latest_messages = true;
    }

    /// Publishes the changes made in the transaction.
    pub fn commit(self) {
        let Self {
            store,
            writer,
            base,
            overlay,
        } = self;

        let mut next = Store::clone(&base);

        if let Some(time) = overlay.time {
            next.time = time;
        }

        if let Some(checkpoint) = overlay.justified_checkpoint {
            next.justified_checkpoint = checkpoint;
        }

        if let Some(checkpoint) = overlay.best_justified_checkpoint {
            next.best_justified_checkpoint = checkpoint;
        }

        if let Some(checkpoint) = overlay.finalized_checkpoint {
            next.finalized_checkpoint = checkpoint;
        }

        next.blocks.extend(overlay.blocks);
        next.block_states.extend(overlay.block_states);
        next.checkpoint_states.extend(overlay.checkpoint_states);

        for (parent_root, children) in overlay.children {
            next.children
                .entry(parent_root)
                .or_insert_with(Vector::new)
                .extend(children);
        }

        if overlay.discard_base_latest_messages {
            next.latest_messages.clear();
        }

        // Overlay messages were already checked against the base ones.
        next.latest_messages.extend(overlay.latest_messages);

        store.committed.store(Arc::new(next));

        drop(writer);
    }

    fn merge_latest_message(&mut self, validator_index: ValidatorIndex, message: LatestMessage) {
        let replaces = self
            .latest_message(validator_index)
            .is_none_or(|current| message.epoch > current.epoch);

        if replaces {
            self.overlay.latest_messages.insert(validator_index, message);
        }
    }

    fn checkpoint_state_for(
        &mut self,
        target: Checkpoint,
        target_state: Arc<BeaconState<P>>,
        target_slot: Slot,
    ) -> Result<Arc<BeaconState<P>>, Error> {
        if let Some(state) = self.checkpoint_state(target) {
            return Ok(state.clone_arc());
        }

        let mut state = target_state;

        if state.slot < target_slot {
            let max_empty_slots = self.store_config().max_empty_slots;

            if state.slot + max_empty_slots < target_slot {
                return Err(Error::TooManyEmptySlots {
                    state_slot: state.slot,
                    max_empty_slots,
                    slot: target_slot,
                });
            }

            self.store
                .transition
                .process_slots(state.make_mut(), target_slot)?;
        }

        self.overlay
            .checkpoint_states
            .insert(target, state.clone_arc());

        Ok(state)
    }

    fn update_justified_checkpoint(&mut self, candidate: Checkpoint) -> Result<(), Error> {
        if candidate.epoch <= self.justified_checkpoint().epoch {
            return Ok(());
        }

        if candidate.epoch > self.best_justified_checkpoint().epoch {
            self.overlay.best_justified_checkpoint = Some(candidate);
        }

        if self.should_update_justified_checkpoint(candidate)? {
            debug!("justified checkpoint updated to {candidate:?}");
            self.overlay.justified_checkpoint = Some(candidate);
        }

        Ok(())
    }

    fn update_finalized_checkpoint(
        &mut self,
        candidate: Checkpoint,
        state_justified_checkpoint: Checkpoint,
    ) -> Result<(), Error> {
        if candidate.epoch <= self.finalized_checkpoint().epoch {
            return Ok(());
        }

        debug!("finalized checkpoint updated to {candidate:?}");

        self.overlay.finalized_checkpoint = Some(candidate);

        let justified_checkpoint = self.justified_checkpoint();

        if justified_checkpoint == state_justified_checkpoint {
            return Ok(());
        }

        // > Update justified if new justified is later than store justified
        if state_justified_checkpoint.epoch > justified_checkpoint.epoch {
            self.overlay.justified_checkpoint = Some(state_justified_checkpoint);
            return Ok(());
        }

        // > Update justified if store justified is not in chain with finalized checkpoint
        let finalized_slot = self.finalized_slot();

        if lmd_ghost::ancestor(self, justified_checkpoint.root, finalized_slot)?
            != Some(candidate.root)
        {
            self.overlay.justified_checkpoint = Some(state_justified_checkpoint);
        }

        Ok(())
    }

    /// [`should_update_justified_checkpoint`](https://github.com/ethereum/consensus-specs/blob/v0.12.3/specs/phase0/fork-choice.md#should_update_justified_checkpoint)
    ///
    /// Prevents bouncing attacks by only updating late in an epoch if the new checkpoint is a
    /// descendant of the current one.
    fn should_update_justified_checkpoint(&self, candidate: Checkpoint) -> Result<bool, Error> {
        if misc::slots_since_epoch_start::<P>(self.current_slot())
            < P::SAFE_SLOTS_TO_UPDATE_JUSTIFIED
        {
            return Ok(true);
        }

        let justified_checkpoint = self.justified_checkpoint();
        let justified_slot = misc::compute_start_slot_at_epoch::<P>(justified_checkpoint.epoch);

        Ok(lmd_ghost::ancestor(self, candidate.root, justified_slot)?
            == Some(justified_checkpoint.root))
    }
}

impl<P: Preset, T> StoreView<P> for StoreTx<'_, P, T> {
    fn chain_config(&self) -> &ChainConfig {
        self.base.chain_config()
    }

    fn store_config(&self) -> StoreConfig {
        self.base.store_config()
    }

    fn genesis_time(&self) -> UnixSeconds {
        self.base.genesis_time()
    }

    fn time(&self) -> UnixSeconds {
        self.overlay.time.unwrap_or_else(|| self.base.time())
    }

    fn anchor_root(&self) -> H256 {
        self.base.anchor_root()
    }

    fn justified_checkpoint(&self) -> Checkpoint {
        self.overlay
            .justified_checkpoint
            .unwrap_or_else(|| self.base.justified_checkpoint())
    }

    fn best_justified_checkpoint(&self) -> Checkpoint {
        self.overlay
            .best_justified_checkpoint
            .unwrap_or_else(|| self.base.best_justified_checkpoint())
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.overlay
            .finalized_checkpoint
            .unwrap_or_else(|| self.base.finalized_checkpoint())
    }

    fn block(&self, block_root: H256) -> Option<&Arc<BeaconBlock<P>>> {
        self.overlay
            .blocks
            .get(&block_root)
            .or_else(|| self.base.block(block_root))
    }

    fn state(&self, block_root: H256) -> Option<&Arc<BeaconState<P>>> {
        self.overlay
            .block_states
            .get(&block_root)
            .or_else(|| self.base.state(block_root))
    }

    fn checkpoint_state(&self, checkpoint: Checkpoint) -> Option<&Arc<BeaconState<P>>> {
        self.overlay
            .checkpoint_states
            .get(&checkpoint)
            .or_else(|| self.base.checkpoint_state(checkpoint))
    }

    fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        let overlaid = self.overlay.latest_messages.get(&validator_index).copied();

        if self.overlay.discard_base_latest_messages {
            return overlaid;
        }

        overlaid.or_else(|| self.base.latest_message(validator_index))
    }

    fn children(&self, block_root: H256) -> Vec<H256> {
        let mut children = self.base.children(block_root);

        if let Some(added) = self.overlay.children.get(&block_root) {
            children.extend(added);
        }

        children
    }
}
