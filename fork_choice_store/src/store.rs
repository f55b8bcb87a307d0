use std::sync::Arc;

use anyhow::{ensure, Result};
use helper_functions::misc;
use im::{HashMap, Vector};
use std_ext::ArcExt as _;
use types::{
    config::Config as ChainConfig,
    nonstandard::LatestMessage,
    phase0::{
        beacon_state::BeaconState,
        consts::{GENESIS_EPOCH, GENESIS_SLOT},
        containers::{BeaconBlock, Checkpoint},
        primitives::{Epoch, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
    traits::SszHash as _,
};

use crate::{error::Error, latest_messages::LatestMessages, store_config::StoreConfig};

/// Read access to a fork choice store.
///
/// Implemented by the committed [`Store`] and by [`StoreTx`], which layers uncommitted changes on
/// top of a [`Store`]. Fork choice logic is written against this trait so that it sees the same
/// data regardless of which of the two it runs on.
///
/// [`StoreTx`]: crate::StoreTx
pub trait StoreView<P: Preset> {
    fn chain_config(&self) -> &ChainConfig;

    fn store_config(&self) -> StoreConfig;

    fn genesis_time(&self) -> UnixSeconds;

    fn time(&self) -> UnixSeconds;

    fn anchor_root(&self) -> H256;

    fn justified_checkpoint(&self) -> Checkpoint;

    fn best_justified_checkpoint(&self) -> Checkpoint;

    fn finalized_checkpoint(&self) -> Checkpoint;

    fn block(&self, block_root: H256) -> Option<&Arc<BeaconBlock<P>>>;

    /// Post-state of the block with root `block_root`.
    fn state(&self, block_root: H256) -> Option<&Arc<BeaconState<P>>>;

    fn checkpoint_state(&self, checkpoint: Checkpoint) -> Option<&Arc<BeaconState<P>>>;

    fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage>;

    /// Roots of known blocks whose parent is `block_root`, in no particular order.
    fn children(&self, block_root: H256) -> Vec<H256>;

    fn current_slot(&self) -> Slot {
        let elapsed = self.time().saturating_sub(self.genesis_time());
        GENESIS_SLOT + elapsed / self.chain_config().seconds_per_slot
    }

    fn current_epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.current_slot())
    }

    fn previous_epoch(&self) -> Epoch {
        self.current_epoch().saturating_sub(1).max(GENESIS_EPOCH)
    }

    fn finalized_slot(&self) -> Slot {
        misc::compute_start_slot_at_epoch::<P>(self.finalized_checkpoint().epoch)
    }

    fn contains_block(&self, block_root: H256) -> bool {
        self.block(block_root).is_some()
    }
}

/// [`Store`] from the Fork Choice specification.
///
/// All collections are persistent, so cloning a `Store` to apply a transaction to it is cheap.
///
/// [`Store`]: https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#store
#[derive(Clone, Debug)]
pub struct Store<P: Preset> {
    pub(crate) chain_config: Arc<ChainConfig>,
    pub(crate) store_config: StoreConfig,
    pub(crate) genesis_time: UnixSeconds,
    pub(crate) time: UnixSeconds,
    pub(crate) anchor_root: H256,
    pub(crate) justified_checkpoint: Checkpoint,
    pub(crate) best_justified_checkpoint: Checkpoint,
    pub(crate) finalized_checkpoint: Checkpoint,
    pub(crate) blocks: HashMap<H256, Arc<BeaconBlock<P>>>,
    pub(crate) block_states: HashMap<H256, Arc<BeaconState<P>>>,
    pub(crate) checkpoint_states: HashMap<Checkpoint, Arc<BeaconState<P>>>,
    pub(crate) children: HashMap<H256, Vector<H256>>,
    pub(crate) latest_messages: LatestMessages,
}

impl<P: Preset> Store<P> {
    /// [`get_forkchoice_store`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#get_forkchoice_store)
    pub fn new(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        anchor_block: Arc<BeaconBlock<P>>,
        anchor_state: Arc<BeaconState<P>>,
    ) -> Result<Self> {
        let anchor_root = anchor_block.hash_tree_root();
        let state_root = anchor_state.hash_tree_root();

        ensure!(
            anchor_block.state_root == state_root,
            Error::AnchorStateRootMismatch {
                block_state_root: anchor_block.state_root,
                state_root,
            },
        );

        // Note that if `anchor_state` is the genesis state, this checkpoint will not be equal to
        // any checkpoints in it, because all checkpoints in a genesis state have their `root` set
        // to 0x00…00.
        let checkpoint = Checkpoint {
            epoch: misc::compute_epoch_at_slot::<P>(anchor_state.slot),
            root: anchor_root,
        };

        let genesis_time = anchor_state.genesis_time;
        let time = genesis_time + anchor_state.slot * chain_config.seconds_per_slot.get();

        Ok(Self {
            chain_config,
            store_config,
            genesis_time,
            time,
            anchor_root,
            justified_checkpoint: checkpoint,
            best_justified_checkpoint: checkpoint,
            finalized_checkpoint: checkpoint,
            blocks: HashMap::unit(anchor_root, anchor_block),
            block_states: HashMap::unit(anchor_root, anchor_state.clone_arc()),
            checkpoint_states: HashMap::unit(checkpoint, anchor_state),
            children: HashMap::new(),
            latest_messages: LatestMessages::default(),
        })
    }

    #[must_use]
    pub const fn latest_messages(&self) -> &LatestMessages {
        &self.latest_messages
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

impl<P: Preset> StoreView<P> for Store<P> {
    fn chain_config(&self) -> &ChainConfig {
        &self.chain_config
    }

    fn store_config(&self) -> StoreConfig {
        self.store_config
    }

    fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    fn time(&self) -> UnixSeconds {
        self.time
    }

    fn anchor_root(&self) -> H256 {
        self.anchor_root
    }

    fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    fn best_justified_checkpoint(&self) -> Checkpoint {
        self.best_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    fn block(&self, block_root: H256) -> Option<&Arc<BeaconBlock<P>>> {
        self.blocks.get(&block_root)
    }

    fn state(&self, block_root: H256) -> Option<&Arc<BeaconState<P>>> {
        self.block_states.get(&block_root)
    }

    fn checkpoint_state(&self, checkpoint: Checkpoint) -> Option<&Arc<BeaconState<P>>> {
        self.checkpoint_states.get(&checkpoint)
    }

    fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.latest_messages.get(validator_index)
    }

    fn children(&self, block_root: H256) -> Vec<H256> {
        self.children
            .get(&block_root)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default()
    }
}
