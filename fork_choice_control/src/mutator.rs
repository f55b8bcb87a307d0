// The mutator is the only writer of the fork choice store. Every change is made inside a
// `StoreTx` that is committed before any other component is notified, so snapshots taken by
// readers are always consistent.
//
// Objects that cannot be applied yet are kept in `DelayedQueues` and retried inline. Retries are
// processed before the next message is received, which keeps the order of operations within a
// single message deterministic.

use std::{
    collections::VecDeque,
    sync::{mpsc::Receiver, Arc},
};

use anyhow::Result;
use fork_choice_store::{BlockOutcome, Error, StoreView as _, TransactionalStore};
use helper_functions::{accessors, verifier::NullVerifier};
use itertools::Itertools as _;
use log::{debug, warn};
use std_ext::ArcExt as _;
use transition_functions::StateTransition;
use types::{
    nonstandard::LatestMessage,
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlock, Checkpoint},
        primitives::{UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{
    delayed::{DelayedQueues, PendingAttestation, PendingBlock},
    events::HeadEvent,
    messages::{AttestationVerifierMessage, MutatorMessage},
    processor::ForkChoiceProcessor,
    unbounded_sink::UnboundedSink,
};

pub struct Mutator<P: Preset, T, W, H, V> {
    store: Arc<TransactionalStore<P, T>>,
    processor: ForkChoiceProcessor<H>,
    delayed: DelayedQueues<P>,
    mutator_rx: Receiver<MutatorMessage<P, W>>,
    verifier_tx: V,
}

impl<P, T, W, H, V> Mutator<P, T, W, H, V>
where
    P: Preset,
    T: StateTransition<P>,
    H: UnboundedSink<HeadEvent>,
    V: UnboundedSink<AttestationVerifierMessage>,
{
    pub fn new(
        store: Arc<TransactionalStore<P, T>>,
        mutator_rx: Receiver<MutatorMessage<P, W>>,
        head_tx: H,
        verifier_tx: V,
    ) -> Self {
        Self {
            store,
            processor: ForkChoiceProcessor::new(head_tx),
            delayed: DelayedQueues::default(),
            mutator_rx,
            verifier_tx,
        }
    }

    /// Publishes the initial head.
    pub fn initialize(&mut self) -> Result<()> {
        self.refresh_head()
    }

    pub fn run(&mut self) -> Result<()> {
        // A message received while draining a burst of attestations.
        let mut next = None;

        loop {
            let message = match next.take() {
                Some(message) => message,
                None => self
                    .mutator_rx
                    .recv()
                    .expect("sender in Controller is not dropped until mutator thread exits"),
            };

            // Wait groups are held until the message has been fully handled.
            match message {
                MutatorMessage::Tick {
                    wait_group: _wait_group,
                    time,
                } => self.handle_tick(time)?,
                MutatorMessage::Block {
                    wait_group: _wait_group,
                    block,
                } => self.process_blocks([PendingBlock::new(block)])?,
                MutatorMessage::Attestation {
                    wait_group,
                    attestation,
                } => {
                    let mut wait_groups = vec![wait_group];
                    let mut attestations = vec![attestation];

                    while let Ok(message) = self.mutator_rx.try_recv() {
                        match message {
                            MutatorMessage::Attestation {
                                wait_group,
                                attestation,
                            } => {
                                wait_groups.push(wait_group);
                                attestations.push(attestation);
                            }
                            other => {
                                next = Some(other);
                                break;
                            }
                        }
                    }

                    self.process_attestations(attestations)?;

                    drop(wait_groups);
                }
                MutatorMessage::JustifiedCheckpoint {
                    wait_group: _wait_group,
                    checkpoint,
                } => self.handle_justified_checkpoint(checkpoint)?,
                MutatorMessage::Stop => break Ok(()),
            }
        }
    }

    fn handle_tick(&mut self, time: UnixSeconds) -> Result<()> {
        let (old_slot, new_slot) = {
            let mut tx = self.store.new_tx();
            let old_slot = tx.current_slot();

            tx.on_tick(time);

            let new_slot = tx.current_slot();

            tx.commit();

            (old_slot, new_slot)
        };

        self.refresh_head()?;

        if new_slot > old_slot {
            debug!("store advanced from slot {old_slot} to slot {new_slot}");
            AttestationVerifierMessage::Slot(new_slot).send(&self.verifier_tx);
        }

        let blocks = self
            .delayed
            .take_blocks_until_slot(new_slot)
            .map(PendingBlock::into_retry)
            .collect_vec();

        self.process_blocks(blocks)?;

        let attestations = self.delayed.take_attestations_until_tick();

        self.process_attestations(attestations)
    }

    fn handle_justified_checkpoint(&mut self, checkpoint: Checkpoint) -> Result<()> {
        let store = self.store.snapshot();
        let previous = self.processor.justified_checkpoint();

        self.processor
            .on_justified_checkpoint(store.as_ref(), checkpoint)?;

        // Keep the store's view of latest messages in step with the processor cache.
        if self.processor.justified_checkpoint() != previous {
            let mut tx = self.store.new_tx();
            tx.discard_latest_messages();
            tx.commit();
        }

        Ok(())
    }

    fn process_blocks(&mut self, blocks: impl IntoIterator<Item = PendingBlock<P>>) -> Result<()> {
        let mut queue = blocks.into_iter().collect::<VecDeque<_>>();

        while let Some(PendingBlock { block, retried }) = queue.pop_front() {
            let result = {
                let mut tx = self.store.new_tx();
                let result = tx.on_block(block.clone_arc());

                if matches!(result, Ok(BlockOutcome::Imported { .. })) {
                    tx.commit();
                }

                result
            };

            match result {
                Ok(BlockOutcome::Imported { block_root }) => {
                    debug!("block {block_root:?} at slot {} imported", block.slot);

                    self.after_block_import(block_root, &block)?;

                    AttestationVerifierMessage::BlockImported(block_root).send(&self.verifier_tx);

                    queue.extend(
                        self.delayed
                            .take_blocks_until_parent(block_root)
                            .into_iter()
                            .map(PendingBlock::into_retry),
                    );

                    let attestations = self.delayed.take_attestations_until_block(block_root);

                    self.process_attestations(attestations)?;
                }
                Ok(BlockOutcome::AlreadyKnown { block_root }) => {
                    debug!("block {block_root:?} is already known");
                }
                Err(error @ Error::BlockInFuture { .. }) => {
                    debug!("delaying block until its slot: {error}");
                    self.delayed
                        .delay_block_until_slot(PendingBlock { block, retried });
                }
                Err(error @ Error::NoParentBlock { .. }) if retried => {
                    warn!("dropping block after retry: {error}");
                }
                Err(error @ Error::NoParentBlock { .. }) => {
                    debug!("delaying block until its parent is imported: {error}");
                    self.delayed
                        .delay_block_until_parent(PendingBlock { block, retried });
                }
                Err(error) => debug!("block rejected: {error}"),
            }
        }

        Ok(())
    }

    fn after_block_import(&mut self, block_root: H256, block: &BeaconBlock<P>) -> Result<()> {
        let store = self.store.snapshot();

        let post_state = store
            .state(block_root)
            .expect("post-state of an imported block is in the store");

        let votes = block_votes(post_state, block);

        self.processor.on_block(store.as_ref(), block, votes);

        self.refresh_head()
    }

    fn process_attestations(&mut self, mut attestations: Vec<PendingAttestation<P>>) -> Result<()> {
        if attestations.is_empty() {
            return Ok(());
        }

        attestations.sort_by_key(|attestation| attestation.arrival);

        let mut votes = vec![];

        {
            let mut tx = self.store.new_tx();

            for attestation in attestations {
                let data = attestation.attestation.data;

                // Signatures are checked before attestations reach the controller.
                match tx.on_attestation(&attestation.attestation, NullVerifier) {
                    Ok(attesting_indices) => {
                        let message = LatestMessage {
                            epoch: data.target.epoch,
                            root: data.beacon_block_root,
                        };

                        votes.push((attesting_indices, message));
                    }
                    Err(error @ Error::EarlyForkChoiceConsideration { .. }) => {
                        debug!("delaying attestation until next tick: {error}");
                        self.delayed.delay_attestation_until_tick(attestation);
                    }
                    Err(
                        Error::UnknownBlockRoot { block_root }
                        | Error::UnknownTargetRoot {
                            target_root: block_root,
                        },
                    ) => {
                        debug!("delaying attestation until block {block_root:?} is imported");
                        self.delayed
                            .delay_attestation_until_block(block_root, attestation);
                    }
                    Err(error) => debug!("attestation rejected: {error}"),
                }
            }

            tx.commit();
        }

        if votes.is_empty() {
            return Ok(());
        }

        for (attesting_indices, message) in votes {
            self.processor.record_votes(&attesting_indices, message);
        }

        let store = self.store.snapshot();
        self.processor.update_head(store.as_ref())
    }

    // Called after every commit that may have changed the justified checkpoint.
    fn refresh_head(&mut self) -> Result<()> {
        let justified_checkpoint = self.store.snapshot().justified_checkpoint();

        self.handle_justified_checkpoint(justified_checkpoint)?;

        let store = self.store.snapshot();
        self.processor.update_head(store.as_ref())
    }
}

// Attestations in a block were already validated by the state transition.
// Those whose committees cannot be resolved in the post-state are skipped.
fn block_votes<P: Preset>(
    post_state: &BeaconState<P>,
    block: &BeaconBlock<P>,
) -> Vec<(Vec<ValidatorIndex>, LatestMessage)> {
    block
        .body
        .attestations
        .iter()
        .filter_map(|attestation| {
            let data = attestation.data;

            let attesting_indices =
                accessors::get_attesting_indices(post_state, data, &attestation.aggregation_bits)
                    .map_err(|error| debug!("skipping attestation in block: {error}"))
                    .ok()?
                    .collect();

            let message = LatestMessage {
                epoch: data.target.epoch,
                root: data.beacon_block_root,
            };

            Some((attesting_indices, message))
        })
        .collect()
}
