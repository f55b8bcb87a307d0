// The pipeline runs on two threads, each with its own single-threaded Tokio runtime:
// - `attestation-state` performs sanity checks, parks attestations for unknown blocks and
//   verifies batches against states from the fork choice store;
// - `attestation-signature` verifies signatures in batches and passes valid attestations to the
//   controller.
//
// Closing the input channel shuts the pipeline down. Each stage processes everything it has
// received before exiting, so attestations submitted before `AttestationVerifier::join` are
// never lost.

use core::panic::AssertUnwindSafe;
use std::{
    sync::Arc,
    thread::{Builder, JoinHandle},
};

use anyhow::{Context as _, Result};
use fork_choice_control::{AttestationVerifierMessage, Controller, UnboundedSink, Wait};
use fork_choice_store::StoreView as _;
use futures::{channel::mpsc::UnboundedReceiver, StreamExt as _};
use helper_functions::misc;
use log::debug;
use parking_lot::Mutex;
use std_ext::ArcExt as _;
use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver, Sender};
use transition_functions::StateTransition;
use types::{
    nonstandard::{AttestationOrigin, ReceivedAttestation},
    phase0::{
        containers::Attestation,
        primitives::{Slot, H256},
    },
    preset::Preset,
};

use crate::{
    error::Error,
    events::{PipelineEvent, Stage},
    sanity,
    signature_verifier,
    state_verifier::{self, PendingBatches, Rejection, VerifiedAttestation},
    unknown_block_pool::UnknownBlockPool,
    verifier_config::VerifierConfig,
};

pub struct AttestationVerifier<P: Preset> {
    // `None` once the pipeline has been shut down.
    input: Mutex<Option<Input<P>>>,
    join_handles: Vec<JoinHandle<Result<()>>>,
}

struct Input<P: Preset> {
    tx: Sender<Arc<ReceivedAttestation<P>>>,
    next_arrival: u64,
}

impl<P: Preset> Drop for AttestationVerifier<P> {
    fn drop(&mut self) {
        let result = self.join_internal();

        if !std::thread::panicking() {
            result.expect("attestation verifier threads should succeed when joined implicitly")
        }
    }
}

impl<P: Preset> AttestationVerifier<P> {
    /// Starts the pipeline.
    ///
    /// `controller_rx` must receive the messages `controller` sends to its attestation verifier.
    pub fn new<T, W>(
        controller: Arc<Controller<P, T, W>>,
        controller_rx: UnboundedReceiver<AttestationVerifierMessage>,
        config: VerifierConfig,
        event_tx: impl UnboundedSink<PipelineEvent<P>>,
    ) -> Result<Self>
    where
        T: StateTransition<P>,
        W: Wait,
    {
        let (input_tx, input_rx) = mpsc::channel(config.channel_capacity);
        let (signature_tx, signature_rx) = mpsc::channel(config.channel_capacity);

        let state_stage = StateStage {
            controller: controller.clone_arc(),
            event_tx: UnboundedSink::clone(&event_tx),
            unknown_block_pool: UnknownBlockPool::new(config.unknown_block_pool_size),
            pending_batches: PendingBatches::default(),
            signature_tx,
        };

        let signature_stage = SignatureStage {
            controller,
            event_tx,
            config,
        };

        let state_thread = Builder::new()
            .name("attestation-state".to_owned())
            .spawn(move || {
                run_in_runtime(
                    state_stage.run(input_rx, controller_rx),
                    ThreadError::StatePanicked,
                    ThreadError::StateFailed,
                )
            })?;

        let signature_thread = Builder::new()
            .name("attestation-signature".to_owned())
            .spawn(move || {
                run_in_runtime(
                    signature_stage.run(signature_rx),
                    ThreadError::SignaturePanicked,
                    ThreadError::SignatureFailed,
                )
            })?;

        let input = Input {
            tx: input_tx,
            next_arrival: 0,
        };

        Ok(Self {
            input: Mutex::new(Some(input)),
            join_handles: vec![state_thread, signature_thread],
        })
    }

    /// Submits an attestation for verification.
    ///
    /// Attestations are numbered in the order they are submitted in. Fork choice uses the numbers
    /// to apply votes in the order they were first observed.
    ///
    /// Blocks while the pipeline is full. Must not be called from asynchronous code.
    pub fn submit(&self, attestation: Attestation<P>, origin: AttestationOrigin) -> Result<()> {
        // The lock is held while sending to keep arrival numbers in channel order.
        let mut input = self.input.lock();
        let input = input.as_mut().ok_or(ThreadError::Stopped)?;
        let arrival = input.next_arrival;

        input.next_arrival += 1;

        let attestation = Arc::new(ReceivedAttestation::new(attestation, origin, arrival));

        input
            .tx
            .blocking_send(attestation)
            .map_err(|_| ThreadError::Stopped)?;

        Ok(())
    }

    /// Stops accepting attestations and waits for submitted ones to be processed.
    pub fn join(mut self) -> Result<()> {
        self.join_internal()
    }

    fn join_internal(&mut self) -> Result<()> {
        // Dropping the sender shuts down the stages in order.
        self.input.lock().take();

        // Join every thread even if one of them failed.
        let results = self
            .join_handles
            .drain(..)
            .map(|join_handle| {
                join_handle
                    .join()
                    .expect("attestation verifier threads handle panics internally")
            })
            .collect::<Vec<_>>();

        results.into_iter().collect()
    }
}

fn run_in_runtime(
    future: impl core::future::Future<Output = Result<()>>,
    panicked: ThreadError,
    failed: ThreadError,
) -> Result<()> {
    std::panic::catch_unwind(AssertUnwindSafe(move || {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?
            .block_on(future)
    }))
    .map_err(panics::payload_into_error)
    .context(panicked)?
    .context(failed)
}

struct StateStage<P: Preset, T, W: Wait, S> {
    controller: Arc<Controller<P, T, W>>,
    event_tx: S,
    unknown_block_pool: UnknownBlockPool<P>,
    pending_batches: PendingBatches<P>,
    signature_tx: Sender<VerifiedAttestation<P>>,
}

impl<P, T, W, S> StateStage<P, T, W, S>
where
    P: Preset,
    T: StateTransition<P>,
    W: Wait,
    S: UnboundedSink<PipelineEvent<P>>,
{
    async fn run(
        mut self,
        mut input_rx: Receiver<Arc<ReceivedAttestation<P>>>,
        mut controller_rx: UnboundedReceiver<AttestationVerifierMessage>,
    ) -> Result<()> {
        let mut controller_open = true;

        loop {
            tokio::select! {
                // Imported blocks must be seen before attestations that may vote for them.
                biased;

                message = controller_rx.next(), if controller_open => match message {
                    Some(message) => self.handle_controller_message(message),
                    None => controller_open = false,
                },
                attestation = input_rx.recv() => match attestation {
                    Some(attestation) => self.ingest(attestation),
                    None => break,
                },
            }

            self.drain_ready(&mut input_rx, &mut controller_rx, &mut controller_open);
            self.verify_pending_batches().await?;
        }

        debug!(
            "attestation-state stage stopped with {} attestations waiting for unknown blocks",
            self.unknown_block_pool.len(),
        );

        Ok(())
    }

    // Everything queued while the previous batches were being verified joins the pending batches,
    // so attestations with the same target and block share one state.
    fn drain_ready(
        &mut self,
        input_rx: &mut Receiver<Arc<ReceivedAttestation<P>>>,
        controller_rx: &mut UnboundedReceiver<AttestationVerifierMessage>,
        controller_open: &mut bool,
    ) {
        loop {
            while *controller_open {
                match controller_rx.try_next() {
                    Ok(Some(message)) => self.handle_controller_message(message),
                    Ok(None) => *controller_open = false,
                    Err(_) => break,
                }
            }

            match input_rx.try_recv() {
                Ok(attestation) => self.ingest(attestation),
                Err(_) => break,
            }
        }
    }

    fn handle_controller_message(&mut self, message: AttestationVerifierMessage) {
        match message {
            AttestationVerifierMessage::BlockImported(block_root) => {
                self.release_waiting_for(block_root);
            }
            AttestationVerifierMessage::Slot(slot) => self.prune_unknown_block_pool(slot),
        }
    }

    fn ingest(&mut self, attestation: Arc<ReceivedAttestation<P>>) {
        let store = self.controller.snapshot();

        let checked = sanity::check(
            &attestation.attestation,
            store.current_epoch(),
            store.finalized_checkpoint().epoch,
        );

        if let Err(reason) = checked {
            self.report_invalid(Stage::Sanity, attestation, reason);
            return;
        }

        self.report_valid(Stage::Sanity, attestation.clone_arc());

        let block_root = attestation.data().beacon_block_root;

        if store.contains_block(block_root) {
            self.pending_batches.push(attestation);
            return;
        }

        debug!("attestation waiting for unknown block {block_root:?}");

        if let Some(evicted) = self.unknown_block_pool.insert(attestation) {
            let block_root = evicted.data().beacon_block_root;

            self.report_invalid(
                Stage::UnknownBlock,
                evicted,
                Error::EvictedFromUnknownBlockPool { block_root },
            );
        }
    }

    fn release_waiting_for(&mut self, block_root: H256) {
        for attestation in self.unknown_block_pool.take_for_block(block_root) {
            self.report_valid(Stage::UnknownBlock, attestation.clone_arc());
            self.pending_batches.push(attestation);
        }
    }

    fn prune_unknown_block_pool(&mut self, slot: Slot) {
        let previous_epoch = misc::compute_epoch_at_slot::<P>(slot).saturating_sub(1);

        for attestation in self.unknown_block_pool.prune(previous_epoch) {
            let data = attestation.data();

            let reason = Error::UnknownBlockExpired {
                block_root: data.beacon_block_root,
                target_epoch: data.target.epoch,
            };

            self.report_invalid(Stage::UnknownBlock, attestation, reason);
        }
    }

    async fn verify_pending_batches(&mut self) -> Result<()> {
        if !self.pending_batches.is_empty() {
            debug!(
                "verifying {} attestations in {} batches",
                self.pending_batches.attestation_count(),
                self.pending_batches.len(),
            );
        }

        while let Some((key, batch)) = self.pending_batches.take() {
            let store = self.controller.snapshot();

            let outcomes = state_verifier::verify_batch(
                store.as_ref(),
                self.controller.transition(),
                key,
                batch,
            );

            for outcome in outcomes {
                match outcome {
                    Ok(verified) => {
                        self.report_valid(Stage::State, verified.attestation.clone_arc());

                        self.signature_tx
                            .send(verified)
                            .await
                            .map_err(|_| ThreadError::SignatureStageStopped)?;
                    }
                    Err(Rejection {
                        attestation,
                        reason,
                    }) => self.report_invalid(Stage::State, attestation, reason),
                }
            }
        }

        Ok(())
    }

    fn report_valid(&self, stage: Stage, attestation: Arc<ReceivedAttestation<P>>) {
        PipelineEvent::Valid { stage, attestation }.send(&self.event_tx);
    }

    fn report_invalid(
        &self,
        stage: Stage,
        attestation: Arc<ReceivedAttestation<P>>,
        reason: Error,
    ) {
        debug!(
            "attestation rejected at {stage:?} stage: {reason} (arrival: {})",
            attestation.arrival,
        );

        PipelineEvent::Invalid {
            stage,
            attestation,
            reason,
        }
        .send(&self.event_tx);
    }
}

struct SignatureStage<P: Preset, T, W: Wait, S> {
    controller: Arc<Controller<P, T, W>>,
    event_tx: S,
    config: VerifierConfig,
}

impl<P, T, W, S> SignatureStage<P, T, W, S>
where
    P: Preset,
    T: StateTransition<P>,
    W: Wait,
    S: UnboundedSink<PipelineEvent<P>>,
{
    async fn run(self, signature_rx: Receiver<VerifiedAttestation<P>>) -> Result<()> {
        signature_verifier::batch_window(
            signature_rx,
            self.config.max_batch_size,
            self.config.max_batch_delay,
            |batch| self.verify(batch),
        )
        .await;

        Ok(())
    }

    fn verify(&self, batch: Vec<VerifiedAttestation<P>>) {
        debug!("verifying signatures of {} attestations", batch.len());

        for (attestation, result) in signature_verifier::verify_batch(batch) {
            match result {
                Ok(()) => {
                    PipelineEvent::Valid {
                        stage: Stage::Signature,
                        attestation: attestation.clone_arc(),
                    }
                    .send(&self.event_tx);

                    self.controller.on_attestation(attestation);
                }
                Err(reason) => {
                    debug!(
                        "attestation rejected at Signature stage: {reason} (arrival: {})",
                        attestation.arrival,
                    );

                    PipelineEvent::Invalid {
                        stage: Stage::Signature,
                        attestation,
                        reason,
                    }
                    .send(&self.event_tx);
                }
            }
        }
    }
}

#[derive(Debug, Error)]
enum ThreadError {
    #[error("attestation-state thread panicked")]
    StatePanicked,
    #[error("attestation-state thread failed")]
    StateFailed,
    #[error("attestation-signature thread panicked")]
    SignaturePanicked,
    #[error("attestation-signature thread failed")]
    SignatureFailed,
    #[error("signature verification stage stopped before the state stage")]
    SignatureStageStopped,
    #[error("attestation verifier has been stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use crossbeam_utils::sync::WaitGroup;
    use fork_choice_control::{HeadEvent, MutatorHandle, TestController};
    use fork_choice_store::StoreConfig;
    use itertools::Itertools as _;
    use transition_functions::Phase0;
    use helper_functions::accessors;
    use types::{
        config::Config,
        nonstandard::LatestMessage,
        phase0::{
            beacon_state::BeaconState,
            containers::{AttestationData, BeaconBlock, Checkpoint},
            primitives::ValidatorIndex,
        },
        preset::Minimal,
        traits::SszHash as _,
    };

    use super::*;

    // Counts state advancement to detect states computed for attestations.
    #[derive(Default)]
    struct CountingTransition {
        process_slots_calls: AtomicUsize,
        state_stage_calls: AtomicUsize,
        // Locked by tests to stall state advancement.
        gate: Mutex<()>,
    }

    impl StateTransition<Minimal> for CountingTransition {
        fn process_slots(
            &self,
            state: &mut BeaconState<Minimal>,
            slot: Slot,
        ) -> Result<(), transition_functions::Error> {
            let _gate = self.gate.lock();

            self.process_slots_calls.fetch_add(1, Ordering::SeqCst);

            if std::thread::current().name() == Some("attestation-state") {
                self.state_stage_calls.fetch_add(1, Ordering::SeqCst);
            }

            Phase0.process_slots(state, slot)
        }

        fn state_transition(
            &self,
            state: &mut BeaconState<Minimal>,
            block: &BeaconBlock<Minimal>,
        ) -> Result<(), transition_functions::Error> {
            Phase0.state_transition(state, block)
        }
    }

    struct Context {
        config: Arc<Config>,
        genesis_state: Arc<BeaconState<Minimal>>,
        verifier: Option<AttestationVerifier<Minimal>>,
        controller: Arc<TestController<Minimal, CountingTransition>>,
        #[expect(
            dead_code,
            reason = "Keep the `MutatorHandle` around to avoid joining the mutator thread prematurely."
        )]
        mutator_handle: MutatorHandle<Minimal, WaitGroup>,
        head_rx: UnboundedReceiver<HeadEvent>,
        event_rx: UnboundedReceiver<PipelineEvent<Minimal>>,
        events: Vec<PipelineEvent<Minimal>>,
    }

    impl Context {
        fn new() -> Self {
            let _ = env_logger::builder().is_test(true).try_init();

            let config = Arc::new(Config::minimal());

            let (genesis_state, genesis_block) = factory::min_genesis_state(&config)
                .expect("genesis state should be constructed successfully");

            let (head_tx, head_rx) = futures::channel::mpsc::unbounded();
            let (verifier_tx, verifier_rx) = futures::channel::mpsc::unbounded();
            let (event_tx, event_rx) = futures::channel::mpsc::unbounded();

            let (controller, mutator_handle) = TestController::<Minimal, CountingTransition>::new(
                config.clone_arc(),
                StoreConfig::default(),
                CountingTransition::default(),
                genesis_block,
                genesis_state.clone_arc(),
                head_tx,
                verifier_tx,
            )
            .expect("Controller::new should not fail in tests");

            let verifier = AttestationVerifier::new(
                controller.clone_arc(),
                verifier_rx,
                VerifierConfig::default(),
                event_tx,
            )
            .expect("AttestationVerifier::new should not fail in tests");

            Self {
                config,
                genesis_state,
                verifier: Some(verifier),
                controller,
                mutator_handle,
                head_rx,
                event_rx,
                events: vec![],
            }
        }

        fn empty_block(
            &self,
            pre_state: &Arc<BeaconState<Minimal>>,
            slot: Slot,
            graffiti: H256,
        ) -> (Arc<BeaconBlock<Minimal>>, Arc<BeaconState<Minimal>>) {
            factory::empty_block(pre_state.clone_arc(), slot, graffiti)
                .expect("block should be constructed successfully")
        }

        fn attestation(
            &self,
            state: &BeaconState<Minimal>,
            data: AttestationData,
            positions: impl IntoIterator<Item = usize>,
        ) -> Attestation<Minimal> {
            factory::attestation(&self.config, state, data, positions)
                .expect("attestation should be constructed successfully")
        }

        fn on_slot(&self, slot: Slot) {
            self.controller
                .on_slot(slot)
                .expect("slot should be representable as a timestamp");

            self.controller.wait_for_tasks();
        }

        fn on_block(&self, block: &Arc<BeaconBlock<Minimal>>) {
            self.controller.on_block(block.clone_arc());
            self.controller.wait_for_tasks();
        }

        fn submit(&self, attestation: Attestation<Minimal>) {
            self.verifier
                .as_ref()
                .expect("verifier is only taken by Context::finish")
                .submit(attestation, AttestationOrigin::Test)
                .expect("verifier should accept attestations until joined");
        }

        fn process_slots_calls(&self) -> usize {
            self.controller
                .transition()
                .process_slots_calls
                .load(Ordering::SeqCst)
        }

        fn state_stage_calls(&self) -> usize {
            self.controller
                .transition()
                .state_stage_calls
                .load(Ordering::SeqCst)
        }

        /// Blocks until the pipeline reports the next event.
        fn wait_for_event(&mut self) -> Stage {
            let event = futures::executor::block_on(self.event_rx.next())
                .expect("pipeline is running while Context exists");

            let stage = event.stage();

            self.events.push(event);

            stage
        }

        /// Shuts down the pipeline after everything submitted has reached fork choice.
        fn finish(&mut self) -> Vec<PipelineEvent<Minimal>> {
            self.verifier
                .take()
                .expect("Context::finish is called once")
                .join()
                .expect("attestation verifier should stop cleanly");

            self.controller.wait_for_tasks();

            let remaining = core::iter::from_fn(|| self.event_rx.try_next().ok().flatten());

            let mut events = core::mem::take(&mut self.events);
            events.extend(remaining);
            events
        }

        fn last_head(&mut self) -> Option<H256> {
            core::iter::from_fn(|| self.head_rx.try_next().ok().flatten())
                .last()
                .map(|event| event.block_root)
        }
    }

    fn summary(events: &[PipelineEvent<Minimal>]) -> Vec<(u64, Stage, Option<Error>)> {
        events
            .iter()
            .map(|event| (event.attestation().arrival, event.stage(), event.reason()))
            .sorted_by_key(|(arrival, _, _)| *arrival)
            .collect()
    }

    #[test]
    fn valid_attestation_reaches_fork_choice() {
        let mut context = Context::new();
        let genesis_state = context.genesis_state.clone_arc();
        let (first, first_state) = context.empty_block(&genesis_state, 1, H256::zero());
        let (second, second_state) = context.empty_block(&genesis_state, 1, H256::repeat_byte(1));
        let first_root = first.hash_tree_root();
        let second_root = second.hash_tree_root();

        let (smaller, smaller_state) = if first_root < second_root {
            (first_root, first_state)
        } else {
            (second_root, second_state)
        };

        context.on_slot(2);
        context.on_block(&first);
        context.on_block(&second);

        let data = factory::attestation_data(&smaller_state, 1, 0)
            .expect("attestation data should be constructed successfully");

        context.submit(context.attestation(&smaller_state, data, [0]));

        let events = context.finish();

        assert_eq!(
            summary(&events),
            [
                (0, Stage::Sanity, None),
                (0, Stage::State, None),
                (0, Stage::Signature, None),
            ],
        );

        assert_eq!(context.last_head(), Some(smaller));
    }

    #[test]
    fn attestations_for_block_after_target_epoch_are_rejected_without_computing_states() {
        let mut context = Context::new();
        let genesis_state = context.genesis_state.clone_arc();
        let (block, block_state) = context.empty_block(&genesis_state, 8, H256::zero());
        let block_root = block.hash_tree_root();

        context.on_slot(8);
        context.on_block(&block);

        // Slot 7 is in epoch 0. The block at slot 8 is in epoch 1.
        let data = AttestationData {
            slot: 7,
            index: 0,
            beacon_block_root: block_root,
            source: block_state.current_justified_checkpoint,
            target: Checkpoint {
                epoch: 0,
                root: context.controller.snapshot().anchor_root(),
            },
        };

        let calls_before = context.process_slots_calls();

        for positions in [vec![0], vec![1], vec![2], vec![3], vec![0, 1]] {
            context.submit(context.attestation(&block_state, data, positions));
        }

        let events = context.finish();

        let expected_reason = Error::BlockEpochAfterTarget {
            block_epoch: 1,
            target_epoch: 0,
        };

        let expected = (0..5)
            .flat_map(|arrival| {
                [
                    (arrival, Stage::Sanity, None),
                    (arrival, Stage::State, Some(expected_reason)),
                ]
            })
            .collect_vec();

        assert_eq!(summary(&events), expected);
        assert_eq!(context.process_slots_calls(), calls_before);
    }

    #[test]
    fn attestations_queued_during_verification_share_one_target_state() {
        let mut context = Context::new();
        let genesis_state = context.genesis_state.clone_arc();
        let (block, block_state) = context.empty_block(&genesis_state, 1, H256::zero());
        let block_root = block.hash_tree_root();

        context.on_slot(10);
        context.on_block(&block);

        // Slot 9 is in epoch 1. The block at slot 1 is the latest block, so it is the target.
        let mut advanced = block_state.clone_arc();

        transition_functions::process_slots(advanced.make_mut(), 9)
            .expect("slots should be processed successfully");

        let data = factory::attestation_data(&advanced, 9, 0)
            .expect("attestation data should be constructed successfully");

        assert_eq!(data.target.root, block_root);

        let controller = context.controller.clone_arc();
        let gate = controller.transition().gate.lock();

        context.submit(context.attestation(&advanced, data, [0]));

        assert_eq!(context.wait_for_event(), Stage::Sanity);

        // The state stage is verifying the first attestation or about to. The rest queue up.
        for position in 1..4 {
            context.submit(context.attestation(&advanced, data, [position]));
        }

        drop(gate);

        let events = context.finish();

        let accepted = events
            .iter()
            .filter(|event| event.stage() == Stage::Signature && event.reason().is_none())
            .count();

        assert_eq!(accepted, 4);
        assert!(context.state_stage_calls() <= 2);
    }

    #[test]
    fn attestation_for_unknown_block_is_verified_after_import() {
        let mut context = Context::new();
        let genesis_state = context.genesis_state.clone_arc();
        let (block, block_state) = context.empty_block(&genesis_state, 1, H256::zero());
        let block_root = block.hash_tree_root();

        context.on_slot(2);

        let data = factory::attestation_data(&block_state, 1, 0)
            .expect("attestation data should be constructed successfully");

        context.submit(context.attestation(&block_state, data, [0]));

        // The attestation is parked once it has passed sanity checks.
        assert_eq!(context.wait_for_event(), Stage::Sanity);

        context.on_block(&block);

        let events = context.finish();

        assert_eq!(
            summary(&events),
            [
                (0, Stage::Sanity, None),
                (0, Stage::UnknownBlock, None),
                (0, Stage::State, None),
                (0, Stage::Signature, None),
            ],
        );

        assert_eq!(
            context
                .controller
                .snapshot()
                .latest_message(committee_member(&block_state, 1, 0)),
            Some(LatestMessage {
                epoch: 0,
                root: block_root,
            }),
        );
    }

    #[test]
    fn attestation_failing_sanity_checks_is_reported() {
        let mut context = Context::new();
        let genesis_state = context.genesis_state.clone_arc();

        let data = factory::attestation_data(&genesis_state, 0, 0)
            .expect("attestation data should be constructed successfully");

        let mut attestation = context.attestation(&genesis_state, data, [0]);

        assert!(attestation.aggregation_bits.set(0, false));

        context.submit(attestation);

        let events = context.finish();

        assert_eq!(
            summary(&events),
            [(0, Stage::Sanity, Some(Error::NoAggregationBits))],
        );
    }

    #[test]
    fn attestation_with_invalid_signature_is_rejected_at_signature_stage() {
        let mut context = Context::new();
        let genesis_state = context.genesis_state.clone_arc();

        context.on_slot(1);

        let data = factory::attestation_data(&genesis_state, 0, 0)
            .expect("attestation data should be constructed successfully");

        let valid = context.attestation(&genesis_state, data, [0]);
        let mut invalid = context.attestation(&genesis_state, data, [1]);

        invalid.signature = valid.signature;

        context.submit(valid);
        context.submit(invalid);

        let events = context.finish();

        assert_eq!(
            summary(&events),
            [
                (0, Stage::Sanity, None),
                (0, Stage::State, None),
                (0, Stage::Signature, None),
                (1, Stage::Sanity, None),
                (1, Stage::State, None),
                (1, Stage::Signature, Some(Error::SignatureInvalid)),
            ],
        );
    }

    fn committee_member(
        state: &BeaconState<Minimal>,
        slot: Slot,
        position: usize,
    ) -> ValidatorIndex {
        accessors::beacon_committee(state, slot, 0)
            .expect("committee should be computed successfully")[position]
    }
}
