// The `on_*` methods send messages to the mutator thread and return immediately. They can be
// called from any thread, including `async` tasks. Query methods operate on the latest committed
// snapshot of the store, which may not reflect messages that are still being processed.

use core::{panic::AssertUnwindSafe, pin::pin};
use std::{
    sync::{mpsc::Sender, Arc},
    thread::{Builder, JoinHandle},
};

use anyhow::{Context as _, Result};
use clock::Tick;
use fork_choice_store::{Store, StoreConfig, StoreView as _, TransactionalStore};
use futures::stream::{Stream, StreamExt as _};
use log::debug;
use std_ext::ArcExt as _;
use thiserror::Error;
use transition_functions::StateTransition;
use types::{
    config::Config as ChainConfig,
    nonstandard::ReceivedAttestation,
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlock, Checkpoint},
        primitives::{Slot, UnixSeconds},
    },
    preset::Preset,
};

use crate::{
    events::HeadEvent,
    messages::{AttestationVerifierMessage, MutatorMessage},
    mutator::Mutator,
    unbounded_sink::UnboundedSink,
    wait::Wait,
};

pub struct Controller<P: Preset, T, W: Wait> {
    store: Arc<TransactionalStore<P, T>>,
    wait_group: W::Swappable,
    mutator_tx: Sender<MutatorMessage<P, W>>,
}

impl<P: Preset, T, W: Wait> Drop for Controller<P, T, W> {
    fn drop(&mut self) {
        MutatorMessage::Stop.send(&self.mutator_tx);
    }
}

impl<P, T, W> Controller<P, T, W>
where
    P: Preset,
    T: StateTransition<P>,
    W: Wait,
{
    pub fn new(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        transition: T,
        anchor_block: Arc<BeaconBlock<P>>,
        anchor_state: Arc<BeaconState<P>>,
        head_tx: impl UnboundedSink<HeadEvent>,
        verifier_tx: impl UnboundedSink<AttestationVerifierMessage>,
    ) -> Result<(Arc<Self>, MutatorHandle<P, W>)> {
        let store = Arc::new(TransactionalStore::new(
            chain_config,
            store_config,
            transition,
            anchor_block,
            anchor_state,
        )?);

        let (mutator_tx, mutator_rx) = std::sync::mpsc::channel();
        let mut mutator = Mutator::new(store.clone_arc(), mutator_rx, head_tx, verifier_tx);

        mutator.initialize()?;

        let join_handle = Builder::new().name("store-mutator".to_owned()).spawn(|| {
            // The closure should be unwind safe.
            // The store used by the mutator cannot be observed in an inconsistent state because
            // readers only see committed transactions.
            std::panic::catch_unwind(AssertUnwindSafe(move || mutator.run()))
                .map_err(panics::payload_into_error)
                .context(Error::MutatorPanicked)?
                .context(Error::MutatorFailed)
        })?;

        let controller = Arc::new(Self {
            store,
            wait_group: W::Swappable::default(),
            mutator_tx: mutator_tx.clone(),
        });

        let mutator_handle = MutatorHandle {
            join_handle: Some(join_handle),
            mutator_tx,
        };

        Ok((controller, mutator_handle))
    }

    // Ticks older than the current store time are ignored by the mutator.
    pub fn on_tick(&self, time: UnixSeconds) {
        MutatorMessage::Tick {
            wait_group: self.owned_wait_group(),
            time,
        }
        .send(&self.mutator_tx);
    }

    pub fn on_slot(&self, slot: Slot) -> Result<()> {
        let store = self.snapshot();
        let time =
            Tick::start_of_slot(slot).unix_seconds(store.chain_config(), store.genesis_time())?;

        self.on_tick(time);

        Ok(())
    }

    /// Feeds `ticks` to fork choice until the stream ends or yields an error.
    pub async fn run_ticks(&self, ticks: impl Stream<Item = Result<Tick>>) -> Result<()> {
        let mut ticks = pin!(ticks);

        while let Some(tick) = ticks.next().await {
            let Tick { slot } = tick?;

            debug!("slot tick: {slot}");

            self.on_slot(slot)?;
        }

        Ok(())
    }

    /// Ticks fork choice at the start of every slot. Must be called inside a Tokio runtime.
    pub async fn run_clock(&self) -> Result<()> {
        let store = self.snapshot();
        let ticks = clock::ticks(store.chain_config(), store.genesis_time())?;

        self.run_ticks(ticks).await
    }

    pub fn on_block(&self, block: Arc<BeaconBlock<P>>) {
        MutatorMessage::Block {
            wait_group: self.owned_wait_group(),
            block,
        }
        .send(&self.mutator_tx);
    }

    /// The signature of `attestation` must already be verified.
    pub fn on_attestation(&self, attestation: Arc<ReceivedAttestation<P>>) {
        MutatorMessage::Attestation {
            wait_group: self.owned_wait_group(),
            attestation,
        }
        .send(&self.mutator_tx);
    }

    pub fn on_justified_checkpoint(&self, checkpoint: Checkpoint) {
        MutatorMessage::JustifiedCheckpoint {
            wait_group: self.owned_wait_group(),
            checkpoint,
        }
        .send(&self.mutator_tx);
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<Store<P>> {
        self.store.snapshot()
    }

    #[must_use]
    pub fn transition(&self) -> &T {
        self.store.transition()
    }

    pub(crate) fn owned_wait_group(&self) -> W {
        W::load_and_clone(&self.wait_group)
    }

    pub(crate) const fn wait_group(&self) -> &W::Swappable {
        &self.wait_group
    }
}

pub struct MutatorHandle<P: Preset, W> {
    join_handle: Option<JoinHandle<Result<()>>>,
    mutator_tx: Sender<MutatorMessage<P, W>>,
}

impl<P: Preset, W> Drop for MutatorHandle<P, W> {
    fn drop(&mut self) {
        // Stop the mutator thread to avoid a deadlock if the corresponding `Controller` hasn't been
        // dropped yet. This only matters in tests.
        self.stop();

        let result = self.join_internal();

        if !std::thread::panicking() {
            result.expect("mutator thread should succeed when joined implicitly")
        }
    }
}

impl<P: Preset, W> MutatorHandle<P, W> {
    pub fn join(mut self) -> Result<()> {
        self.join_internal()
    }

    fn stop(&self) {
        MutatorMessage::Stop.send(&self.mutator_tx);
    }

    fn join_internal(&mut self) -> Result<()> {
        // Don't use `Option::expect` here.
        // `MutatorHandle::join_internal` is called twice when `MutatorHandle::join` is used.
        match self.join_handle.take() {
            Some(join_handle) => join_handle
                .join()
                .expect("mutator thread handles panics internally"),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("mutator panicked")]
    MutatorPanicked,
    #[error("mutator failed")]
    MutatorFailed,
}
