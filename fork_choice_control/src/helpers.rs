use std::sync::Arc;

use anyhow::Result;
use clock::Tick;
use crossbeam_utils::sync::WaitGroup;
use fork_choice_store::{Store, StoreConfig};
use futures::channel::mpsc::UnboundedReceiver;
use std_ext::ArcExt as _;
use transition_functions::Phase0;
use types::{
    config::Config,
    nonstandard::{AttestationOrigin, ReceivedAttestation},
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, BeaconBlock, Checkpoint},
        primitives::{Slot, H256},
    },
    preset::Minimal,
    traits::SszHash as _,
};
use unwrap_none::UnwrapNone as _;

use crate::{
    controller::MutatorHandle,
    events::HeadEvent,
    messages::AttestationVerifierMessage,
    specialized::TestController,
};

pub struct Context {
    config: Arc<Config>,
    genesis_block: Arc<BeaconBlock<Minimal>>,
    genesis_state: Arc<BeaconState<Minimal>>,
    controller: Option<Arc<TestController<Minimal>>>,
    #[expect(
        dead_code,
        reason = "Keep the `MutatorHandle` around to avoid joining the mutator thread prematurely."
    )]
    mutator_handle: MutatorHandle<Minimal, WaitGroup>,
    head_rx: UnboundedReceiver<HeadEvent>,
    verifier_rx: UnboundedReceiver<AttestationVerifierMessage>,
    next_arrival: u64,
}

impl Drop for Context {
    fn drop(&mut self) {
        self.controller
            .take()
            .expect("Self.controller is only taken in Drop::drop");

        if !std::thread::panicking() {
            self.next_head_event().unwrap_none();
        }
    }
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let config = Arc::new(Config::minimal());

        let (genesis_state, genesis_block) = factory::min_genesis_state(&config)
            .expect("genesis state should be constructed successfully");

        let (head_tx, head_rx) = futures::channel::mpsc::unbounded();
        let (verifier_tx, verifier_rx) = futures::channel::mpsc::unbounded();

        let (controller, mutator_handle) = TestController::new(
            config.clone_arc(),
            StoreConfig::default(),
            Phase0,
            genesis_block.clone_arc(),
            genesis_state.clone_arc(),
            head_tx,
            verifier_tx,
        )
        .expect("Controller::new should not fail in tests");

        Self {
            config,
            genesis_block,
            genesis_state,
            controller: Some(controller),
            mutator_handle,
            head_rx,
            verifier_rx,
            next_arrival: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn genesis_root(&self) -> H256 {
        self.genesis_block.hash_tree_root()
    }

    #[must_use]
    pub fn genesis_state(&self) -> Arc<BeaconState<Minimal>> {
        self.genesis_state.clone_arc()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<Store<Minimal>> {
        self.controller().snapshot()
    }

    // The `graffiti` parameter makes otherwise identical blocks distinct.
    #[must_use]
    pub fn empty_block(
        &self,
        pre_state: &Arc<BeaconState<Minimal>>,
        slot: Slot,
        graffiti: H256,
    ) -> (Arc<BeaconBlock<Minimal>>, Arc<BeaconState<Minimal>>) {
        factory::empty_block(pre_state.clone_arc(), slot, graffiti)
            .expect("block should be constructed successfully")
    }

    /// Attestation by the first member of committee 0 voting for the latest block in `state`.
    #[must_use]
    pub fn attestation_for_head_of(
        &self,
        state: &BeaconState<Minimal>,
        slot: Slot,
    ) -> Attestation<Minimal> {
        let data = factory::attestation_data(state, slot, 0)
            .expect("attestation data should be constructed successfully");

        factory::attestation(self.config(), state, data, [0])
            .expect("attestation should be constructed successfully")
    }

    pub fn on_slot(&self, slot: Slot) {
        self.controller()
            .on_slot(slot)
            .expect("slot should be representable as a timestamp");

        self.controller().wait_for_tasks();
    }

    pub fn run_ticks(&self, ticks: impl IntoIterator<Item = Result<Tick>>) -> Result<()> {
        let stream = futures::stream::iter(ticks);
        let result = futures::executor::block_on(self.controller().run_ticks(stream));

        self.controller().wait_for_tasks();

        result
    }

    pub fn on_block(&self, block: &Arc<BeaconBlock<Minimal>>) {
        self.controller().on_block(block.clone_arc());
        self.controller().wait_for_tasks();
    }

    pub fn on_attestation(&mut self, attestation: Attestation<Minimal>) {
        let arrival = self.next_arrival;

        self.next_arrival += 1;

        self.controller().on_attestation(Arc::new(ReceivedAttestation::new(
            attestation,
            AttestationOrigin::Test,
            arrival,
        )));

        self.controller().wait_for_tasks();
    }

    pub fn on_justified_checkpoint(&self, checkpoint: Checkpoint) {
        self.controller().on_justified_checkpoint(checkpoint);
        self.controller().wait_for_tasks();
    }

    pub fn next_head_event(&mut self) -> Option<HeadEvent> {
        self.head_rx.try_next().ok().flatten()
    }

    pub fn head_events(&mut self) -> Vec<HeadEvent> {
        core::iter::from_fn(|| self.next_head_event()).collect()
    }

    /// Drains head events and returns the root of the last one.
    pub fn last_head(&mut self) -> Option<H256> {
        self.head_events().last().map(|event| event.block_root)
    }

    pub fn verifier_messages(&mut self) -> Vec<AttestationVerifierMessage> {
        core::iter::from_fn(|| self.verifier_rx.try_next().ok().flatten()).collect()
    }

    fn controller(&self) -> &TestController<Minimal> {
        self.controller
            .as_ref()
            .expect("Self.controller is only taken in Drop::drop")
    }
}
