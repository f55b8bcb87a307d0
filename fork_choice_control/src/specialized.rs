use core::ops::DerefMut as _;
use std::sync::Arc;

use anyhow::Result;
use crossbeam_utils::sync::WaitGroup;
use fork_choice_store::StoreConfig;
use tap::Pipe as _;
use transition_functions::{Phase0, StateTransition};
use types::{
    config::Config as ChainConfig,
    phase0::{beacon_state::BeaconState, containers::BeaconBlock},
    preset::Preset,
};

use crate::{
    controller::{Controller, MutatorHandle},
    events::HeadEvent,
    unbounded_sink::UnboundedSink,
};

/// A [`Controller`] whose callers can wait for submitted messages to be processed.
pub type TestController<P, T = Phase0> = Controller<P, T, WaitGroup>;

impl<P, T> Controller<P, T, WaitGroup>
where
    P: Preset,
    T: StateTransition<P>,
{
    /// Blocks until every message submitted before the call has been processed.
    ///
    /// This is intended for use in tests.
    /// [`WaitGroup`] is not used in normal operation because it adds some overhead.
    pub fn wait_for_tasks(&self) {
        let wait_group = self
            .wait_group()
            .lock()
            .deref_mut()
            .pipe(core::mem::take);

        wait_group.wait()
    }

    /// Creates a controller that only publishes head events.
    pub fn with_head_tx(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        transition: T,
        anchor_block: Arc<BeaconBlock<P>>,
        anchor_state: Arc<BeaconState<P>>,
        head_tx: impl UnboundedSink<HeadEvent>,
    ) -> Result<(Arc<Self>, MutatorHandle<P, WaitGroup>)> {
        Self::new(
            chain_config,
            store_config,
            transition,
            anchor_block,
            anchor_state,
            head_tx,
            futures::sink::drain(),
        )
    }
}
