//! Supporting code for the fork choice store.
//!
//! This crate handles the following concerns:
//! - Serializing changes to the store on a dedicated thread.
//! - Delaying and retrying objects that cannot be processed immediately.
//! - Maintaining the latest message cache and the head.
//! - [Waiting for task completion](`Controller::wait_for_tasks`).
//! - Notifying other components of the application about changes to the fork choice store.

pub use crate::{
    controller::{Controller, MutatorHandle},
    delayed::{DelayedQueues, PendingAttestation, PendingBlock},
    events::HeadEvent,
    messages::AttestationVerifierMessage,
    processor::ForkChoiceProcessor,
    specialized::TestController,
    unbounded_sink::UnboundedSink,
    wait::Wait,
};

mod controller;
mod delayed;
mod events;
mod messages;
mod mutator;
mod processor;
mod specialized;
mod unbounded_sink;
mod wait;

#[cfg(test)]
mod extra_tests;
#[cfg(test)]
mod helpers;
