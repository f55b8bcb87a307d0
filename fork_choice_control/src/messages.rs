use std::sync::{mpsc::Sender, Arc};

use log::debug;
use types::{
    nonstandard::ReceivedAttestation,
    phase0::{
        containers::{BeaconBlock, Checkpoint},
        primitives::{Slot, UnixSeconds, H256},
    },
    preset::Preset,
};

use crate::unbounded_sink::UnboundedSink;

pub enum MutatorMessage<P: Preset, W> {
    Tick {
        wait_group: W,
        time: UnixSeconds,
    },
    Block {
        wait_group: W,
        block: Arc<BeaconBlock<P>>,
    },
    Attestation {
        wait_group: W,
        attestation: Arc<ReceivedAttestation<P>>,
    },
    JustifiedCheckpoint {
        wait_group: W,
        checkpoint: Checkpoint,
    },
    Stop,
}

impl<P: Preset, W> MutatorMessage<P, W> {
    pub fn send(self, tx: &Sender<Self>) {
        if tx.send(self).is_err() {
            debug!("send to mutator failed because the receiver was dropped");
        }
    }
}

/// Changes in the fork choice store the attestation pipeline depends on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttestationVerifierMessage {
    /// Attestations waiting for this block can now be verified.
    BlockImported(H256),
    /// The store has advanced to a new slot.
    Slot(Slot),
}

impl AttestationVerifierMessage {
    pub fn send(self, tx: &impl UnboundedSink<Self>) {
        if tx.unbounded_send(self).is_err() {
            debug!("send to attestation verifier failed because the receiver was dropped");
        }
    }
}
