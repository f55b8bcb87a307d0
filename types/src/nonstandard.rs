use derive_more::Constructor;
use strum::AsRefStr;

use crate::{
    phase0::{
        containers::{Attestation, AttestationData},
        primitives::{Epoch, Slot, H256},
    },
    preset::Preset,
};

/// The most recent vote of a single validator as seen by fork choice.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct LatestMessage {
    pub epoch: Epoch,
    pub root: H256,
}

#[derive(Clone, Copy, Debug)]
pub enum RelativeEpoch {
    Previous,
    Current,
    Next,
}

impl From<AttestationEpoch> for RelativeEpoch {
    fn from(attestation_epoch: AttestationEpoch) -> Self {
        match attestation_epoch {
            AttestationEpoch::Previous => Self::Previous,
            AttestationEpoch::Current => Self::Current,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AttestationEpoch {
    Previous,
    Current,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, AsRefStr)]
pub enum AttestationOrigin {
    Gossip,
    Api,
    Block(H256),
    // Attestations constructed directly by tests skip the network layer entirely.
    Test,
}

impl AttestationOrigin {
    #[must_use]
    pub const fn is_from_block(self) -> bool {
        matches!(self, Self::Block(_))
    }

    /// Attestations from blocks have their signatures checked as part of the block.
    #[must_use]
    pub const fn verify_signatures(self) -> bool {
        match self {
            Self::Gossip | Self::Api | Self::Test => true,
            Self::Block(_) => false,
        }
    }
}

/// An attestation together with where and when this node first saw it.
///
/// `arrival` is a sequence number assigned on ingestion. Processing that depends on the order
/// attestations were observed in uses it instead of wall clock time.
#[derive(Clone, PartialEq, Eq, Debug, Constructor)]
pub struct ReceivedAttestation<P: Preset> {
    pub attestation: Attestation<P>,
    pub origin: AttestationOrigin,
    pub arrival: u64,
}

impl<P: Preset> ReceivedAttestation<P> {
    #[must_use]
    pub const fn data(&self) -> AttestationData {
        self.attestation.data
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.attestation.data.slot
    }

    #[must_use]
    pub const fn target_epoch(&self) -> Epoch {
        self.attestation.data.target.epoch
    }
}
