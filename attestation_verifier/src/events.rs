use std::sync::Arc;

use fork_choice_control::UnboundedSink;
use log::debug;
use types::{nonstandard::ReceivedAttestation, preset::Preset};

use crate::error::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    Sanity,
    UnknownBlock,
    State,
    Signature,
}

/// Outcome of a single attestation passing through one stage of the pipeline.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PipelineEvent<P: Preset> {
    Valid {
        stage: Stage,
        attestation: Arc<ReceivedAttestation<P>>,
    },
    Invalid {
        stage: Stage,
        attestation: Arc<ReceivedAttestation<P>>,
        reason: Error,
    },
}

impl<P: Preset> PipelineEvent<P> {
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Valid { stage, .. } | Self::Invalid { stage, .. } => *stage,
        }
    }

    #[must_use]
    pub const fn attestation(&self) -> &Arc<ReceivedAttestation<P>> {
        match self {
            Self::Valid { attestation, .. } | Self::Invalid { attestation, .. } => attestation,
        }
    }

    #[must_use]
    pub const fn reason(&self) -> Option<Error> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(*reason),
        }
    }

    pub(crate) fn send(self, tx: &impl UnboundedSink<Self>) {
        if tx.unbounded_send(self).is_err() {
            debug!("send to pipeline event subscriber failed because the receiver was dropped");
        }
    }
}
