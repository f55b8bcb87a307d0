use thiserror::Error;
use types::phase0::primitives::{Epoch, Slot, H256};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "ancestor walk from {root:?} did not reach the requested slot \
         within {max_depth} parent links"
    )]
    AncestorDepthExceeded { root: H256, max_depth: u64 },
    #[error(
        "anchor block state root {block_state_root:?} does not match \
         anchor state root {state_root:?}"
    )]
    AnchorStateRootMismatch {
        block_state_root: H256,
        state_root: H256,
    },
    #[error(
        "attestation votes for a block newer than itself \
         (block_slot: {block_slot}, attestation_slot: {attestation_slot})"
    )]
    BlockAfterAttestation {
        block_slot: Slot,
        attestation_slot: Slot,
    },
    #[error(
        "attestation votes for a block from an epoch after its target \
         (block_epoch: {block_epoch}, target_epoch: {target_epoch})"
    )]
    BlockEpochAfterTarget {
        block_epoch: Epoch,
        target_epoch: Epoch,
    },
    #[error("block is not newer than finalized slot ({block_slot} <= {finalized_slot})")]
    BlockFinalized {
        block_slot: Slot,
        finalized_slot: Slot,
    },
    #[error("block slot is in the future ({block_slot} > {current_slot})")]
    BlockInFuture {
        block_slot: Slot,
        current_slot: Slot,
    },
    #[error(
        "block {block_root:?} does not descend from finalized block {finalized_root:?}"
    )]
    BlockNotDescendantOfFinalized {
        block_root: H256,
        finalized_root: H256,
    },
    #[error(
        "attestation cannot be considered by fork choice yet \
         (attestation_slot: {attestation_slot}, current_slot: {current_slot})"
    )]
    EarlyForkChoiceConsideration {
        attestation_slot: Slot,
        current_slot: Slot,
    },
    #[error(
        "attestation is invalid in the state of its target (attestation_slot: {attestation_slot})"
    )]
    InvalidAttestation {
        attestation_slot: Slot,
        #[source]
        source: anyhow::Error,
    },
    #[error(
        "LMD GHOST vote is inconsistent with FFG vote target \
         (beacon_block_root: {beacon_block_root:?}, target_root: {target_root:?})"
    )]
    LmdGhostInconsistentWithFfgTarget {
        beacon_block_root: H256,
        target_root: H256,
    },
    #[error("parent {parent_root:?} of block {block_root:?} is not known")]
    NoParentBlock { block_root: H256, parent_root: H256 },
    #[error(
        "attestation target epoch is before previous epoch \
         (target_epoch: {target_epoch}, current_epoch: {current_epoch})"
    )]
    TargetEpochTooOld {
        target_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error(
        "attestation target epoch does not match its slot \
         (target_epoch: {target_epoch}, attestation_slot: {attestation_slot})"
    )]
    TargetEpochMismatch {
        target_epoch: Epoch,
        attestation_slot: Slot,
    },
    #[error("too many empty slots after state: {state_slot} + {max_empty_slots} < {slot}")]
    TooManyEmptySlots {
        state_slot: Slot,
        max_empty_slots: u64,
        slot: Slot,
    },
    #[error("attestation votes for unknown block {block_root:?}")]
    UnknownBlockRoot { block_root: H256 },
    #[error("attestation target {target_root:?} is not known")]
    UnknownTargetRoot { target_root: H256 },
    #[error(transparent)]
    Transition(#[from] transition_functions::Error),
}

impl Error {
    /// Whether the object that caused the error may become valid later.
    ///
    /// Delayable errors are caused by objects arriving too early or before their dependencies.
    #[must_use]
    pub const fn is_delayable(&self) -> bool {
        matches!(
            self,
            Self::BlockInFuture { .. }
                | Self::EarlyForkChoiceConsideration { .. }
                | Self::NoParentBlock { .. }
                | Self::UnknownBlockRoot { .. }
                | Self::UnknownTargetRoot { .. },
        )
    }

    /// Root of the block that has to be imported before the object can be retried.
    #[must_use]
    pub const fn missing_block_root(&self) -> Option<H256> {
        match self {
            Self::NoParentBlock { parent_root, .. } => Some(*parent_root),
            Self::UnknownBlockRoot { block_root } => Some(*block_root),
            Self::UnknownTargetRoot { target_root } => Some(*target_root),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(
        Error::BlockInFuture { block_slot: 2, current_slot: 1 }
        => (true, None)
    )]
    #[test_case(
        Error::EarlyForkChoiceConsideration { attestation_slot: 2, current_slot: 2 }
        => (true, None)
    )]
    #[test_case(
        Error::NoParentBlock { block_root: H256::zero(), parent_root: H256::repeat_byte(1) }
        => (true, Some(H256::repeat_byte(1)))
    )]
    #[test_case(
        Error::UnknownTargetRoot { target_root: H256::repeat_byte(2) }
        => (true, Some(H256::repeat_byte(2)))
    )]
    #[test_case(
        Error::TargetEpochTooOld { target_epoch: 0, current_epoch: 2 }
        => (false, None)
    )]
    #[test_case(
        Error::BlockFinalized { block_slot: 0, finalized_slot: 8 }
        => (false, None)
    )]
    #[test_case(
        Error::Transition(transition_functions::Error::ProposerSlashed { index: 0 })
        => (false, None)
    )]
    fn classifies_errors(error: Error) -> (bool, Option<H256>) {
        (error.is_delayable(), error.missing_block_root())
    }

    #[test]
    fn transition_errors_keep_their_message() {
        let transition_error = transition_functions::Error::SlotNotLater {
            current: 3,
            target: 2,
        };

        let expected = transition_error.to_string();

        assert_eq!(Error::from(transition_error).to_string(), expected);
    }
}
