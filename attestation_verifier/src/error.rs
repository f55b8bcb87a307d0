use thiserror::Error;
use types::phase0::primitives::{CommitteeIndex, Epoch, Slot, ValidatorIndex, H256};

/// Reasons for rejecting an attestation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("source epoch {source_epoch} is after target epoch {target_epoch}")]
    SourceAfterTarget {
        source_epoch: Epoch,
        target_epoch: Epoch,
    },
    #[error("target epoch {target_epoch} is before finalized epoch {finalized_epoch}")]
    TargetBeforeFinalized {
        target_epoch: Epoch,
        finalized_epoch: Epoch,
    },
    #[error("target epoch {target_epoch} is too far ahead of current epoch {current_epoch}")]
    TargetTooFarAhead {
        target_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error("attestation has no aggregation bits set")]
    NoAggregationBits,
    #[error("slot {slot} is not in target epoch {target_epoch}")]
    SlotOutsideTargetEpoch { slot: Slot, target_epoch: Epoch },
    #[error("evicted from full unknown block pool while waiting for block {block_root:?}")]
    EvictedFromUnknownBlockPool { block_root: H256 },
    #[error("block {block_root:?} was not imported before target epoch {target_epoch} expired")]
    UnknownBlockExpired { block_root: H256, target_epoch: Epoch },
    #[error("block epoch {block_epoch} is after target epoch {target_epoch}")]
    BlockEpochAfterTarget {
        block_epoch: Epoch,
        target_epoch: Epoch,
    },
    #[error("target root {target_root:?} does not match block root {block_root:?}")]
    TargetRootMismatch { target_root: H256, block_root: H256 },
    #[error("state for target epoch {target_epoch} could not be computed")]
    TargetStateUnavailable { target_epoch: Epoch },
    #[error("slot {slot} is not in the current or previous epoch of state at epoch {state_epoch}")]
    SlotOutsideStateEpochs { slot: Slot, state_epoch: Epoch },
    #[error("committee index {index} is out of range ({committees_per_slot} committees per slot)")]
    CommitteeIndexOutOfRange {
        index: CommitteeIndex,
        committees_per_slot: u64,
    },
    #[error("committee {index} at slot {slot} could not be computed")]
    CommitteeUnavailable { slot: Slot, index: CommitteeIndex },
    #[error("bitfield length {bitfield_length} does not match committee size {committee_size}")]
    BitfieldLengthMismatch {
        bitfield_length: usize,
        committee_size: usize,
    },
    #[error("public key of validator {validator_index} is unavailable")]
    PublicKeyUnavailable { validator_index: ValidatorIndex },
    #[error("signature could not be decompressed")]
    SignatureUndecodable,
    #[error("signature is invalid")]
    SignatureInvalid,
}
