//! Checks that only need the attestation itself and the epochs known to fork choice.

use helper_functions::misc;
use types::{
    phase0::{containers::Attestation, primitives::Epoch},
    preset::Preset,
};

use crate::error::Error;

/// Number of epochs an attestation target may be ahead of the current epoch.
///
/// Clocks of different nodes are not perfectly synchronized.
pub const MAX_ATTESTATION_LOOKAHEAD: Epoch = 1;

pub fn check<P: Preset>(
    attestation: &Attestation<P>,
    current_epoch: Epoch,
    finalized_epoch: Epoch,
) -> Result<(), Error> {
    let data = attestation.data;
    let target_epoch = data.target.epoch;

    if data.source.epoch > target_epoch {
        return Err(Error::SourceAfterTarget {
            source_epoch: data.source.epoch,
            target_epoch,
        });
    }

    if target_epoch < finalized_epoch {
        return Err(Error::TargetBeforeFinalized {
            target_epoch,
            finalized_epoch,
        });
    }

    if target_epoch > current_epoch + MAX_ATTESTATION_LOOKAHEAD {
        return Err(Error::TargetTooFarAhead {
            target_epoch,
            current_epoch,
        });
    }

    if !attestation.aggregation_bits.any() {
        return Err(Error::NoAggregationBits);
    }

    if misc::compute_epoch_at_slot::<P>(data.slot) != target_epoch {
        return Err(Error::SlotOutsideTargetEpoch {
            slot: data.slot,
            target_epoch,
        });
    }

    Ok(())
}
