use anyhow::{ensure, Error as AnyhowError, Result};
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{IndexedAttestation, Validator},
        primitives::Epoch,
    },
    preset::Preset,
};

use crate::{
    accessors,
    error::{Error, SignatureKind},
    signing::SignForSingleFork as _,
    verifier::Verifier,
};

// > Check if ``validator`` is active.
#[inline]
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

// This doesn't verify the signature when called directly with a verifier that defers work.
// When calling directly, use `SingleVerifier`.
pub fn validate_constructed_indexed_attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    indexed_attestation: &IndexedAttestation,
    verifier: impl Verifier,
) -> Result<()> {
    validate_indexed_attestation(config, state, indexed_attestation, verifier, false)
}

pub fn validate_received_indexed_attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    indexed_attestation: &IndexedAttestation,
    verifier: impl Verifier,
) -> Result<()> {
    validate_indexed_attestation(config, state, indexed_attestation, verifier, true)
}

fn validate_indexed_attestation<P: Preset, V: Verifier>(
    config: &Config,
    state: &BeaconState<P>,
    indexed_attestation: &IndexedAttestation,
    mut verifier: V,
    validate_indices_sorted_and_unique: bool,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    ensure!(!indices.is_empty(), Error::AttestationHasNoAttestingIndices);

    if validate_indices_sorted_and_unique {
        // > Verify indices are sorted and unique
        ensure!(
            indices.iter().tuple_windows().all(|(a, b)| a < b),
            Error::AttestingIndicesNotSortedAndUnique,
        );
    }

    // Skip looking up and decompressing public keys when signatures were already checked.
    if V::IS_NULL {
        return Ok(());
    }

    // > Verify aggregate signature
    itertools::process_results(
        indices.iter().copied().map(|validator_index| {
            accessors::public_key(state, validator_index)?
                .decompress()
                .map_err(AnyhowError::new)
        }),
        |public_keys| {
            verifier.verify_aggregate(
                indexed_attestation.data.signing_root(config, state),
                indexed_attestation.signature,
                public_keys,
                SignatureKind::Attestation,
            )
        },
    )?
}
