//! Verification of attestations before they reach fork choice.
//!
//! Attestations pass through a pipeline of stages:
//! - [sanity checks](sanity) that only need the attestation and the current epoch;
//! - an [unknown-block pool](unknown_block_pool) for attestations voting for blocks that have
//!   not been imported yet;
//! - [state-dependent checks](state_verifier) that resolve committees and public keys;
//! - [batched signature verification](signature_verifier).
//!
//! The last two run on dedicated threads. See [`AttestationVerifier`].

pub use crate::{
    aggregate_verifier::AggregateVerifier,
    attestation_verifier::AttestationVerifier,
    error::Error,
    events::{PipelineEvent, Stage},
    state_verifier::VerifiedAttestation,
    verifier_config::VerifierConfig,
};

pub mod sanity;
pub mod signature_verifier;
pub mod state_verifier;
pub mod unknown_block_pool;

mod aggregate_verifier;
mod attestation_verifier;
mod error;
mod events;
mod verifier_config;
