//! An implementation of the [phase 0 Fork Choice specification] with transactional updates.
//!
//! The committed [`Store`] is only ever replaced as a whole. Changes are staged in a [`StoreTx`]
//! and published by [`StoreTx::commit`], so readers holding a snapshot never observe a partially
//! applied block or attestation.
//!
//! [phase 0 Fork Choice specification]: https://github.com/ethereum/consensus-specs/blob/v0.12.3/specs/phase0/fork-choice.md

pub use crate::{
    error::Error,
    latest_messages::LatestMessages,
    lmd_ghost::{ancestor, get_head},
    store::{Store, StoreView},
    store_config::StoreConfig,
    transaction::{BlockOutcome, StoreTx, TransactionalStore},
};

mod error;
mod latest_messages;
mod lmd_ghost;
mod store;
mod store_config;
mod transaction;
