//! Phase 0 slot processing and block header processing.
//!
//! Epoch processing and block operations are not implemented. Justification and finalization
//! reach fork choice from outside the state transition.

pub use crate::{
    block_processing::process_block_header,
    error::Error,
    slot_processing::{process_slot, process_slots},
    state_transition::{state_transition, Phase0, ProcessSlots, StateRootPolicy, StateTransition},
};

mod block_processing;
mod error;
mod slot_processing;
mod state_transition;
