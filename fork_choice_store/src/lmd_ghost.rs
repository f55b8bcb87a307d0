//! [LMD GHOST] head selection.
//!
//! [LMD GHOST]: https://github.com/ethereum/consensus-specs/blob/v0.12.3/specs/phase0/fork-choice.md#get_head

use std::collections::HashMap;

use itertools::Itertools as _;
use types::{
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

use crate::{error::Error, latest_messages::LatestMessages, store::StoreView};

/// [`get_ancestor`](https://github.com/ethereum/consensus-specs/blob/v0.12.3/specs/phase0/fork-choice.md#get_ancestor)
///
/// Returns `None` if the walk reaches a block that is not in the store.
/// The walk is bounded by [`StoreConfig::max_ancestor_depth`].
///
/// [`StoreConfig::max_ancestor_depth`]: crate::StoreConfig::max_ancestor_depth
pub fn ancestor<P: Preset>(
    store: &(impl StoreView<P> + ?Sized),
    root: H256,
    slot: Slot,
) -> Result<Option<H256>, Error> {
    let max_depth = store.store_config().max_ancestor_depth;
    let mut current = root;

    for _ in 0..=max_depth {
        let Some(block) = store.block(current) else {
            return Ok(None);
        };

        // Blocks older than `slot` mean `slot` was empty.
        if block.slot <= slot {
            return Ok(Some(current));
        }

        current = block.parent_root;
    }

    Err(Error::AncestorDepthExceeded { root, max_depth })
}

/// Starts at the justified block and repeatedly descends to the child with the most votes.
/// Ties are broken in favor of the numerically greater root.
pub fn get_head<P: Preset>(
    store: &(impl StoreView<P> + ?Sized),
    latest_messages: &LatestMessages,
) -> Result<H256, Error> {
    let justified_checkpoint = store.justified_checkpoint();

    let mut head = if justified_checkpoint.is_empty() || justified_checkpoint.root.is_zero() {
        store.anchor_root()
    } else {
        justified_checkpoint.root
    };

    let votes = latest_messages
        .iter()
        .map(|(_, message)| message.root)
        .counts();

    loop {
        let weighted_children = store.children(head).into_iter().map(|child| {
            let weight = vote_count(store, &votes, child)?;
            Ok::<_, Error>((weight, child))
        });

        let best = itertools::process_results(weighted_children, |children| children.max())?;

        match best {
            Some((_, child)) => head = child,
            None => return Ok(head),
        }
    }
}

fn vote_count<P: Preset>(
    store: &(impl StoreView<P> + ?Sized),
    votes: &HashMap<H256, usize>,
    block_root: H256,
) -> Result<usize, Error> {
    let block_slot = store
        .block(block_root)
        .expect("children of blocks in the store are also in the store")
        .slot;

    votes
        .iter()
        .map(|(vote_root, count)| {
            let supports = ancestor(store, *vote_root, block_slot)? == Some(block_root);
            Ok(if supports { *count } else { 0 })
        })
        .sum()
}
