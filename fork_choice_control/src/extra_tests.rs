use anyhow::{anyhow, Result};
use clock::Tick;
use fork_choice_store::StoreView as _;
use itertools::Itertools as _;
use types::{
    phase0::{containers::Checkpoint, primitives::H256},
    traits::SszHash as _,
};

use crate::{helpers::Context, messages::AttestationVerifierMessage};

#[test]
fn anchor_is_published_as_first_head() {
    let mut context = Context::new();
    let genesis_root = context.genesis_root();

    let events = context.head_events();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].block_root, genesis_root);
    assert_eq!(events[0].slot, 0);
}

#[test]
fn block_waiting_for_parent_is_imported_after_parent() {
    let mut context = Context::new();
    let genesis_state = context.genesis_state();
    let (parent, parent_state) = context.empty_block(&genesis_state, 1, H256::zero());
    let (child, _) = context.empty_block(&parent_state, 2, H256::zero());
    let parent_root = parent.hash_tree_root();
    let child_root = child.hash_tree_root();

    context.head_events();
    context.on_slot(2);
    context.on_block(&child);

    assert!(!context.snapshot().contains_block(child_root));
    assert_eq!(context.head_events(), []);

    context.on_block(&parent);

    assert!(context.snapshot().contains_block(child_root));
    assert_eq!(context.last_head(), Some(child_root));

    let imported = context
        .verifier_messages()
        .into_iter()
        .filter(|message| matches!(message, AttestationVerifierMessage::BlockImported(_)))
        .collect_vec();

    assert_eq!(
        imported,
        [
            AttestationVerifierMessage::BlockImported(parent_root),
            AttestationVerifierMessage::BlockImported(child_root),
        ],
    );
}

#[test]
fn block_from_future_is_imported_at_its_slot() {
    let mut context = Context::new();
    let genesis_state = context.genesis_state();
    let (block, _) = context.empty_block(&genesis_state, 3, H256::zero());
    let block_root = block.hash_tree_root();

    context.head_events();
    context.on_slot(1);
    context.on_block(&block);

    assert!(!context.snapshot().contains_block(block_root));

    context.on_slot(2);

    assert!(!context.snapshot().contains_block(block_root));

    context.on_slot(3);

    assert!(context.snapshot().contains_block(block_root));
    assert_eq!(context.last_head(), Some(block_root));
    assert!(context
        .verifier_messages()
        .contains(&AttestationVerifierMessage::Slot(3)));
}

#[test]
fn child_of_future_block_is_imported_with_it() {
    let mut context = Context::new();
    let genesis_state = context.genesis_state();
    let (parent, parent_state) = context.empty_block(&genesis_state, 2, H256::zero());
    let (child, _) = context.empty_block(&parent_state, 3, H256::zero());
    let parent_root = parent.hash_tree_root();
    let child_root = child.hash_tree_root();

    context.head_events();
    context.on_slot(1);

    // The parent waits for slot 2. The child waits for the parent.
    context.on_block(&parent);
    context.on_block(&child);

    assert!(!context.snapshot().contains_block(parent_root));

    context.on_slot(3);

    let snapshot = context.snapshot();

    assert!(snapshot.contains_block(parent_root));
    assert!(snapshot.contains_block(child_root));
    assert_eq!(context.last_head(), Some(child_root));
}

#[test]
fn attestations_move_head_between_siblings() {
    let mut context = Context::new();
    let genesis_state = context.genesis_state();
    let (first, first_state) = context.empty_block(&genesis_state, 1, H256::zero());
    let (second, second_state) = context.empty_block(&genesis_state, 2, H256::zero());
    let first_root = first.hash_tree_root();
    let second_root = second.hash_tree_root();

    let (smaller, smaller_state, smaller_slot, greater) = if first_root < second_root {
        (first_root, first_state, 1, second_root)
    } else {
        (second_root, second_state, 2, first_root)
    };

    context.on_slot(3);
    context.on_block(&first);
    context.on_block(&second);

    // Without votes the sibling with the greater root wins.
    assert_eq!(context.last_head(), Some(greater));

    let attestation = context.attestation_for_head_of(&smaller_state, smaller_slot);

    context.on_attestation(attestation);

    assert_eq!(context.last_head(), Some(smaller));
}

#[test]
fn early_attestation_is_applied_on_next_tick() {
    let mut context = Context::new();
    let genesis_state = context.genesis_state();
    let (first, first_state) = context.empty_block(&genesis_state, 1, H256::zero());
    let (second, second_state) = context.empty_block(&genesis_state, 1, H256::repeat_byte(1));
    let first_root = first.hash_tree_root();
    let second_root = second.hash_tree_root();

    let (smaller, smaller_state, greater) = if first_root < second_root {
        (first_root, first_state, second_root)
    } else {
        (second_root, second_state, first_root)
    };

    context.on_slot(1);
    context.on_block(&first);
    context.on_block(&second);

    assert_eq!(context.last_head(), Some(greater));

    // Attestations from slot 1 can only be considered from slot 2 onward.
    let attestation = context.attestation_for_head_of(&smaller_state, 1);

    context.on_attestation(attestation);

    assert_eq!(context.head_events(), []);

    context.on_slot(2);

    assert_eq!(context.last_head(), Some(smaller));
}

#[test]
fn attestation_for_unknown_block_is_applied_after_import() {
    let mut context = Context::new();
    let genesis_state = context.genesis_state();
    let (first, first_state) = context.empty_block(&genesis_state, 1, H256::zero());
    let (second, second_state) = context.empty_block(&genesis_state, 1, H256::repeat_byte(1));
    let first_root = first.hash_tree_root();
    let second_root = second.hash_tree_root();

    let (smaller_block, smaller_state, greater_block) = if first_root < second_root {
        (first, first_state, second)
    } else {
        (second, second_state, first)
    };

    let smaller = smaller_block.hash_tree_root();

    context.on_slot(2);
    context.on_block(&greater_block);
    context.head_events();

    let attestation = context.attestation_for_head_of(&smaller_state, 1);

    context.on_attestation(attestation);

    assert_eq!(context.head_events(), []);

    context.on_block(&smaller_block);

    assert_eq!(context.last_head(), Some(smaller));
}

#[test]
fn justified_checkpoint_advance_discards_votes() {
    let mut context = Context::new();
    let genesis_root = context.genesis_root();
    let genesis_state = context.genesis_state();
    let (first, first_state) = context.empty_block(&genesis_state, 1, H256::zero());
    let (second, second_state) = context.empty_block(&genesis_state, 1, H256::repeat_byte(1));
    let first_root = first.hash_tree_root();
    let second_root = second.hash_tree_root();

    let (smaller, smaller_state, greater) = if first_root < second_root {
        (first_root, first_state, second_root)
    } else {
        (second_root, second_state, first_root)
    };

    context.on_slot(2);
    context.on_block(&first);
    context.on_block(&second);

    let attestation = context.attestation_for_head_of(&smaller_state, 1);

    context.on_attestation(attestation);

    assert_eq!(context.last_head(), Some(smaller));

    let voters = context
        .snapshot()
        .latest_messages()
        .iter()
        .map(|(validator_index, _)| validator_index)
        .collect_vec();

    assert_eq!(voters.len(), 1);

    context.on_justified_checkpoint(Checkpoint {
        epoch: 1,
        root: genesis_root,
    });

    assert_eq!(context.last_head(), Some(greater));

    let snapshot = context.snapshot();

    assert!(snapshot.latest_messages().is_empty());
    assert_eq!(snapshot.latest_message(voters[0]), None);

    // Checkpoints that are not newer are ignored.
    context.on_justified_checkpoint(Checkpoint {
        epoch: 1,
        root: smaller,
    });

    assert_eq!(context.head_events(), []);
}

#[test]
fn slot_ticks_import_block_from_future() -> Result<()> {
    let mut context = Context::new();
    let genesis_state = context.genesis_state();
    let (block, _) = context.empty_block(&genesis_state, 3, H256::zero());
    let block_root = block.hash_tree_root();

    context.head_events();
    context.on_block(&block);

    assert!(!context.snapshot().contains_block(block_root));

    context.run_ticks((1..=3).map(|slot| Ok(Tick::start_of_slot(slot))))?;

    assert_eq!(context.snapshot().current_slot(), 3);
    assert!(context.snapshot().contains_block(block_root));
    assert_eq!(context.last_head(), Some(block_root));

    Ok(())
}

#[test]
fn tick_driver_stops_at_first_clock_error() {
    let mut context = Context::new();

    let ticks = [
        Ok(Tick::start_of_slot(1)),
        Err(anyhow!("clock failed")),
        Ok(Tick::start_of_slot(5)),
    ];

    context
        .run_ticks(ticks)
        .expect_err("clock error should be returned");

    assert_eq!(context.snapshot().current_slot(), 1);

    context.head_events();
}
