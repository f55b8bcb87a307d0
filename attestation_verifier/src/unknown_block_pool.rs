//! Attestations voting for blocks that fork choice has not imported yet.

use std::{collections::VecDeque, sync::Arc};

use types::{
    nonstandard::ReceivedAttestation,
    phase0::primitives::{Epoch, H256},
    preset::Preset,
};

pub struct UnknownBlockPool<P: Preset> {
    capacity: usize,
    // Oldest first.
    attestations: VecDeque<Arc<ReceivedAttestation<P>>>,
}

impl<P: Preset> UnknownBlockPool<P> {
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            attestations: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attestations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty()
    }

    /// Parks `attestation` until its block is imported.
    ///
    /// Returns the oldest attestation in the pool if it had to be evicted to make room.
    pub fn insert(
        &mut self,
        attestation: Arc<ReceivedAttestation<P>>,
    ) -> Option<Arc<ReceivedAttestation<P>>> {
        if self.capacity == 0 {
            return Some(attestation);
        }

        let evicted = if self.attestations.len() >= self.capacity {
            self.attestations.pop_front()
        } else {
            None
        };

        self.attestations.push_back(attestation);

        evicted
    }

    /// Removes and returns attestations voting for `block_root` in the order they were inserted.
    pub fn take_for_block(&mut self, block_root: H256) -> Vec<Arc<ReceivedAttestation<P>>> {
        self.take_matching(|attestation| attestation.data().beacon_block_root == block_root)
    }

    /// Removes and returns attestations whose target epoch is before `previous_epoch`.
    ///
    /// Their blocks can no longer be imported in time for the attestations to count.
    pub fn prune(&mut self, previous_epoch: Epoch) -> Vec<Arc<ReceivedAttestation<P>>> {
        self.take_matching(|attestation| attestation.data().target.epoch < previous_epoch)
    }

    fn take_matching(
        &mut self,
        predicate: impl Fn(&ReceivedAttestation<P>) -> bool,
    ) -> Vec<Arc<ReceivedAttestation<P>>> {
        let (matching, remaining): (Vec<_>, Vec<_>) = core::mem::take(&mut self.attestations)
            .into_iter()
            .partition(|attestation| predicate(attestation));

        self.attestations = remaining.into();

        matching
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools as _;
    use types::{
        nonstandard::AttestationOrigin,
        phase0::containers::{Attestation, AttestationData, Checkpoint},
        preset::Minimal,
    };

    use super::*;

    fn attestation(
        arrival: u64,
        block_root: H256,
        target_epoch: Epoch,
    ) -> Arc<ReceivedAttestation<Minimal>> {
        let attestation = Attestation {
            data: AttestationData {
                beacon_block_root: block_root,
                target: Checkpoint {
                    epoch: target_epoch,
                    root: block_root,
                },
                ..AttestationData::default()
            },
            ..Attestation::default()
        };

        Arc::new(ReceivedAttestation::new(
            attestation,
            AttestationOrigin::Test,
            arrival,
        ))
    }

    fn arrivals(attestations: &[Arc<ReceivedAttestation<Minimal>>]) -> Vec<u64> {
        attestations
            .iter()
            .map(|attestation| attestation.arrival)
            .collect_vec()
    }

    #[test]
    fn releases_attestations_for_imported_block_in_insertion_order() {
        let mut pool = UnknownBlockPool::new(8);

        for (arrival, byte) in [(0, 1), (1, 2), (2, 1), (3, 1)] {
            assert_eq!(pool.insert(attestation(arrival, H256::repeat_byte(byte), 0)), None);
        }

        let released = pool.take_for_block(H256::repeat_byte(1));

        assert_eq!(arrivals(&released), [0, 2, 3]);
        assert_eq!(pool.len(), 1);
        assert!(pool.take_for_block(H256::repeat_byte(1)).is_empty());
    }

    #[test]
    fn evicts_oldest_attestation_when_full() {
        let mut pool = UnknownBlockPool::new(2);

        assert_eq!(pool.insert(attestation(0, H256::repeat_byte(1), 0)), None);
        assert_eq!(pool.insert(attestation(1, H256::repeat_byte(2), 0)), None);

        let evicted = pool
            .insert(attestation(2, H256::repeat_byte(3), 0))
            .expect("pool is full");

        assert_eq!(evicted.arrival, 0);
        assert_eq!(pool.len(), 2);
        assert!(pool.take_for_block(H256::repeat_byte(1)).is_empty());
    }

    #[test]
    fn pool_without_capacity_rejects_everything() {
        let mut pool = UnknownBlockPool::new(0);
        let rejected = pool.insert(attestation(0, H256::repeat_byte(1), 0));

        assert_eq!(rejected.map(|attestation| attestation.arrival), Some(0));
        assert!(pool.is_empty());
    }

    #[test]
    fn prunes_attestations_with_targets_before_previous_epoch() {
        let mut pool = UnknownBlockPool::new(8);

        for (arrival, target_epoch) in [(0, 3), (1, 1), (2, 2), (3, 0)] {
            pool.insert(attestation(arrival, H256::repeat_byte(1), target_epoch));
        }

        let pruned = pool.prune(2);

        assert_eq!(arrivals(&pruned), [1, 3]);
        assert_eq!(arrivals(&pool.take_for_block(H256::repeat_byte(1))), [0, 2]);
    }
}
