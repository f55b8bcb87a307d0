use bls::{traits::Signature as _, PublicKey, Signature};
use derivative::Derivative;
use types::{collections::BitList, phase0::primitives::H256, preset::Preset};

/// Aggregates signatures of attestations with the same data so they can be verified at once.
///
/// Only attestations with disjoint participants can be folded together. Overlapping
/// attestations would count the shared signatures twice.
#[derive(Derivative)]
#[derivative(Default(bound = ""))]
pub struct AggregateVerifier<P: Preset> {
    aggregation_bits: Option<BitList<P::MaxValidatorsPerCommittee>>,
    public_keys: Vec<PublicKey>,
    signature: Option<Signature>,
}

impl<P: Preset> AggregateVerifier<P> {
    /// Returns `false` without modifying `self` if `aggregation_bits` intersect the bits already
    /// folded.
    pub fn add(
        &mut self,
        aggregation_bits: &BitList<P::MaxValidatorsPerCommittee>,
        public_key: PublicKey,
        signature: Signature,
    ) -> bool {
        match &mut self.aggregation_bits {
            Some(folded) if folded.intersects(aggregation_bits) => return false,
            Some(folded) => folded.union_in_place(aggregation_bits),
            None => self.aggregation_bits = Some(aggregation_bits.clone()),
        }

        self.public_keys.push(public_key);

        match &mut self.signature {
            Some(aggregate) => aggregate.aggregate_in_place(signature),
            None => self.signature = Some(signature),
        }

        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.public_keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.public_keys.is_empty()
    }

    /// An empty verifier never verifies successfully.
    #[must_use]
    pub fn verify(&self, signing_root: H256) -> bool {
        self.signature.is_some_and(|signature| {
            signature.fast_aggregate_verify(signing_root, &self.public_keys)
        })
    }
}
