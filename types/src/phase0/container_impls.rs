use ethereum_types::H256;
use typenum::Unsigned as _;

use crate::{
    phase0::{
        beacon_state::BeaconState,
        containers::{
            Attestation, AttestationData, BeaconBlock, BeaconBlockBody, BeaconBlockHeader,
            Checkpoint, Fork, ForkData, IndexedAttestation, SigningData, Validator,
        },
    },
    preset::Preset,
    traits::{self, SszHash},
};

impl Checkpoint {
    /// Stands for the absence of a checkpoint before the first one is justified.
    pub const EMPTY: Self = Self {
        epoch: 0,
        root: H256([0; 32]),
    };

    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl<P: Preset> BeaconBlock<P> {
    #[must_use]
    pub fn to_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: self.body.hash_tree_root(),
        }
    }
}

impl<P: Preset> SszHash for Attestation<P> {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            self.aggregation_bits.hash_tree_root(),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for AttestationData {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            self.slot.hash_tree_root(),
            self.index.hash_tree_root(),
            self.beacon_block_root,
            self.source.hash_tree_root(),
            self.target.hash_tree_root(),
        ])
    }
}

impl<P: Preset> SszHash for BeaconBlock<P> {
    fn hash_tree_root(&self) -> H256 {
        self.to_header().hash_tree_root()
    }
}

impl<P: Preset> SszHash for BeaconBlockBody<P> {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            self.randao_reveal.hash_tree_root(),
            self.graffiti,
            traits::list_root(&self.attestations, P::MaxAttestations::USIZE),
        ])
    }
}

impl SszHash for BeaconBlockHeader {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            self.slot.hash_tree_root(),
            self.proposer_index.hash_tree_root(),
            self.parent_root,
            self.state_root,
            self.body_root,
        ])
    }
}

impl SszHash for Checkpoint {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[self.epoch.hash_tree_root(), self.root])
    }
}

impl SszHash for Fork {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            self.previous_version.hash_tree_root(),
            self.current_version.hash_tree_root(),
            self.epoch.hash_tree_root(),
        ])
    }
}

impl SszHash for ForkData {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            self.current_version.hash_tree_root(),
            self.genesis_validators_root,
        ])
    }
}

impl SszHash for IndexedAttestation {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            // `MAX_VALIDATORS_PER_COMMITTEE` is the same in all presets.
            traits::uint_list_root(self.attesting_indices.iter().copied(), 2048),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for SigningData {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[self.object_root, self.domain])
    }
}

impl SszHash for Validator {
    fn hash_tree_root(&self) -> H256 {
        traits::container_root(&[
            self.pubkey.hash_tree_root(),
            self.withdrawal_credentials,
            self.effective_balance.hash_tree_root(),
            self.slashed.hash_tree_root(),
            self.activation_eligibility_epoch.hash_tree_root(),
            self.activation_epoch.hash_tree_root(),
            self.exit_epoch.hash_tree_root(),
            self.withdrawable_epoch.hash_tree_root(),
        ])
    }
}

impl<P: Preset> SszHash for BeaconState<P> {
    fn hash_tree_root(&self) -> H256 {
        let registry_limit = P::ValidatorRegistryLimit::USIZE;

        traits::container_root(&[
            // > Versioning
            self.genesis_time.hash_tree_root(),
            self.genesis_validators_root,
            self.slot.hash_tree_root(),
            self.fork.hash_tree_root(),
            // > History
            self.latest_block_header.hash_tree_root(),
            traits::root_vector_root(
                self.block_roots.iter().copied(),
                P::SlotsPerHistoricalRoot::USIZE,
            ),
            traits::root_vector_root(
                self.state_roots.iter().copied(),
                P::SlotsPerHistoricalRoot::USIZE,
            ),
            // > Registry
            traits::list_root(&self.validators, registry_limit),
            traits::uint_list_root(self.balances.iter().copied(), registry_limit),
            // > Randomness
            traits::root_vector_root(
                self.randao_mixes.iter().copied(),
                P::EpochsPerHistoricalVector::USIZE,
            ),
            // > Finality
            self.previous_justified_checkpoint.hash_tree_root(),
            self.current_justified_checkpoint.hash_tree_root(),
            self.finalized_checkpoint.hash_tree_root(),
        ])
    }
}
