use core::{marker::PhantomData, num::NonZeroU64};

use bls::{traits::SecretKey as _, CachedPublicKey, SecretKey, SecretKeyBytes};
use hex_literal::hex;
use im::Vector;
use num_bigint::BigUint;
use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{BLS_WITHDRAWAL_PREFIX, FAR_FUTURE_EPOCH, GENESIS_EPOCH, GENESIS_SLOT},
        containers::{
            BeaconBlock, BeaconBlockBody, BeaconBlockHeader, Checkpoint, Fork, Validator,
        },
        primitives::{UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
    traits::{self, SszHash as _},
};

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#create-genesis-state>
///
/// Used to fill `randao_mixes` the same way `initialize_beacon_state_from_eth1` does.
const QUICK_START_ETH1_BLOCK_HASH: H256 = H256([0x42; 32]);

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
///
/// Encoded in binary to avoid parsing a decimal string at runtime.
const CURVE_ORDER: &[u8] =
    &hex!("73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001");

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#quick-start-genesis>
///
/// Builds the genesis state directly instead of processing deposits.
/// Every validator is active from [`GENESIS_EPOCH`] with the maximum effective balance.
#[must_use]
pub fn quick_start_beacon_state<P: Preset>(
    config: &Config,
    genesis_time: UnixSeconds,
    validator_count: NonZeroU64,
) -> BeaconState<P> {
    let validators = (0..validator_count.get())
        .map(|index| quick_start_validator::<P>(&secret_key(index)))
        .collect::<Vector<_>>();

    let balances = validators
        .iter()
        .map(|validator| validator.effective_balance)
        .collect();

    let genesis_validators_root =
        traits::list_root(&validators, P::ValidatorRegistryLimit::USIZE);

    let fork = Fork {
        previous_version: config.genesis_fork_version,
        current_version: config.genesis_fork_version,
        epoch: GENESIS_EPOCH,
    };

    let latest_block_header = BeaconBlockHeader {
        body_root: BeaconBlockBody::<P>::default().hash_tree_root(),
        ..BeaconBlockHeader::default()
    };

    let historical_roots =
        || core::iter::repeat_n(H256::zero(), P::SlotsPerHistoricalRoot::USIZE).collect();

    let randao_mixes =
        core::iter::repeat_n(QUICK_START_ETH1_BLOCK_HASH, P::EpochsPerHistoricalVector::USIZE)
            .collect();

    BeaconState {
        genesis_time,
        genesis_validators_root,
        slot: GENESIS_SLOT,
        fork,
        latest_block_header,
        block_roots: historical_roots(),
        state_roots: historical_roots(),
        validators,
        balances,
        randao_mixes,
        previous_justified_checkpoint: Checkpoint::default(),
        current_justified_checkpoint: Checkpoint::default(),
        finalized_checkpoint: Checkpoint::default(),
        phantom: PhantomData,
    }
}

/// Block that a quick start genesis state is the post-state of.
#[must_use]
pub fn quick_start_genesis_block<P: Preset>(genesis_state: &BeaconState<P>) -> BeaconBlock<P> {
    BeaconBlock {
        slot: genesis_state.slot,
        state_root: genesis_state.hash_tree_root(),
        ..BeaconBlock::default()
    }
}

/// <https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start#pubkeyprivkey-generation>
#[must_use]
pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let index_hash = hashing::hash_256(validator_index.hash_tree_root());
    let curve_order = BigUint::from_bytes_be(CURVE_ORDER);
    let secret_key_uint = BigUint::from_bytes_le(index_hash.as_bytes()) % &curve_order;
    let unpadded = secret_key_uint.to_bytes_be();
    let mut padded = SecretKeyBytes::default();
    padded.as_mut()[size_of::<SecretKeyBytes>() - unpadded.len()..]
        .copy_from_slice(unpadded.as_slice());
    padded
        .try_into()
        .expect("the algorithm given in the standard should produce valid secret keys")
}

fn quick_start_validator<P: Preset>(secret_key: &SecretKey) -> Validator {
    let pubkey = CachedPublicKey::from(secret_key.to_public_key());

    // > withdrawal_credentials = BLS_WITHDRAWAL_PREFIX + hash(pubkey)[1:]
    let mut withdrawal_credentials = hashing::hash_384(pubkey.as_bytes().as_fixed_bytes());
    withdrawal_credentials[..BLS_WITHDRAWAL_PREFIX.len()].copy_from_slice(BLS_WITHDRAWAL_PREFIX);

    Validator {
        pubkey,
        withdrawal_credentials,
        effective_balance: P::MAX_EFFECTIVE_BALANCE,
        slashed: false,
        activation_eligibility_epoch: GENESIS_EPOCH,
        activation_epoch: GENESIS_EPOCH,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
    }
}
