use core::{fmt::Debug, hash::Hash, num::NonZeroU64};

use nonzero_ext::nonzero;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{Display, EnumString};
use typenum::{NonZero, Unsigned, U1099511627776, U128, U2048, U32, U64, U65536, U8, U8192};

use crate::{config::Config, phase0::primitives::Gwei};

/// Compile-time configuration variables.
///
/// Only the variables used by fork choice, committee computation and slot processing are
/// included. See [presets in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets).
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    type EpochsPerHistoricalVector: Unsigned + NonZero + Debug + Send + Sync;
    type MaxAttestations: Unsigned + NonZero + Debug + Send + Sync;
    type MaxValidatorsPerCommittee: Unsigned + NonZero + Debug + Send + Sync;
    type SlotsPerEpoch: Unsigned + NonZero + Debug + Send + Sync;
    type SlotsPerHistoricalRoot: Unsigned + NonZero + Debug + Send + Sync;
    type ValidatorRegistryLimit: Unsigned + NonZero + Debug + Send + Sync;

    // Meta
    const NAME: PresetName;

    // Phase 0
    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(64_u64);
    const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
    const MIN_SEED_LOOKAHEAD: u64 = 1;
    const SHUFFLE_ROUND_COUNT: u8 = 90;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(128_u64);

    // Fork choice
    const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64 = 8;

    /// Returns the default configuration associated with a preset.
    ///
    /// This should only be used in tests and benchmarks.
    #[must_use]
    fn default_config() -> Config {
        Self::NAME.default_config()
    }
}

/// [Mainnet preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/mainnet).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    type EpochsPerHistoricalVector = U65536;
    type MaxAttestations = U128;
    type MaxValidatorsPerCommittee = U2048;
    type SlotsPerEpoch = U32;
    type SlotsPerHistoricalRoot = U8192;
    type ValidatorRegistryLimit = U1099511627776;

    const NAME: PresetName = PresetName::Mainnet;
}

/// [Minimal preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/minimal).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    type EpochsPerHistoricalVector = U64;
    type MaxAttestations = <Mainnet as Preset>::MaxAttestations;
    type MaxValidatorsPerCommittee = <Mainnet as Preset>::MaxValidatorsPerCommittee;
    type SlotsPerEpoch = U8;
    type SlotsPerHistoricalRoot = U64;
    type ValidatorRegistryLimit = <Mainnet as Preset>::ValidatorRegistryLimit;

    const NAME: PresetName = PresetName::Minimal;

    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(4_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 10;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(4_u64);

    const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64 = 2;
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Display, EnumString, DeserializeFromStr, SerializeDisplay,
)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(test, derive(enum_iterator::Sequence))]
pub enum PresetName {
    Mainnet,
    Minimal,
}

impl PresetName {
    fn default_config(self) -> Config {
        match self {
            Self::Mainnet => Config::mainnet(),
            Self::Minimal => Config::minimal(),
        }
    }
}
