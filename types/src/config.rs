use core::{num::NonZeroU64, time::Duration};
use std::{borrow::Cow, collections::BTreeMap};

use hex_literal::hex;
use nonzero_ext::nonzero;
use serde::{de::IgnoredAny, Deserialize, Serialize};

use crate::{
    phase0::primitives::{Epoch, UnixSeconds, Version, H32},
    preset::PresetName,
};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/configs).
///
/// Standard configuration files contain many more variables. They are collected in
/// [`Config.unknown`] so that such files can be loaded as they are.
///
/// [`Config.unknown`]: Config#structfield.unknown
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Genesis
    pub genesis_delay: u64,
    pub genesis_fork_version: Version,
    pub min_genesis_time: UnixSeconds,

    // Time parameters
    pub seconds_per_slot: NonZeroU64,

    // Later phases and other unknown variables
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, IgnoredAny>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            //
            // Use `default` as the default `config_name` and override it in `Config::mainnet`.
            config_name: Cow::Borrowed("default"),
            preset_base: PresetName::Mainnet,

            // Genesis
            genesis_delay: 604_800,
            genesis_fork_version: H32(hex!("00000000")),
            min_genesis_time: 0,

            // Time parameters
            seconds_per_slot: nonzero!(12_u64),

            // Later phases and other unknown variables
            unknown: BTreeMap::new(),
        }
    }
}

impl Config {
    /// [Mainnet configuration](https://github.com/eth-clients/mainnet/blob/978f1794eada6f85bee76e4d2d5959a5fb8e0cc5/metadata/config.yaml).
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("mainnet"),

            // Genesis
            min_genesis_time: 1_606_824_000,

            ..Self::default()
        }
    }

    /// [Minimal configuration](https://github.com/ethereum/consensus-specs/blob/aac851f860fa384916f62027b2dbe3318a354c5b/configs/minimal.yaml).
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,

            // Genesis
            genesis_delay: 300,
            genesis_fork_version: H32(hex!("00000001")),
            min_genesis_time: 1_578_009_600,

            // Time parameters
            seconds_per_slot: nonzero!(6_u64),

            ..Self::default()
        }
    }

    #[must_use]
    pub const fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot.get())
    }

    /// Fork version in effect at `epoch`.
    ///
    /// Only phase 0 is supported, so this is always the genesis fork version.
    #[must_use]
    pub const fn version_at_epoch(&self, _epoch: Epoch) -> Version {
        self.genesis_fork_version
    }
}
