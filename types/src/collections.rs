use core::{fmt, marker::PhantomData};

use bitvec::{order::Lsb0, vec::BitVec};
use derivative::Derivative;
use ethereum_types::H256;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use typenum::Unsigned;

/// Variable-length bitfield with a maximum length of `N`.
///
/// Serialized the same way as an SSZ `Bitlist`: as a hex string of its bytes followed by a
/// single delimiting bit.
#[derive(Derivative)]
#[derivative(
    Clone(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    Hash(bound = ""),
    Default(bound = "")
)]
pub struct BitList<N> {
    bits: BitVec<u8, Lsb0>,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    phantom: PhantomData<N>,
}

impl<N> fmt::Debug for BitList<N> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("0b")?;

        for bit in &self.bits {
            formatter.write_str(if *bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BitListError {
    #[error("bitlist is longer than its maximum length ({length} > {maximum})")]
    TooLong { length: usize, maximum: usize },
    #[error("bitlist has no delimiting bit")]
    MissingDelimiter,
}

impl<N: Unsigned> BitList<N> {
    pub fn with_length(length: usize) -> Result<Self, BitListError> {
        Self::check_length(length)?;

        Ok(Self {
            bits: BitVec::repeat(false, length),
            phantom: PhantomData,
        })
    }

    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Result<Self, BitListError> {
        let bits = bits.into_iter().collect::<BitVec<u8, Lsb0>>();

        Self::check_length(bits.len())?;

        Ok(Self {
            bits,
            phantom: PhantomData,
        })
    }

    #[must_use]
    pub fn hash_tree_root(&self) -> H256 {
        let chunk_count = N::USIZE.div_ceil(256);
        let mut bits = self.bits.clone();
        bits.set_uninitialized(false);
        let chunks = hashing::pack_bytes(bits.as_raw_slice());
        let root = hashing::merkleize(chunks, hashing::depth_for(chunk_count));
        hashing::mix_in_length(root, self.len())
    }

    fn check_length(length: usize) -> Result<(), BitListError> {
        let maximum = N::USIZE;

        if length > maximum {
            return Err(BitListError::TooLong { length, maximum });
        }

        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).is_some_and(|bit| *bit)
    }

    /// Sets the bit at `index`.
    ///
    /// Returns `false` if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: bool) -> bool {
        if index < self.bits.len() {
            self.bits.set(index, value);
            return true;
        }

        false
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.bits.any()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().by_vals()
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    /// Returns `true` if both bitlists have a bit set at the same position.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.iter_ones().any(|index| other.get(index))
    }

    /// Sets every bit that is set in `other`.
    ///
    /// Bits of `other` past the length of `self` are ignored.
    pub fn union_in_place(&mut self, other: &Self) {
        for index in other.iter_ones() {
            self.set(index, true);
        }
    }

    fn to_ssz_bytes(&self) -> Vec<u8> {
        let mut bits = self.bits.clone();
        bits.push(true);
        bits.set_uninitialized(false);
        bits.into_vec()
    }
}

impl<N: Unsigned> Serialize for BitList<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = format!("0x{}", hex::encode(self.to_ssz_bytes()));
        encoded.serialize(serializer)
    }
}

impl<'de, N: Unsigned> Deserialize<'de> for BitList<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        let digits = string.strip_prefix("0x").unwrap_or(&string);
        let bytes = hex::decode(digits).map_err(D::Error::custom)?;

        let mut bits = BitVec::<u8, Lsb0>::from_vec(bytes);

        let delimiter = bits
            .last_one()
            .ok_or_else(|| D::Error::custom(BitListError::MissingDelimiter))?;

        bits.truncate(delimiter);

        Self::from_bits(bits).map_err(D::Error::custom)
    }
}
