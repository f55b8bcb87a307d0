//! SHA-256 helpers and the Merkleization primitives used for hash tree roots.
//!
//! Functions named `hash_<sizes>` hash the concatenation of their arguments, where each number is
//! the size of an argument in bits. Integers are encoded in little-endian order.

use ethereum_types::H256;
use once_cell::sync::Lazy;
use sha2::{Digest as _, Sha256};

/// Depth of the deepest tree this crate can pad with zero subtrees.
///
/// `2^40` is the validator registry limit, which is the largest list in a beacon state.
pub const MAX_DEPTH: usize = 40;

static ZERO_HASHES: Lazy<[H256; MAX_DEPTH + 1]> = Lazy::new(|| {
    let mut hashes = [H256::zero(); MAX_DEPTH + 1];

    for depth in 1..=MAX_DEPTH {
        hashes[depth] = hash_256_256(hashes[depth - 1], hashes[depth - 1]);
    }

    hashes
});

/// Root of a tree of depth `depth` with all leaves set to zero.
#[must_use]
pub fn zero_hash(depth: usize) -> H256 {
    ZERO_HASHES[depth]
}

#[inline]
#[must_use]
pub fn hash_64(value: u64) -> H256 {
    finish(Sha256::new().chain_update(value.to_le_bytes()))
}

#[inline]
#[must_use]
pub fn hash_256(bytes: H256) -> H256 {
    finish(Sha256::new().chain_update(bytes))
}

#[inline]
#[must_use]
pub fn hash_256_8(a: H256, b: u8) -> H256 {
    finish(Sha256::new().chain_update(a).chain_update([b]))
}

#[inline]
#[must_use]
pub fn hash_256_64(a: H256, b: u64) -> H256 {
    finish(Sha256::new().chain_update(a).chain_update(b.to_le_bytes()))
}

#[inline]
#[must_use]
pub fn hash_256_8_32(a: H256, b: u8, c: u32) -> H256 {
    finish(
        Sha256::new()
            .chain_update(a)
            .chain_update([b])
            .chain_update(c.to_le_bytes()),
    )
}

#[inline]
#[must_use]
pub fn hash_32_64_256(a: [u8; 4], b: u64, c: H256) -> H256 {
    finish(
        Sha256::new()
            .chain_update(a)
            .chain_update(b.to_le_bytes())
            .chain_update(c),
    )
}

#[inline]
#[must_use]
pub fn hash_384(bytes: &[u8; 48]) -> H256 {
    finish(Sha256::new().chain_update(bytes))
}

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    finish(Sha256::new().chain_update(left).chain_update(right))
}

/// Packs a `u64` into a single chunk the way SSZ serializes basic values.
#[inline]
#[must_use]
pub fn uint_chunk(value: u64) -> H256 {
    let mut chunk = H256::zero();
    chunk[..size_of::<u64>()].copy_from_slice(&value.to_le_bytes());
    chunk
}

/// Packs bytes into chunks, padding the last one with zeros.
#[must_use]
pub fn pack_bytes(bytes: &[u8]) -> Vec<H256> {
    bytes
        .chunks(H256::len_bytes())
        .map(|bytes| {
            let mut chunk = H256::zero();
            chunk[..bytes.len()].copy_from_slice(bytes);
            chunk
        })
        .collect()
}

/// Smallest depth of a tree that can hold `count` leaves.
#[must_use]
pub const fn depth_for(count: usize) -> usize {
    count.next_power_of_two().trailing_zeros() as usize
}

/// Computes the root of a tree of depth `depth` whose leftmost leaves are `chunks`.
///
/// Missing leaves are zero. Only the subtrees that contain chunks are hashed.
/// Passing more than `2^depth` chunks is a bug in the caller.
#[must_use]
pub fn merkleize(chunks: impl IntoIterator<Item = H256>, depth: usize) -> H256 {
    let mut layer = chunks.into_iter().collect::<Vec<_>>();

    assert!(depth <= MAX_DEPTH);
    assert!(depth_for(layer.len()) <= depth);

    if layer.is_empty() {
        return zero_hash(depth);
    }

    for height in 0..depth {
        if layer.len() % 2 == 1 {
            layer.push(zero_hash(height));
        }

        layer = layer
            .chunks_exact(2)
            .map(|pair| hash_256_256(pair[0], pair[1]))
            .collect();
    }

    layer[0]
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let length = u64::try_from(length).expect("lengths of in-memory lists fit in u64");
    hash_256_256(root, uint_chunk(length))
}

fn finish(hasher: Sha256) -> H256 {
    H256(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use itertools::Itertools as _;
    use test_case::test_case;

    use super::*;

    #[test]
    fn higher_zero_hashes_are_calculated_from_lower_ones() {
        for (lower, higher) in ZERO_HASHES.iter().copied().tuple_windows() {
            assert_eq!(hash_256_256(lower, lower), higher);
        }
    }

    #[test]
    fn zero_hash_at_depth_1_matches_known_value() {
        assert_eq!(
            zero_hash(1),
            H256(hex!(
                "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
            )),
        );
    }

    #[test]
    fn hash_of_empty_input_matches_known_value() {
        assert_eq!(
            finish(Sha256::new()),
            H256(hex!(
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
            )),
        );
    }

    #[test_case(0 => 0)]
    #[test_case(1 => 0)]
    #[test_case(2 => 1)]
    #[test_case(3 => 2)]
    #[test_case(8 => 3)]
    #[test_case(9 => 4)]
    fn depth_for_rounds_up(count: usize) -> usize {
        depth_for(count)
    }

    #[test]
    fn merkleize_pads_with_zero_subtrees() {
        let a = H256::repeat_byte(1);
        let b = H256::repeat_byte(2);
        let c = H256::repeat_byte(3);

        let expected = hash_256_256(
            hash_256_256(hash_256_256(a, b), hash_256_256(c, H256::zero())),
            zero_hash(2),
        );

        assert_eq!(merkleize([a, b, c], 3), expected);
    }

    #[test]
    fn merkleize_of_single_chunk_at_depth_0_is_the_chunk() {
        let chunk = H256::repeat_byte(7);
        assert_eq!(merkleize([chunk], 0), chunk);
    }

    #[test]
    fn merkleize_of_nothing_is_a_zero_hash() {
        assert_eq!(merkleize([], 5), zero_hash(5));
    }

    #[test]
    fn pack_bytes_pads_last_chunk() {
        let chunks = pack_bytes(&[0xff; 33]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], H256::repeat_byte(0xff));
        assert_eq!(chunks[1][0], 0xff);
        assert_eq!(chunks[1][1..], [0; 31]);
    }
}
