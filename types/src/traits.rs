use bls::{CachedPublicKey, PublicKeyBytes, SignatureBytes};
use ethereum_types::{H256, H32};

/// Computes hash tree roots as defined by [SSZ Merkleization].
///
/// [SSZ Merkleization]: https://github.com/ethereum/consensus-specs/blob/v1.4.0/ssz/simple-serialize.md#merkleization
pub trait SszHash {
    fn hash_tree_root(&self) -> H256;
}

impl SszHash for u64 {
    fn hash_tree_root(&self) -> H256 {
        hashing::uint_chunk(*self)
    }
}

impl SszHash for bool {
    fn hash_tree_root(&self) -> H256 {
        hashing::uint_chunk((*self).into())
    }
}

impl SszHash for H256 {
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszHash for H32 {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..H32::len_bytes()].copy_from_slice(self.as_bytes());
        chunk
    }
}

impl SszHash for PublicKeyBytes {
    fn hash_tree_root(&self) -> H256 {
        hashing::merkleize(hashing::pack_bytes(self.as_bytes()), 1)
    }
}

impl SszHash for SignatureBytes {
    fn hash_tree_root(&self) -> H256 {
        hashing::merkleize(hashing::pack_bytes(self.as_bytes()), 2)
    }
}

impl SszHash for CachedPublicKey {
    fn hash_tree_root(&self) -> H256 {
        self.as_bytes().hash_tree_root()
    }
}

/// Root of a container with the given field roots.
#[must_use]
pub fn container_root(field_roots: &[H256]) -> H256 {
    hashing::merkleize(
        field_roots.iter().copied(),
        hashing::depth_for(field_roots.len()),
    )
}

/// Root of a list of composite values with at most `limit` elements.
pub fn list_root<'elements, T: SszHash + 'elements>(
    elements: impl IntoIterator<Item = &'elements T>,
    limit: usize,
) -> H256 {
    let roots = elements
        .into_iter()
        .map(SszHash::hash_tree_root)
        .collect::<Vec<_>>();

    let length = roots.len();

    hashing::mix_in_length(hashing::merkleize(roots, hashing::depth_for(limit)), length)
}

/// Root of a list of `u64`s with at most `limit` elements.
///
/// Basic values are packed into chunks before Merkleization.
pub fn uint_list_root(values: impl IntoIterator<Item = u64>, limit: usize) -> H256 {
    let bytes = values
        .into_iter()
        .flat_map(u64::to_le_bytes)
        .collect::<Vec<_>>();

    let length = bytes.len() / size_of::<u64>();
    let chunk_limit = (limit * size_of::<u64>()).div_ceil(H256::len_bytes());
    let root = hashing::merkleize(hashing::pack_bytes(&bytes), hashing::depth_for(chunk_limit));

    hashing::mix_in_length(root, length)
}

/// Root of a vector of exactly `length` roots.
pub fn root_vector_root(roots: impl IntoIterator<Item = H256>, length: usize) -> H256 {
    hashing::merkleize(roots, hashing::depth_for(length))
}
