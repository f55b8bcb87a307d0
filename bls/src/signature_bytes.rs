use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;

use crate::{consts::SIGNATURE_SIZE, signature::Signature};

construct_fixed_hash! {
    /// Compressed signature as it appears in containers.
    pub struct SignatureBytes(SIGNATURE_SIZE);
}

impl_fixed_hash_serde!(SignatureBytes, SIGNATURE_SIZE);

impl From<Signature> for SignatureBytes {
    #[inline]
    fn from(signature: Signature) -> Self {
        Self(signature.as_raw().compress())
    }
}

impl SignatureBytes {
    /// Compressed encoding of the point at infinity.
    ///
    /// This is the signature of an empty aggregate.
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::zero();
        bytes.as_mut()[0] = 0xc0;
        bytes
    }
}
