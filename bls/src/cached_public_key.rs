use core::hash::{Hash, Hasher};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::{error::Error, public_key::PublicKey, public_key_bytes::PublicKeyBytes};

/// Compressed public key that remembers the result of decompressing it.
///
/// Decompression is by far the most expensive part of aggregating public keys of a committee.
#[derive(Clone, Default, Debug, Deserialize, Serialize)]
#[serde(from = "PublicKeyBytes", into = "PublicKeyBytes")]
pub struct CachedPublicKey {
    bytes: PublicKeyBytes,
    decompressed: OnceCell<PublicKey>,
}

impl PartialEq for CachedPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for CachedPublicKey {}

impl Hash for CachedPublicKey {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.bytes.hash(hasher);
    }
}

impl From<PublicKeyBytes> for CachedPublicKey {
    #[inline]
    fn from(bytes: PublicKeyBytes) -> Self {
        Self {
            bytes,
            decompressed: OnceCell::new(),
        }
    }
}

impl From<PublicKey> for CachedPublicKey {
    #[inline]
    fn from(public_key: PublicKey) -> Self {
        Self {
            bytes: public_key.into(),
            decompressed: OnceCell::with_value(public_key),
        }
    }
}

impl From<CachedPublicKey> for PublicKeyBytes {
    #[inline]
    fn from(cached: CachedPublicKey) -> Self {
        cached.bytes
    }
}

impl CachedPublicKey {
    #[must_use]
    pub const fn as_bytes(&self) -> &PublicKeyBytes {
        &self.bytes
    }

    #[inline]
    pub fn decompress(&self) -> Result<&PublicKey, Error> {
        self.decompressed
            .get_or_try_init(|| PublicKey::try_from(self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use crate::{secret_key::SecretKey, secret_key_bytes::SecretKeyBytes, traits::SecretKey as _};

    use super::*;

    #[test]
    fn decompress_returns_original_public_key() -> Result<(), Error> {
        let public_key = SecretKey::try_from(SecretKeyBytes::from([9; 32]))?.to_public_key();
        let cached = CachedPublicKey::from(PublicKeyBytes::from(public_key));

        assert_eq!(cached.decompress()?, &public_key);
        assert_eq!(cached.decompress()?, &public_key);

        Ok(())
    }

    #[test]
    fn decompress_fails_on_invalid_bytes() {
        let cached = CachedPublicKey::from(PublicKeyBytes::repeat_byte(0xff));

        assert_eq!(cached.decompress(), Err(Error::InvalidPublicKey));
    }
}
