use blst::min_pk::SecretKey as RawSecretKey;
use derive_more::Debug;

use crate::{
    consts::DOMAIN_SEPARATION_TAG, error::Error, public_key::PublicKey,
    secret_key_bytes::SecretKeyBytes, signature::Signature, traits::SecretKey as SecretKeyTrait,
};

// `RawSecretKey` zeroizes itself on drop.
#[derive(Debug)]
// Inspired by `DebugSecret` from the `secrecy` crate.
#[debug("[REDACTED]")]
pub struct SecretKey(RawSecretKey);

// Prevent `SecretKey` from implementing some traits to avoid leaking secret keys.
static_assertions::assert_not_impl_any! {
    SecretKey:
    Clone, Copy, core::ops::Deref, ToOwned,
    core::fmt::Binary, core::fmt::Display, core::fmt::LowerHex, core::fmt::UpperHex,
    serde::Serialize,
}

impl PartialEq for SecretKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_raw().to_bytes() == other.as_raw().to_bytes()
    }
}

impl Eq for SecretKey {}

impl TryFrom<SecretKeyBytes> for SecretKey {
    type Error = Error;

    #[inline]
    fn try_from(secret_key_bytes: SecretKeyBytes) -> Result<Self, Self::Error> {
        RawSecretKey::from_bytes(secret_key_bytes.as_ref())
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }
}

impl SecretKeyTrait for SecretKey {
    type PublicKey = PublicKey;
    type Signature = Signature;

    #[inline]
    fn to_public_key(&self) -> PublicKey {
        self.as_raw().sk_to_pk().into()
    }

    #[inline]
    fn sign(&self, message: impl AsRef<[u8]>) -> Signature {
        self.as_raw()
            .sign(message.as_ref(), DOMAIN_SEPARATION_TAG, &[])
            .into()
    }
}

impl SecretKey {
    #[must_use]
    pub fn to_bytes(&self) -> SecretKeyBytes {
        SecretKeyBytes {
            bytes: self.as_raw().to_bytes(),
        }
    }

    const fn as_raw(&self) -> &RawSecretKey {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_survives_conversion_to_bytes() -> Result<(), Error> {
        let secret_key = SecretKey::try_from(SecretKeyBytes::from([5; 32]))?;

        assert_eq!(SecretKey::try_from(secret_key.to_bytes())?, secret_key);

        Ok(())
    }

    #[test]
    fn zero_is_not_a_valid_secret_key() {
        assert_eq!(
            SecretKey::try_from(SecretKeyBytes::default()),
            Err(Error::InvalidSecretKey),
        );
    }

    #[test]
    fn secret_key_is_redacted_in_debug_output() -> Result<(), Error> {
        let secret_key = SecretKey::try_from(SecretKeyBytes::from([5; 32]))?;

        assert_eq!(format!("{secret_key:?}"), "[REDACTED]");

        Ok(())
    }
}
