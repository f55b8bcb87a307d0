use core::num::NonZeroU64;

use blst::{
    blst_scalar,
    min_pk::{AggregateSignature as RawAggregateSignature, Signature as RawSignature},
    BLST_ERROR,
};
use derive_more::From;
use itertools::Itertools as _;
use rand::Rng as _;

use crate::{
    consts::DOMAIN_SEPARATION_TAG, error::Error, public_key::PublicKey,
    signature_bytes::SignatureBytes, traits::Signature as SignatureTrait,
};

const MULTI_VERIFY_RANDOM_BYTES: usize = size_of::<NonZeroU64>();
const MULTI_VERIFY_RANDOM_BITS: usize = MULTI_VERIFY_RANDOM_BYTES * 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug, From)]
pub struct Signature(RawSignature);

impl Default for Signature {
    #[inline]
    fn default() -> Self {
        SignatureBytes::empty()
            .try_into()
            .expect("compressed signature constructed in SignatureBytes::empty is valid")
    }
}

impl TryFrom<SignatureBytes> for Signature {
    type Error = Error;

    #[inline]
    fn try_from(bytes: SignatureBytes) -> Result<Self, Self::Error> {
        RawSignature::uncompress(bytes.as_bytes())
            .map(Self)
            .map_err(|_| Error::InvalidSignature)
    }
}

impl SignatureTrait for Signature {
    type PublicKey = PublicKey;

    #[must_use]
    fn verify(&self, message: impl AsRef<[u8]>, public_key: &PublicKey) -> bool {
        let result = self.as_raw().verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            &[],
            public_key.as_raw(),
            false,
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    #[inline]
    fn aggregate_in_place(&mut self, other: Self) {
        let mut self_aggregate = RawAggregateSignature::from_signature(self.as_raw());
        let other_aggregate = RawAggregateSignature::from_signature(other.as_raw());
        self_aggregate.add_aggregate(&other_aggregate);
        self.0 = self_aggregate.to_signature();
    }

    #[must_use]
    fn fast_aggregate_verify<'keys>(
        &self,
        message: impl AsRef<[u8]>,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
    ) -> bool {
        let public_keys = public_keys.into_iter().map(PublicKey::as_raw).collect_vec();

        if public_keys.is_empty() {
            return false;
        }

        let result = self.as_raw().fast_aggregate_verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            public_keys.as_slice(),
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    #[must_use]
    fn multi_verify<'all>(
        messages: impl IntoIterator<Item = &'all [u8]>,
        signatures: impl IntoIterator<Item = &'all Self>,
        public_keys: impl IntoIterator<Item = &'all PublicKey>,
    ) -> bool {
        let messages = messages.into_iter().collect_vec();
        let signatures = signatures.into_iter().map(Self::as_raw).collect_vec();
        let public_keys = public_keys.into_iter().map(PublicKey::as_raw).collect_vec();

        if signatures.is_empty() {
            return true;
        }

        // `ThreadRng` is cryptographically secure.
        let mut rng = rand::thread_rng();

        let randoms = core::iter::repeat_with(|| {
            let mut scalar = blst_scalar::default();
            let nonzero_bytes = rng.gen::<NonZeroU64>().get().to_le_bytes();
            scalar.b[..MULTI_VERIFY_RANDOM_BYTES].copy_from_slice(&nonzero_bytes);
            scalar
        })
        .take(signatures.len())
        .collect_vec();

        let result = RawSignature::verify_multiple_aggregate_signatures(
            messages.as_slice(),
            DOMAIN_SEPARATION_TAG,
            public_keys.as_slice(),
            false,
            signatures.as_slice(),
            true,
            randoms.as_slice(),
            MULTI_VERIFY_RANDOM_BITS,
        );

        result == BLST_ERROR::BLST_SUCCESS
    }
}

impl Signature {
    #[must_use]
    pub(crate) const fn as_raw(&self) -> &RawSignature {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use tap::TryConv as _;

    use crate::{
        secret_key::SecretKey, secret_key_bytes::SecretKeyBytes, traits::SecretKey as _,
    };

    use super::*;

    const MESSAGE: &str = "foo";
    const OTHER_MESSAGE: &str = "bar";

    #[test]
    fn signature_verify_succeeds_on_correct_triple() {
        let secret_key = secret_key(1);
        let public_key = secret_key.to_public_key();
        let signature = secret_key.sign(MESSAGE);

        assert!(signature.verify(MESSAGE, &public_key));
    }

    #[test]
    fn signature_verify_fails_on_incorrect_public_key() {
        let signature = secret_key(1).sign(MESSAGE);
        let public_key = secret_key(2).to_public_key();

        assert!(!signature.verify(MESSAGE, &public_key));
    }

    #[test]
    fn signature_verify_fails_on_incorrect_signature() {
        let public_key = secret_key(1).to_public_key();
        let signature = Signature::default();

        assert!(!signature.verify(MESSAGE, &public_key));
    }

    #[test]
    fn fast_aggregate_verify_accepts_aggregate_of_same_message() {
        let secret_keys = [secret_key(1), secret_key(2), secret_key(3)];
        let public_keys = secret_keys.each_ref().map(SecretKey::to_public_key);

        let signature = secret_keys
            .iter()
            .map(|secret_key| secret_key.sign(MESSAGE))
            .reduce(Signature::aggregate)
            .expect("there are three signatures");

        assert!(signature.fast_aggregate_verify(MESSAGE, &public_keys));
        assert!(!signature.fast_aggregate_verify(OTHER_MESSAGE, &public_keys));
        assert!(!signature.fast_aggregate_verify(MESSAGE, &public_keys[..2]));
    }

    #[test]
    fn fast_aggregate_verify_rejects_empty_key_set() {
        let signature = secret_key(1).sign(MESSAGE);

        assert!(!signature.fast_aggregate_verify(MESSAGE, []));
    }

    #[test]
    fn multi_verify_detects_a_single_bad_triple() {
        let first = secret_key(1);
        let second = secret_key(2);

        let messages = [MESSAGE.as_bytes(), OTHER_MESSAGE.as_bytes()];
        let public_keys = [first.to_public_key(), second.to_public_key()];
        let good = [first.sign(MESSAGE), second.sign(OTHER_MESSAGE)];
        let bad = [first.sign(MESSAGE), second.sign(MESSAGE)];

        assert!(Signature::multi_verify(messages, &good, &public_keys));
        assert!(!Signature::multi_verify(messages, &bad, &public_keys));
    }

    fn secret_key(seed: u8) -> SecretKey {
        SecretKeyBytes::from([seed; 32])
            .try_conv::<SecretKey>()
            .expect("bytes encode a valid secret key")
    }
}
