use core::fmt::Debug;

use crate::error::Error;

pub trait PublicKey: Copy + Eq + Debug + Send + Sync + 'static {
    /// [`eth_aggregate_pubkeys`](https://github.com/ethereum/consensus-specs/blob/86fb82b221474cc89387fa6436806507b3849d88/specs/altair/bls.md#eth_aggregate_pubkeys)
    fn aggregate_nonempty(keys: impl IntoIterator<Item = Self>) -> Result<Self, Error> {
        keys.into_iter()
            .reduce(Self::aggregate)
            .ok_or(Error::NoPublicKeysToAggregate)
    }

    #[must_use]
    fn aggregate(mut self, other: Self) -> Self {
        self.aggregate_in_place(other);
        self
    }

    fn aggregate_in_place(&mut self, other: Self);
}

pub trait Signature: Copy + Eq + Debug + Send + Sync + 'static {
    type PublicKey: PublicKey;

    fn verify(&self, message: impl AsRef<[u8]>, public_key: &Self::PublicKey) -> bool;

    #[must_use]
    fn aggregate(mut self, other: Self) -> Self {
        self.aggregate_in_place(other);
        self
    }

    fn aggregate_in_place(&mut self, other: Self);

    /// Verifies a signature produced by aggregating signatures of the same message.
    fn fast_aggregate_verify<'keys>(
        &self,
        message: impl AsRef<[u8]>,
        public_keys: impl IntoIterator<Item = &'keys Self::PublicKey>,
    ) -> bool;

    /// Verifies multiple signatures over possibly different messages at once.
    ///
    /// The result is `true` only if every triple would pass [`Signature::verify`].
    fn multi_verify<'all>(
        messages: impl IntoIterator<Item = &'all [u8]>,
        signatures: impl IntoIterator<Item = &'all Self>,
        public_keys: impl IntoIterator<Item = &'all Self::PublicKey>,
    ) -> bool;
}

pub trait SecretKey: Debug + Eq {
    type PublicKey: PublicKey;
    type Signature: Signature<PublicKey = Self::PublicKey>;

    fn to_public_key(&self) -> Self::PublicKey;

    fn sign(&self, message: impl AsRef<[u8]>) -> Self::Signature;
}
