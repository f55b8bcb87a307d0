//! BLS12-381 signatures in the `min_pk` variant used by the beacon chain.
//!
//! The capabilities consumed by the rest of the workspace are described by the traits in
//! [`traits`]. The types exported at the crate root implement them using `blst`.

pub use crate::{
    cached_public_key::CachedPublicKey,
    consts::DOMAIN_SEPARATION_TAG,
    error::Error,
    public_key::PublicKey,
    public_key_bytes::PublicKeyBytes,
    secret_key::SecretKey,
    secret_key_bytes::SecretKeyBytes,
    signature::Signature,
    signature_bytes::SignatureBytes,
};

pub mod traits;

mod cached_public_key;
mod consts;
mod error;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod secret_key_bytes;
mod signature;
mod signature_bytes;
