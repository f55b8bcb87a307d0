use derive_more::{AsMut, AsRef, Debug, From};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::consts::SECRET_KEY_SIZE;

#[derive(Default, AsRef, AsMut, Debug, From, Zeroize, ZeroizeOnDrop)]
// Inspired by `DebugSecret` from the `secrecy` crate.
#[debug("[REDACTED]")]
pub struct SecretKeyBytes {
    pub(crate) bytes: [u8; SECRET_KEY_SIZE],
}
