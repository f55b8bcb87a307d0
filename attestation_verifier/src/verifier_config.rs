use core::time::Duration;

use derivative::Derivative;

#[derive(Clone, Copy, Debug, Derivative)]
#[derivative(Default)]
pub struct VerifierConfig {
    /// Number of attestations that triggers signature verification without waiting.
    #[derivative(Default(value = "64"))]
    pub max_batch_size: usize,
    /// Maximum time the first buffered attestation waits before its batch is verified.
    #[derivative(Default(value = "Duration::from_millis(50)"))]
    pub max_batch_delay: Duration,
    /// Capacity of the bounded channels between stages.
    #[derivative(Default(value = "1024"))]
    pub channel_capacity: usize,
    #[derivative(Default(value = "1024"))]
    pub unknown_block_pool_size: usize,
}
