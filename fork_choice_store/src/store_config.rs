use derivative::Derivative;

#[derive(Clone, Copy, Debug, Derivative)]
#[derivative(Default)]
pub struct StoreConfig {
    /// Maximum number of parent links followed when looking up an ancestor of a block.
    #[derivative(Default(value = "8192"))]
    pub max_ancestor_depth: u64,
    /// Maximum number of slots a stored state may be advanced through to compute a checkpoint
    /// state or the pre-state of a block.
    #[derivative(Default(value = "32"))]
    pub max_empty_slots: u64,
}
