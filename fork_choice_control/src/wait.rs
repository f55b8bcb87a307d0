use crossbeam_utils::sync::WaitGroup;
use parking_lot::Mutex;

/// Lets tests block until every message sent to the mutator has been handled.
///
/// Every message carries a clone of the current `W`. The unit type is used in normal operation,
/// [`WaitGroup`] in tests.
pub trait Wait: Clone + Default + Send + 'static {
    type Swappable: Default + Send + Sync;

    fn load_and_clone(swappable: &Self::Swappable) -> Self;
}

impl Wait for () {
    type Swappable = ();

    fn load_and_clone((): &Self::Swappable) -> Self {}
}

impl Wait for WaitGroup {
    type Swappable = Mutex<Self>;

    fn load_and_clone(swappable: &Self::Swappable) -> Self {
        swappable.lock().clone()
    }
}
