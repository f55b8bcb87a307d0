use futures::{
    channel::mpsc::{TrySendError, UnboundedSender},
    sink::Drain,
};

/// A destination for messages that never applies backpressure.
///
/// Components receive sinks as `impl UnboundedSink<T>` so that tests can pass `Option::None` or
/// [`Drain`] for outputs they are not interested in.
pub trait UnboundedSink<T>: Send + 'static {
    // `Drain` does not implement `Clone`.
    fn clone(&self) -> Self;

    /// Returns the message back if the receiving end has been dropped.
    fn unbounded_send(&self, message: T) -> Result<(), T>;
}

impl<T: Send + 'static> UnboundedSink<T> for UnboundedSender<T> {
    fn clone(&self) -> Self {
        Clone::clone(self)
    }

    fn unbounded_send(&self, message: T) -> Result<(), T> {
        Self::unbounded_send(self, message).map_err(TrySendError::into_inner)
    }
}

impl<T, S: UnboundedSink<T> + Clone> UnboundedSink<T> for Option<S> {
    fn clone(&self) -> Self {
        Clone::clone(self)
    }

    fn unbounded_send(&self, message: T) -> Result<(), T> {
        self.as_ref()
            .map_or(Ok(()), |sink| sink.unbounded_send(message))
    }
}

impl<T: Send + 'static> UnboundedSink<T> for Drain<T> {
    fn clone(&self) -> Self {
        futures::sink::drain()
    }

    fn unbounded_send(&self, _message: T) -> Result<(), T> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc::UnboundedReceiver;

    use super::*;

    #[test]
    fn closed_channel_returns_message() {
        let (tx, rx) = futures::channel::mpsc::unbounded::<u8>();

        drop(rx);

        assert_eq!(UnboundedSink::unbounded_send(&tx, 7), Err(7));
    }

    #[test]
    fn missing_sink_accepts_everything() {
        let sink = None::<UnboundedSender<u8>>;

        assert_eq!(sink.unbounded_send(7), Ok(()));
    }

    #[test]
    fn clones_deliver_to_the_same_receiver() {
        let (tx, mut rx): (_, UnboundedReceiver<u8>) = futures::channel::mpsc::unbounded();
        let clone = UnboundedSink::clone(&tx);

        assert_eq!(UnboundedSink::unbounded_send(&tx, 1), Ok(()));
        assert_eq!(clone.unbounded_send(2), Ok(()));

        assert_eq!(rx.try_next().ok().flatten(), Some(1));
        assert_eq!(rx.try_next().ok().flatten(), Some(2));
    }
}
