use core::any::Any;
use std::thread::JoinHandle;

use anyhow::{Error, Result};

type Payload = Box<dyn Any + Send + 'static>;

pub fn log(payload: Payload) {
    let thread = std::thread::current();
    // Use the same default as the standard library and various third-party crates.
    let name = thread.name().unwrap_or("<unnamed>");
    let error = payload_into_error(payload);
    log::error!("thread {name} panicked: {error}");
}

#[must_use]
pub fn payload_into_error(payload: Payload) -> Error {
    let payload = match payload.downcast::<String>() {
        Ok(string) => return Error::msg(*string),
        Err(other) => other,
    };

    if let Ok(string) = payload.downcast::<&str>() {
        return Error::msg(*string);
    }

    Error::msg("panic with payload of unknown type")
}

/// Joins a thread that returns a `Result`, turning a panic in it into an error.
pub fn join<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    let name = handle.thread().name().unwrap_or("<unnamed>").to_owned();

    handle
        .join()
        .map_err(payload_into_error)?
        .map_err(|error| error.context(format!("thread {name} failed")))
}

#[cfg(test)]
mod tests {
    use std::thread::Builder;

    use super::*;

    #[test]
    fn string_payloads_are_preserved() {
        let error = payload_into_error(Box::new(String::from("owned message")));
        assert_eq!(error.to_string(), "owned message");

        let error = payload_into_error(Box::new("static message"));
        assert_eq!(error.to_string(), "static message");
    }

    #[test]
    fn other_payloads_are_replaced() {
        let error = payload_into_error(Box::new(5_u8));
        assert_eq!(error.to_string(), "panic with payload of unknown type");
    }

    #[test]
    fn join_converts_panic_into_error() -> Result<()> {
        let handle = Builder::new()
            .name("panicking".to_owned())
            .spawn(|| -> Result<()> { panic!("invariant violated") })?;

        let error = join(handle).expect_err("thread panicked");

        assert_eq!(error.to_string(), "invariant violated");

        Ok(())
    }

    #[test]
    fn join_returns_value_of_thread() -> Result<()> {
        let handle = Builder::new().spawn(|| Ok(7))?;

        assert_eq!(join(handle)?, 7);

        Ok(())
    }
}
