use std::any::Any;

use futures::task::SpawnError;
use thiserror::Error;

/// Errors surfaced by asynchronous emission.
///
/// Synchronous emission never returns an error: a panicking listener unwinds straight
/// through [`Emitter::emit()`][crate::Emitter::emit].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// At least one listener invocation did not complete. All other listeners in the
    /// emission still ran.
    #[error("{failed} of {total} listeners for key {key} failed; first failure: {message}")]
    ListenerFailed {
        /// Debug rendering of the key that was emitted.
        key: String,

        /// How many listener invocations failed.
        failed: usize,

        /// How many listener invocations the emission consisted of.
        total: usize,

        /// Human-readable description of the first failure, usually the panic message.
        message: String,
    },

    /// A deferred listener invocation could not be handed to the spawner.
    ///
    /// Invocations spawned before the failure still run.
    #[error("failed to spawn deferred listener invocation: {0}")]
    Spawn(#[from] SpawnError),
}

/// A specialized `Result` type for emitter operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Renders a panic payload as text, for logs and [`Error::ListenerFailed`].
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "listener panicked with a non-string payload".to_string()
    }
}
