//! Futures that drive deferred (asynchronous) emission.

use std::any::type_name;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, ready};

use futures::future::LocalBoxFuture;
use tracing::{debug, trace};

use crate::listener::Listener;
use crate::{Error, panic_message};

/// The result of one listener invocation. A failure carries the rendered panic message.
pub(crate) type Outcome = std::result::Result<(), String>;

/// Invokes the listener, converting a panic into a failed [`Outcome`].
pub(crate) fn invoke<T>(listener: &Listener<T>, value: &T) -> Outcome {
    panic::catch_unwind(AssertUnwindSafe(|| listener.call(value)))
        .map_err(|payload| panic_message(payload.as_ref()))
}

/// One listener invocation that runs on a later poll than the one that first polls it.
///
/// The first poll only schedules a wake-up, so nothing happens in the poll that started the
/// emission. When many of these are polled in sequence, they yield in sequence, so their wake-ups
/// are scheduled in the order in which they were created.
pub(crate) struct DeferredCall<T> {
    listener: Listener<T>,
    value: Rc<T>,
    yielded: bool,
}

impl<T> DeferredCall<T> {
    pub(crate) fn new(listener: Listener<T>, value: Rc<T>) -> Self {
        Self {
            listener,
            value,
            yielded: false,
        }
    }
}

impl<T> Future for DeferredCall<T> {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if !this.yielded {
            this.yielded = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        Poll::Ready(invoke(&this.listener, &this.value))
    }
}

impl<T> Debug for DeferredCall<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("listener", &self.listener)
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}

/// Completes when every listener of an asynchronous emission has been invoked.
///
/// Returned by [`Emitter::emit_async()`][crate::Emitter::emit_async] and
/// [`Emitter::spawn_emit()`][crate::Emitter::spawn_emit]. The set of listeners was fixed when
/// the emission was started; listeners registered or removed since then do not affect it.
///
/// Resolves to `Ok(())` if every listener returned normally, or to
/// [`Error::ListenerFailed`] if at least one of them panicked (all others still ran).
#[must_use = "futures do nothing unless polled"]
pub struct EmitAsync {
    key: Box<dyn Debug>,
    outcomes: LocalBoxFuture<'static, Vec<Outcome>>,
}

impl EmitAsync {
    pub(crate) fn new(key: Box<dyn Debug>, outcomes: LocalBoxFuture<'static, Vec<Outcome>>) -> Self {
        Self { key, outcomes }
    }

    fn summarize(&self, outcomes: Vec<Outcome>) -> Result<(), Error> {
        let total = outcomes.len();
        let mut failures = outcomes.into_iter().filter_map(Result::err);

        let Some(message) = failures.next() else {
            trace!(key = ?self.key, listeners = total, "asynchronous emission completed");
            return Ok(());
        };

        let failed = failures.count().wrapping_add(1);

        debug!(
            key = ?self.key,
            failed,
            total,
            "asynchronous emission completed with failed listeners"
        );

        Err(Error::ListenerFailed {
            key: format!("{:?}", self.key),
            failed,
            total,
            message,
        })
    }
}

impl Future for EmitAsync {
    type Output = Result<(), Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcomes = ready!(self.outcomes.as_mut().poll(cx));
        Poll::Ready(self.summarize(outcomes))
    }
}

impl Debug for EmitAsync {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
