/// A handle that releases something when disposed.
///
/// Disposal is idempotent: the first call performs the release, every later call is a no-op.
/// Implementations are grouped by identity in a [`CompositeDisposer`][crate::CompositeDisposer].
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use emitter::{CompositeDisposer, Dispose};
///
/// struct Connection {
///     open: Cell<bool>,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         self.open.set(false);
///     }
/// }
///
/// let connection = Rc::new(Connection { open: Cell::new(true) });
///
/// let composite = CompositeDisposer::new();
/// composite.add(Rc::clone(&connection));
/// composite.dispose();
///
/// assert!(!connection.open.get());
/// ```
pub trait Dispose {
    /// Releases whatever this handle guards. Calling this more than once has no further effect.
    fn dispose(&self);
}

/// A handle that ends a subscription when unsubscribed.
///
/// This is the same capability as [`Dispose`] under the subscription vocabulary. Unsubscribing
/// is idempotent. Implementations are grouped by identity in a
/// [`CompositeSubscription`][crate::CompositeSubscription].
pub trait Unsubscribe {
    /// Ends the subscription. Calling this more than once has no further effect.
    fn unsubscribe(&self);
}
