use std::any::type_name;
use std::fmt::{self, Debug, Formatter};
use std::ptr;
use std::rc::Rc;

/// A callback invoked with the payload of an emitted event.
///
/// A listener has identity: clones of a `Listener` are the same listener, while two listeners
/// created from identical closures are different listeners. The emitter stores listeners as a
/// set keyed by this identity, so registering the same listener twice under one key has no
/// additional effect, and [`Emitter::off()`][crate::Emitter::off] removes a listener by
/// identity.
///
/// # Example
///
/// ```rust
/// use emitter::Listener;
///
/// let listener = Listener::<String>::new(|value| println!("{value}"));
/// let same = listener.clone();
/// let other = Listener::<String>::new(|value| println!("{value}"));
///
/// assert_eq!(listener, same);
/// assert_ne!(listener, other);
/// ```
pub struct Listener<T: ?Sized> {
    callback: Rc<dyn Fn(&T)>,
}

impl<T: ?Sized> Listener<T> {
    /// Creates a new listener with its own identity.
    #[must_use]
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Invokes the callback.
    pub fn call(&self, value: &T) {
        (self.callback)(value);
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.callback).cast()
    }
}

impl<T: ?Sized> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<T: ?Sized> PartialEq for Listener<T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.identity(), other.identity())
    }
}

impl<T: ?Sized> Eq for Listener<T> {}

impl<T: ?Sized> Debug for Listener<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("identity", &self.identity())
            .finish()
    }
}

/// The listeners registered under one key: a set by identity that remembers
/// registration order.
pub(crate) struct ListenerSet<T: ?Sized> {
    listeners: Vec<Listener<T>>,
}

impl<T: ?Sized> ListenerSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Returns `false` if the listener was already in the set.
    pub(crate) fn insert(&mut self, listener: &Listener<T>) -> bool {
        if self.listeners.contains(listener) {
            return false;
        }

        self.listeners.push(listener.clone());
        true
    }

    /// Takes the listener out of the set, returning the stored handle if it was present.
    pub(crate) fn remove(&mut self, listener: &Listener<T>) -> Option<Listener<T>> {
        let index = self.listeners.iter().position(|l| l == listener)?;
        Some(self.listeners.remove(index))
    }

    /// A point-in-time copy of the set, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Listener<T>> {
        self.listeners.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
