//! Subscription handles: the disposal primitives under the "unsubscribe" vocabulary.

use std::any::type_name;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use crate::group::{HandleGroup, Member};
use crate::{Dispose, Disposer, Unsubscribe};

/// Ends a subscription at most once.
///
/// Returned by [`Emitter::on()`][crate::Emitter::on], where unsubscribing removes the listener
/// from the emitter. It can also wrap any other teardown action via [`Subscription::new()`].
///
/// A subscription is also [`Dispose`], so it can be grouped in a
/// [`CompositeDisposer`][crate::CompositeDisposer] as well as in a [`CompositeSubscription`].
///
/// Dropping a subscription does not unsubscribe it.
pub struct Subscription {
    disposer: Disposer,
}

impl Subscription {
    /// Creates a subscription that runs `action` when first unsubscribed.
    #[must_use]
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            disposer: Disposer::new(action),
        }
    }

    /// Ends the subscription if this is the first call. Later calls do nothing.
    pub fn unsubscribe(&self) {
        self.disposer.dispose();
    }

    /// Whether [`unsubscribe()`][Self::unsubscribe] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.disposer.is_disposed()
    }
}

impl Unsubscribe for Subscription {
    fn unsubscribe(&self) {
        Self::unsubscribe(self);
    }
}

impl Dispose for Subscription {
    fn dispose(&self) {
        Self::unsubscribe(self);
    }
}

impl Debug for Subscription {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Unsubscribes a group of subscriptions together.
///
/// Behaves exactly like [`CompositeDisposer`][crate::CompositeDisposer], with [`Unsubscribe`]
/// members: identity-based membership, single-shot [`unsubscribe()`][Self::unsubscribe],
/// inert afterwards, and isolated member panics (the first one is resumed after all members
/// were attempted).
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use emitter::{CompositeSubscription, Emitter, EventKey};
///
/// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// struct Tick;
///
/// impl EventKey for Tick {
///     type Payload = u64;
/// }
///
/// let emitter = Emitter::new();
/// let subscriptions = CompositeSubscription::new();
///
/// subscriptions.add(Rc::new(emitter.on(Tick, |_: &u64| {})));
/// subscriptions.add(Rc::new(emitter.on(Tick, |_: &u64| {})));
/// assert_eq!(emitter.listener_count(&Tick), 2);
///
/// subscriptions.unsubscribe();
/// assert_eq!(emitter.listener_count(&Tick), 0);
/// ```
pub struct CompositeSubscription {
    group: HandleGroup,
}

impl CompositeSubscription {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self {
            group: HandleGroup::new(),
        }
    }

    /// Adds a subscription to be ended together with this composite.
    ///
    /// Ignored if the composite has already been unsubscribed.
    pub fn add<U>(&self, subscription: Rc<U>)
    where
        U: Unsubscribe + ?Sized + 'static,
    {
        self.group.insert(Box::new(UnsubscribeMember(subscription)));
    }

    /// Removes a subscription without ending it. Does nothing if it is not a member.
    pub fn remove<U>(&self, subscription: &Rc<U>)
    where
        U: Unsubscribe + ?Sized,
    {
        self.group.remove(Rc::as_ptr(subscription).cast());
    }

    /// Removes all members without ending them.
    pub fn clear(&self) {
        self.group.clear();
    }

    /// Ends all member subscriptions. Only the first call has any effect.
    pub fn unsubscribe(&self) {
        self.group.trigger();
    }

    /// Whether [`unsubscribe()`][Self::unsubscribe] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.group.is_triggered()
    }

    /// Number of members currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.group.len()
    }

    /// Whether the composite currently holds no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CompositeSubscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Unsubscribe for CompositeSubscription {
    fn unsubscribe(&self) {
        Self::unsubscribe(self);
    }
}

impl Dispose for CompositeSubscription {
    fn dispose(&self) {
        Self::unsubscribe(self);
    }
}

impl Debug for CompositeSubscription {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("group", &self.group)
            .finish()
    }
}

struct UnsubscribeMember<U: ?Sized>(Rc<U>);

impl<U: Unsubscribe + ?Sized> Member for UnsubscribeMember<U> {
    fn trigger(&self) {
        self.0.unsubscribe();
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }
}
