//! Single-shot and composite disposal handles.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use crate::Dispose;
use crate::group::{HandleGroup, Member};

/// Runs a cleanup action at most once.
///
/// The action runs synchronously on the first call to [`dispose()`][Self::dispose]. Every later
/// call is a no-op, including calls made from within the action itself. The action is released
/// as soon as it has been taken out for execution, so anything it captured is dropped right
/// after it runs.
///
/// If the action panics, the panic propagates to the caller of `dispose()`. The disposer is
/// already marked as disposed at that point and the action is never attempted again.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use emitter::Disposer;
///
/// let released = Rc::new(Cell::new(0));
///
/// let disposer = Disposer::new({
///     let released = Rc::clone(&released);
///     move || released.set(released.get() + 1)
/// });
///
/// disposer.dispose();
/// disposer.dispose();
///
/// assert_eq!(released.get(), 1);
/// assert!(disposer.is_disposed());
/// ```
pub struct Disposer {
    triggered: Cell<bool>,
    action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Disposer {
    /// Creates a disposer that runs `action` when first disposed.
    #[must_use]
    pub fn new(action: impl FnOnce() + 'static) -> Self {
        Self {
            triggered: Cell::new(false),
            action: RefCell::new(Some(Box::new(action))),
        }
    }

    /// Runs the cleanup action if this is the first call. Later calls do nothing.
    pub fn dispose(&self) {
        if self.triggered.replace(true) {
            return;
        }

        // The borrow ends with this statement, before the action gets a chance to run
        // (and potentially call back into this disposer).
        let action = self.action.borrow_mut().take();

        if let Some(action) = action {
            action();
        }
    }

    /// Whether [`dispose()`][Self::dispose] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.triggered.get()
    }
}

impl Dispose for Disposer {
    fn dispose(&self) {
        Self::dispose(self);
    }
}

impl Debug for Disposer {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("triggered", &self.triggered.get())
            .finish_non_exhaustive()
    }
}

/// Disposes a group of handles together.
///
/// Members are tracked by the identity of their `Rc`: adding the same `Rc` (or a clone of it)
/// twice stores it once, and [`remove()`][Self::remove] takes out exactly that handle. The
/// composite shares ownership of its members with whoever else holds them; a handle may belong
/// to any number of composites at once.
///
/// Disposing the composite disposes every member exactly once, in no particular order. After
/// that, the composite is inert: it holds no members and ignores [`add()`][Self::add],
/// [`remove()`][Self::remove] and [`clear()`][Self::clear]. A handle offered to a disposed
/// composite is not disposed; it stays the caller's responsibility.
///
/// If a member panics while being disposed, the remaining members are still disposed and the
/// first panic is resumed on the caller once every member has been attempted.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use emitter::{CompositeDisposer, Disposer};
///
/// let released = Rc::new(Cell::new(0));
/// let make_disposer = || {
///     let released = Rc::clone(&released);
///     Rc::new(Disposer::new(move || released.set(released.get() + 1)))
/// };
///
/// let composite = CompositeDisposer::new();
/// composite.add(make_disposer());
/// composite.add(make_disposer());
///
/// composite.dispose();
/// assert_eq!(released.get(), 2);
/// ```
pub struct CompositeDisposer {
    group: HandleGroup,
}

impl CompositeDisposer {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self {
            group: HandleGroup::new(),
        }
    }

    /// Adds a handle to be disposed together with this composite.
    ///
    /// Ignored if the composite has already been disposed.
    pub fn add<D>(&self, handle: Rc<D>)
    where
        D: Dispose + ?Sized + 'static,
    {
        self.group.insert(Box::new(DisposeMember(handle)));
    }

    /// Removes a handle without disposing it. Does nothing if the handle is not a member.
    pub fn remove<D>(&self, handle: &Rc<D>)
    where
        D: Dispose + ?Sized,
    {
        self.group.remove(Rc::as_ptr(handle).cast());
    }

    /// Removes all members without disposing them.
    pub fn clear(&self) {
        self.group.clear();
    }

    /// Disposes all members. Only the first call has any effect.
    pub fn dispose(&self) {
        self.group.trigger();
    }

    /// Whether [`dispose()`][Self::dispose] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
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

impl Default for CompositeDisposer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispose for CompositeDisposer {
    fn dispose(&self) {
        Self::dispose(self);
    }
}

impl Debug for CompositeDisposer {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("group", &self.group)
            .finish()
    }
}

struct DisposeMember<D: ?Sized>(Rc<D>);

impl<D: Dispose + ?Sized> Member for DisposeMember<D> {
    fn trigger(&self) {
        self.0.dispose();
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Weak;

    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use testing::{Counter, with_watchdog};

    use super::*;

    assert_impl_all!(Disposer: Dispose, Debug);
    assert_impl_all!(CompositeDisposer: Dispose, Debug, Default);
    assert_not_impl_any!(Disposer: Send, Sync);
    assert_not_impl_any!(CompositeDisposer: Send, Sync);

    fn counting_disposer(counter: &Counter) -> Rc<Disposer> {
        Rc::new(Disposer::new(counter.incrementer()))
    }

    /// A handle that inspects the composite it belongs to when it is dropped.
    struct InspectsOwnerOnDrop {
        owner: Weak<CompositeDisposer>,
        observed_len: Rc<Cell<Option<usize>>>,
    }

    impl Dispose for InspectsOwnerOnDrop {
        fn dispose(&self) {}
    }

    impl Drop for InspectsOwnerOnDrop {
        fn drop(&mut self) {
            if let Some(owner) = self.owner.upgrade() {
                self.observed_len.set(Some(owner.len()));
            }
        }
    }

    #[test]
    fn disposer_runs_action_once() {
        let counter = Counter::new();
        let disposer = Disposer::new(counter.incrementer());

        assert_eq!(counter.get(), 0);
        assert!(!disposer.is_disposed());

        disposer.dispose();
        assert_eq!(counter.get(), 1);

        disposer.dispose();
        assert_eq!(counter.get(), 1);
        assert!(disposer.is_disposed());
    }

    #[test]
    fn disposer_ignores_reentrant_dispose() {
        with_watchdog(|| {
            let counter = Counter::new();
            let slot: Rc<RefCell<Option<Rc<Disposer>>>> = Rc::new(RefCell::new(None));

            let disposer = Rc::new(Disposer::new({
                let counter = counter.clone();
                let slot = Rc::clone(&slot);
                move || {
                    counter.increment();
                    let me = slot.borrow().clone();
                    if let Some(me) = me {
                        me.dispose();
                    }
                }
            }));
            *slot.borrow_mut() = Some(Rc::clone(&disposer));

            disposer.dispose();
            assert_eq!(counter.get(), 1);

            // Break the cycle between the disposer and its own action.
            slot.borrow_mut().take();
        });
    }

    #[test]
    fn disposer_panicking_action_is_not_retried() {
        with_watchdog(|| {
            let counter = Counter::new();
            let disposer = Disposer::new({
                let counter = counter.clone();
                move || {
                    counter.increment();
                    panic!("cleanup failed");
                }
            });

            let result = panic::catch_unwind(AssertUnwindSafe(|| disposer.dispose()));
            assert!(result.is_err());
            assert!(disposer.is_disposed());

            disposer.dispose();
            assert_eq!(counter.get(), 1);
        });
    }

    #[test]
    fn disposer_releases_captured_state() {
        let captured = Rc::new(());
        let disposer = Disposer::new({
            let captured = Rc::clone(&captured);
            move || drop(captured)
        });
        assert_eq!(Rc::strong_count(&captured), 2);

        disposer.dispose();
        assert_eq!(Rc::strong_count(&captured), 1);
    }

    #[test]
    fn composite_disposes_all_members_once() {
        let first = Counter::new();
        let second = Counter::new();

        let composite = CompositeDisposer::new();
        composite.add(counting_disposer(&first));
        composite.add(counting_disposer(&second));
        assert_eq!(composite.len(), 2);

        composite.dispose();
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
        assert!(composite.is_disposed());
        assert!(composite.is_empty());

        composite.dispose();
        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn composite_remove_prevents_disposal() {
        let counter = Counter::new();
        let disposer = counting_disposer(&counter);

        let composite = CompositeDisposer::new();
        composite.add(Rc::clone(&disposer));
        composite.remove(&disposer);
        assert!(composite.is_empty());

        composite.dispose();
        assert_eq!(counter.get(), 0);
        assert!(!disposer.is_disposed());
    }

    #[test]
    fn composite_remove_of_unknown_handle_is_noop() {
        let counter = Counter::new();
        let member = counting_disposer(&counter);
        let stranger = counting_disposer(&counter);

        let composite = CompositeDisposer::new();
        composite.add(Rc::clone(&member));
        composite.remove(&stranger);
        assert_eq!(composite.len(), 1);

        composite.dispose();
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn composite_clear_does_not_dispose() {
        let first = Counter::new();
        let second = Counter::new();

        let composite = CompositeDisposer::new();
        composite.add(counting_disposer(&first));
        composite.add(counting_disposer(&second));

        composite.clear();
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 0);

        composite.dispose();
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 0);
    }

    #[test]
    fn composite_add_after_dispose_is_ignored() {
        let counter = Counter::new();
        let late = counting_disposer(&counter);

        let composite = CompositeDisposer::new();
        composite.dispose();

        composite.add(Rc::clone(&late));
        assert!(composite.is_empty());
        assert_eq!(counter.get(), 0);
        assert!(!late.is_disposed());
    }

    #[test]
    fn composite_accepts_trait_objects_and_nested_composites() {
        let counter = Counter::new();

        let inner = Rc::new(CompositeDisposer::new());
        inner.add(counting_disposer(&counter));

        let erased: Rc<dyn Dispose> = counting_disposer(&counter);

        let outer = CompositeDisposer::new();
        outer.add(Rc::clone(&inner));
        outer.add(Rc::clone(&erased));

        outer.remove(&erased);
        outer.dispose();

        assert_eq!(counter.get(), 1);
        assert!(inner.is_disposed());
    }

    #[test]
    fn composite_handle_can_be_shared_between_composites() {
        let counter = Counter::new();
        let shared = counting_disposer(&counter);

        let first = CompositeDisposer::new();
        let second = CompositeDisposer::new();
        first.add(Rc::clone(&shared));
        second.add(Rc::clone(&shared));

        first.dispose();
        second.dispose();

        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn composite_continues_after_member_panic() {
        with_watchdog(|| {
            let counter = Counter::new();

            let composite = CompositeDisposer::new();
            composite.add(counting_disposer(&counter));
            composite.add(Rc::new(Disposer::new(|| panic!("member failed"))));
            composite.add(counting_disposer(&counter));

            let result = panic::catch_unwind(AssertUnwindSafe(|| composite.dispose()));

            assert!(result.is_err());
            assert_eq!(counter.get(), 2);
            assert!(composite.is_disposed());
        });
    }

    #[test]
    fn composite_clear_releases_members_outside_of_borrow() {
        with_watchdog(|| {
            let composite = Rc::new(CompositeDisposer::new());
            let observed_len = Rc::new(Cell::new(None));

            composite.add(Rc::new(InspectsOwnerOnDrop {
                owner: Rc::downgrade(&composite),
                observed_len: Rc::clone(&observed_len),
            }));

            // The composite holds the only reference, so clearing drops the member.
            composite.clear();

            assert_eq!(observed_len.get(), Some(0));
            assert!(composite.is_empty());
        });
    }

    #[test]
    fn composite_mutation_from_member_disposal_is_noop() {
        with_watchdog(|| {
            let counter = Counter::new();
            let late = counting_disposer(&counter);
            let sibling = counting_disposer(&counter);

            let composite = Rc::new(CompositeDisposer::new());

            let reentrant = Rc::new(Disposer::new({
                let composite = Rc::downgrade(&composite);
                let late = Rc::clone(&late);
                let sibling = Rc::clone(&sibling);
                move || {
                    let Some(composite) = composite.upgrade() else {
                        return;
                    };

                    composite.add(Rc::clone(&late));
                    composite.remove(&sibling);
                    composite.dispose();
                    assert_eq!(composite.len(), 0);
                }
            }));

            composite.add(Rc::clone(&reentrant));
            composite.add(Rc::clone(&sibling));

            composite.dispose();

            assert!(reentrant.is_disposed());
            // Removal from within disposal came too late to spare the sibling.
            assert!(sibling.is_disposed());
            assert!(!late.is_disposed());
            assert_eq!(counter.get(), 1);
            assert_eq!(composite.len(), 0);
            assert!(composite.is_disposed());
        });
    }
}
