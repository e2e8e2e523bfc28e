use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::panic_message;

/// One member of a [`HandleGroup`], type-erased so that concrete handles and trait objects
/// can be mixed in the same group.
pub(crate) trait Member {
    /// Fires the capability of the wrapped handle (dispose or unsubscribe).
    fn trigger(&self);

    /// Address of the shared handle. Two members with the same identity are the same handle.
    fn identity(&self) -> *const ();
}

/// Shared machinery behind the composite handles: an identity-based set of members that is
/// triggered exactly once.
///
/// Once triggered, the set is permanently empty and every mutation is a no-op.
pub(crate) struct HandleGroup {
    triggered: Cell<bool>,

    // Insertion order is kept only because it costs nothing; no ordering is promised to callers.
    members: RefCell<Vec<Box<dyn Member>>>,
}

impl HandleGroup {
    pub(crate) fn new() -> Self {
        Self {
            triggered: Cell::new(false),
            members: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.triggered.get()
    }

    pub(crate) fn len(&self) -> usize {
        self.members.borrow().len()
    }

    /// Inserts the member unless the group was already triggered or already holds a member
    /// with the same identity. The rejected member is dropped without being triggered.
    pub(crate) fn insert(&self, member: Box<dyn Member>) {
        if self.triggered.get() {
            return;
        }

        let mut members = self.members.borrow_mut();

        let identity = member.identity();
        if members.iter().any(|m| m.identity() == identity) {
            return;
        }

        members.push(member);
    }

    /// Takes out the member with the given identity, if present.
    ///
    /// The member is dropped only after the member set is released, as dropping it may run
    /// destructors that call back into the group.
    pub(crate) fn remove(&self, identity: *const ()) {
        if self.triggered.get() {
            return;
        }

        let removed = {
            let mut members = self.members.borrow_mut();
            let index = members.iter().position(|m| m.identity() == identity);

            index.map(|index| members.remove(index))
        };

        drop(removed);
    }

    pub(crate) fn clear(&self) {
        if self.triggered.get() {
            return;
        }

        let members = mem::take(&mut *self.members.borrow_mut());

        // Released outside the borrow, same as in `remove()`.
        drop(members);
    }

    /// Triggers every member exactly once.
    ///
    /// The member set is taken out before any member runs, so members may freely call back
    /// into the group (all such calls are no-ops by then). A panicking member does not stop
    /// the remaining members from being triggered; the first panic is resumed once all members
    /// have been attempted.
    pub(crate) fn trigger(&self) {
        if self.triggered.replace(true) {
            return;
        }

        let members = mem::take(&mut *self.members.borrow_mut());

        debug!(members = members.len(), "triggering handle group");

        let mut first_panic = None;
        let mut failed = 0_usize;

        for member in &members {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| member.trigger())) {
                failed = failed.wrapping_add(1);

                debug!(
                    message = %panic_message(payload.as_ref()),
                    "handle group member panicked, continuing with remaining members"
                );

                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }
        }

        // The members themselves are released only after all of them were triggered.
        drop(members);

        if let Some(payload) = first_panic {
            debug!(failed, "resuming first panic raised by handle group members");
            panic::resume_unwind(payload);
        }
    }
}

impl Debug for HandleGroup {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("triggered", &self.triggered.get())
            .field("len", &self.len())
            .finish()
    }
}
