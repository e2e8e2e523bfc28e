#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Typed single-threaded event emitter with single-shot and composite disposal handles.
//!
//! This crate provides a small in-process publish/subscribe mechanism and the resource-cleanup
//! primitives that go with it:
//!
//! * [`Emitter`] - delivers events to the listeners registered for their key, either
//!   synchronously ([`Emitter::emit`]) or deferred ([`Emitter::emit_async`],
//!   [`Emitter::spawn_emit`]).
//! * [`EventKey`] - a key type names the payload type of its events, so the compiler checks
//!   listeners and emitted values against each other.
//! * [`Disposer`] / [`Subscription`] - run a teardown action at most once.
//! * [`CompositeDisposer`] / [`CompositeSubscription`] - tear down a group of handles at once.
//!
//! The handles interoperate through the [`Dispose`] and [`Unsubscribe`] capability traits: any
//! type implementing one of them can be grouped by the matching composite, and subscriptions
//! implement both.
//!
//! Everything here is single-threaded (`!Send`, `!Sync`).
//!
//! # Emission semantics
//!
//! Every emission takes a snapshot of the listeners registered for the key when it starts and
//! delivers to exactly that snapshot. Listeners registered during the emission do not receive
//! it; listeners removed during the emission (including a listener removing itself) still do.
//!
//! A listener that panics during [`Emitter::emit`] unwinds into the caller and the remaining
//! listeners are skipped. During asynchronous emission, panics are caught per listener, all
//! other listeners still run and the emission resolves to [`Error::ListenerFailed`].
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use emitter::{CompositeDisposer, Emitter, EventKey};
//!
//! #[derive(Clone, Debug, PartialEq, Eq, Hash)]
//! enum Door {
//!     Opened,
//!     Closed,
//! }
//!
//! impl EventKey for Door {
//!     type Payload = u32;
//! }
//!
//! let emitter = Emitter::new();
//! let openings = Rc::new(Cell::new(0));
//!
//! // Tear down everything a component registered in one call.
//! let component = CompositeDisposer::new();
//!
//! component.add(Rc::new(emitter.on(Door::Opened, {
//!     let openings = Rc::clone(&openings);
//!     move |_door_id: &u32| openings.set(openings.get() + 1)
//! })));
//! component.add(Rc::new(emitter.on(Door::Closed, |door_id: &u32| {
//!     println!("door {door_id} closed");
//! })));
//!
//! emitter.emit(&Door::Opened, &7);
//! emitter.emit(&Door::Closed, &7);
//! assert_eq!(openings.get(), 1);
//!
//! component.dispose();
//! emitter.emit(&Door::Opened, &8);
//! assert_eq!(openings.get(), 1);
//! ```
//!
//! # Asynchronous example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use emitter::{Emitter, EventKey};
//! use futures::executor::block_on;
//!
//! #[derive(Clone, Debug, PartialEq, Eq, Hash)]
//! struct Message;
//!
//! impl EventKey for Message {
//!     type Payload = String;
//! }
//!
//! let emitter = Emitter::new();
//! let received = Rc::new(RefCell::new(Vec::new()));
//!
//! emitter.on(Message, {
//!     let received = Rc::clone(&received);
//!     move |text: &String| received.borrow_mut().push(text.clone())
//! });
//!
//! let emission = emitter.emit_async(&Message, "hello".to_string());
//!
//! // Nothing has been delivered yet.
//! assert!(received.borrow().is_empty());
//!
//! block_on(emission).unwrap();
//! assert_eq!(*received.borrow(), ["hello"]);
//! ```

mod capability;
mod deferred;
mod disposer;
mod emitter;
mod error;
mod group;
mod key;
mod listener;
mod registry;
mod subscription;

pub use capability::*;
pub use deferred::EmitAsync;
pub use disposer::*;
pub use emitter::*;
pub use error::Error;
pub(crate) use error::{Result, panic_message};
pub use key::*;
pub use listener::Listener;
pub use subscription::*;
