use std::any::type_name;
use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::join_all;
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::trace;

use crate::deferred::{DeferredCall, Outcome, invoke};
use crate::registry::Registry;
use crate::{EmitAsync, EventKey, Listener, Result, Subscription};

/// Delivers events to the listeners registered for their key.
///
/// Listeners are registered with [`on()`][Self::on] (or [`on_listener()`][Self::on_listener]
/// when the caller wants to keep the listener's identity for [`off()`][Self::off]). Each
/// registration returns a [`Subscription`] that removes exactly that listener from exactly that
/// key when unsubscribed.
///
/// Events are delivered synchronously with [`emit()`][Self::emit], or deferred with
/// [`emit_async()`][Self::emit_async] and [`spawn_emit()`][Self::spawn_emit]. Every emission
/// works on a snapshot of the listeners taken when it starts: listeners added while it is in
/// progress do not receive it, and listeners removed while it is in progress still do.
///
/// The emitter is a handle to shared state. Clones refer to the same listeners, which lets
/// listeners capture the emitter to emit, subscribe or unsubscribe from inside a callback.
/// Beware that a listener capturing its own emitter keeps the emitter alive for as long as it
/// stays registered.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use emitter::{Emitter, EventKey};
///
/// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// struct Message;
///
/// impl EventKey for Message {
///     type Payload = String;
/// }
///
/// let emitter = Emitter::new();
/// let received = Rc::new(RefCell::new(Vec::new()));
///
/// let subscription = emitter.on(Message, {
///     let received = Rc::clone(&received);
///     move |text: &String| received.borrow_mut().push(text.clone())
/// });
///
/// emitter.emit(&Message, &"foo".to_string());
/// emitter.emit(&Message, &"bar".to_string());
/// subscription.unsubscribe();
/// emitter.emit(&Message, &"baz".to_string());
///
/// assert_eq!(*received.borrow(), ["foo", "bar"]);
/// ```
#[derive(Clone, Default)]
pub struct Emitter {
    registry: Rc<RefCell<Registry>>,
}

impl Emitter {
    /// Creates an emitter without any listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback under `key`.
    ///
    /// The callback gets a fresh identity, so the only way to remove it is through the returned
    /// [`Subscription`]. Use [`on_listener()`][Self::on_listener] to keep the identity around.
    pub fn on<K, F>(&self, key: K, listener: F) -> Subscription
    where
        K: EventKey,
        F: Fn(&K::Payload) + 'static,
    {
        self.on_listener(key, &Listener::new(listener))
    }

    /// Registers `listener` under `key`.
    ///
    /// Registering the same listener under the same key again has no additional effect: it is
    /// still invoked once per emission. Every call nevertheless returns a new [`Subscription`],
    /// and unsubscribing any of them removes the listener from the key.
    pub fn on_listener<K>(&self, key: K, listener: &Listener<K::Payload>) -> Subscription
    where
        K: EventKey,
    {
        let added = self.registry.borrow_mut().insert(key.clone(), listener);

        trace!(key = ?key, added, "listener registered");

        // The subscription must not keep the listeners alive, so it only holds a weak
        // reference. Once the emitter is gone there is nothing left to unsubscribe from.
        let registry = Rc::downgrade(&self.registry);
        let listener = listener.clone();

        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                remove(&registry, &key, &listener);
            }
        })
    }

    /// Returns a value that registers listeners under `key`.
    ///
    /// This is a convenience for code that subscribes to one key in several places.
    #[must_use]
    pub fn on_key<K>(&self, key: K) -> Subscribable<K>
    where
        K: EventKey,
    {
        Subscribable {
            emitter: self.clone(),
            key,
        }
    }

    /// Removes `listener` from `key`. Does nothing if it is not registered there.
    pub fn off<K>(&self, key: &K, listener: &Listener<K::Payload>)
    where
        K: EventKey,
    {
        remove(&self.registry, key, listener);
    }

    /// Invokes every listener registered under `key` with `value`, before returning.
    ///
    /// Listeners run in registration order. If a listener panics, the panic propagates to the
    /// caller and the listeners after it are not invoked for this emission. The emitter stays
    /// fully usable afterwards.
    pub fn emit<K>(&self, key: &K, value: &K::Payload)
    where
        K: EventKey,
    {
        // The registry is released before any listener runs, so listeners may
        // subscribe and unsubscribe freely.
        let snapshot = self.registry.borrow().snapshot(key);

        if snapshot.is_empty() {
            return;
        }

        trace!(key = ?key, listeners = snapshot.len(), "emitting event");

        for listener in &snapshot {
            listener.call(value);
        }
    }

    /// Starts delivering `value` to every listener registered under `key`, returning a future
    /// that completes once all of them have been invoked.
    ///
    /// The listeners are selected immediately, but none of them runs before the returned future
    /// is polled. Each invocation is then deferred to a later poll; invocations are scheduled in
    /// registration order, but the executor decides the order in which they run. A
    /// panicking listener does not prevent the others from running; the future resolves to
    /// [`Error::ListenerFailed`][crate::Error::ListenerFailed] in that case.
    ///
    /// Dropping the future before it completes drops the invocations that have not run yet.
    /// Use [`spawn_emit()`][Self::spawn_emit] for invocations that run regardless.
    pub fn emit_async<K>(&self, key: &K, value: K::Payload) -> EmitAsync
    where
        K: EventKey,
    {
        let snapshot = self.registry.borrow().snapshot(key);

        trace!(key = ?key, listeners = snapshot.len(), "emitting event asynchronously");

        let value = Rc::new(value);
        let calls = snapshot
            .into_iter()
            .map(|listener| DeferredCall::new(listener, Rc::clone(&value)));

        EmitAsync::new(Box::new(key.clone()), join_all(calls).boxed_local())
    }

    /// Spawns one task per listener registered under `key` on `spawner`, returning a future
    /// that completes once all of them have been invoked.
    ///
    /// Unlike [`emit_async()`][Self::emit_async], the invocations are independent tasks: once
    /// spawned they run even if the returned future is dropped. A task that the executor drops
    /// without running it counts as a failed invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`][crate::Error::Spawn] if the spawner rejects a task. Tasks spawned
    /// before the rejection still run.
    ///
    /// # Example
    ///
    /// ```rust
    /// use emitter::{Emitter, EventKey};
    /// use futures::executor::LocalPool;
    ///
    /// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    /// struct Tick;
    ///
    /// impl EventKey for Tick {
    ///     type Payload = u64;
    /// }
    ///
    /// let emitter = Emitter::new();
    /// emitter.on(Tick, |tick: &u64| println!("tick {tick}"));
    ///
    /// let mut pool = LocalPool::new();
    /// let emission = emitter.spawn_emit(&pool.spawner(), &Tick, 1).unwrap();
    ///
    /// pool.run_until(emission).unwrap();
    /// ```
    pub fn spawn_emit<K, S>(&self, spawner: &S, key: &K, value: K::Payload) -> Result<EmitAsync>
    where
        K: EventKey,
        S: LocalSpawn + ?Sized,
    {
        let snapshot = self.registry.borrow().snapshot(key);

        trace!(key = ?key, listeners = snapshot.len(), "spawning event delivery");

        let value = Rc::new(value);
        let mut receivers = Vec::with_capacity(snapshot.len());

        for listener in snapshot {
            let (sender, receiver) = oneshot::channel::<Outcome>();
            let value = Rc::clone(&value);

            spawner.spawn_local(async move {
                // If the emission future is gone, nobody is interested in the outcome.
                drop(sender.send(invoke(&listener, &value)));
            })?;

            receivers.push(receiver);
        }

        let outcomes = join_all(receivers).map(|received| {
            received
                .into_iter()
                .map(|outcome| {
                    outcome.unwrap_or_else(|oneshot::Canceled| {
                        Err("listener task was dropped before it completed".to_string())
                    })
                })
                .collect::<Vec<Outcome>>()
        });

        Ok(EmitAsync::new(Box::new(key.clone()), outcomes.boxed_local()))
    }

    /// Number of distinct listeners currently registered under `key`.
    #[must_use]
    pub fn listener_count<K>(&self, key: &K) -> usize
    where
        K: EventKey,
    {
        self.registry.borrow().count(key)
    }

    /// Whether at least one listener is currently registered under `key`.
    #[must_use]
    pub fn has_listeners<K>(&self, key: &K) -> bool
    where
        K: EventKey,
    {
        self.listener_count(key) > 0
    }
}

impl Debug for Emitter {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("registry", &self.registry.borrow())
            .finish()
    }
}

fn remove<K: EventKey>(registry: &RefCell<Registry>, key: &K, listener: &Listener<K::Payload>) {
    let removed = registry.borrow_mut().remove(key, listener);

    trace!(key = ?key, removed = removed.is_some(), "listener removed");

    // Dropped only now that the registry is no longer borrowed.
    drop(removed);
}

/// Registers listeners under a fixed key of an [`Emitter`].
///
/// Obtained from [`Emitter::on_key()`].
///
/// # Example
///
/// ```rust
/// use emitter::{Emitter, EventKey};
///
/// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// struct Resized;
///
/// impl EventKey for Resized {
///     type Payload = (u16, u16);
/// }
///
/// let emitter = Emitter::new();
/// let on_resized = emitter.on_key(Resized);
///
/// let subscription = on_resized.subscribe(|(width, height): &(u16, u16)| {
///     println!("{width}x{height}");
/// });
/// assert!(emitter.has_listeners(&Resized));
///
/// subscription.unsubscribe();
/// assert!(!emitter.has_listeners(&Resized));
/// ```
#[derive(Clone)]
pub struct Subscribable<K: EventKey> {
    emitter: Emitter,
    key: K,
}

impl<K: EventKey> Subscribable<K> {
    /// Registers a callback under the key. See [`Emitter::on()`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&K::Payload) + 'static,
    {
        self.emitter.on(self.key.clone(), listener)
    }

    /// Registers `listener` under the key. See [`Emitter::on_listener()`].
    pub fn subscribe_listener(&self, listener: &Listener<K::Payload>) -> Subscription {
        self.emitter.on_listener(self.key.clone(), listener)
    }

    /// The key that listeners are registered under.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: EventKey> Debug for Subscribable<K> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("key", &self.key)
            .field("emitter", &self.emitter)
            .finish()
    }
}
