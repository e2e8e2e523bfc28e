use std::fmt::Debug;
use std::hash::Hash;

/// Identifies a partition of the event space and fixes the payload type delivered in it.
///
/// Listeners registered under a key are notified only by emissions to an equal key of the
/// same type. The compiler checks at every call site that listeners and emitted values match
/// the key's [`Payload`][Self::Payload].
///
/// A unit struct gives one key per type. An enum gives several keys that share a payload type.
/// Any number of key types can share one [`Emitter`][crate::Emitter].
///
/// # Example
///
/// ```rust
/// use emitter::EventKey;
///
/// /// A text message was received.
/// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// struct Message;
///
/// impl EventKey for Message {
///     type Payload = String;
/// }
///
/// /// Connection lifecycle transitions, all carrying the peer address.
/// #[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// enum Connection {
///     Opened,
///     Closed,
/// }
///
/// impl EventKey for Connection {
///     type Payload = std::net::SocketAddr;
/// }
/// ```
pub trait EventKey: Clone + Debug + Eq + Hash + 'static {
    /// The value passed to listeners of this key.
    type Payload: 'static;
}
