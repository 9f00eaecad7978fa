#![forbid(unsafe_code)]

//! Subscription multiplexing and notification batching for external stores.
//!
//! This module provides the primitives every store in the workspace is built
//! from:
//!
//! - [`Scheduler`]: coalesces change notifications into one delivery per
//!   refresh tick ([`FrameScheduler`], [`FrameClock`]) or runs them
//!   synchronously ([`ImmediateScheduler`]).
//! - [`KeyedMultiplexer`]: one platform resource per key, acquired on the
//!   first listener and released on the last.
//! - [`SingletonMultiplexer`]: the same for a single process-wide resource.
//! - [`PresenceTracker`]: a reference-counted gate around a side effect.
//! - [`SyncStore`]: shared state with synchronous fan-out and selectors.
//! - [`ExternalStore`] / [`Reader`]: the consumer read contract and a
//!   pull-based consumer built on it.
//!
//! # Architecture
//!
//! All handles use `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Registries belong to the multiplexer instance that created them; nothing
//! here is global. Listener sets are consulted when a delivery runs, never
//! captured when it is scheduled.
//!
//! # Invariants
//!
//! 1. A platform resource is held for a key iff that key has listeners.
//! 2. N change signals before a tick produce one notification per listener.
//! 3. A listener is never invoked after it was removed.
//! 4. Listeners of one source are notified in registration order.
//! 5. `SyncStore::set_state` notifies before it returns.

pub mod external;
pub mod keyed;
pub mod listener;
pub mod presence;
pub mod reader;
pub mod scheduler;
pub mod singleton;
pub mod store;

pub use external::{ExternalStore, ExternalStoreExt, Mapped};
pub use keyed::{ChangeHandler, EventSource, KeyedMultiplexer, KeyedView, MuxStats};
pub use listener::{Listener, ListenerSet, Subscription};
pub use presence::{PresenceGuard, PresenceTracker};
pub use reader::Reader;
pub use scheduler::{ChannelId, Deliver, FrameClock, FrameScheduler, ImmediateScheduler, Scheduler};
pub use singleton::SingletonMultiplexer;
pub use store::{Merge, Selected, SyncStore};
