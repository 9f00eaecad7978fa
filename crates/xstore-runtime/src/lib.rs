#![forbid(unsafe_code)]

//! Runtime for external stores: subscription multiplexing, frame-coalesced
//! notification delivery, presence gating, and synchronized state.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use xstore_runtime::reactive::{Listener, SyncStore};
//!
//! let store = SyncStore::new(0_i64);
//! let hits = Rc::new(Cell::new(0));
//! let h = Rc::clone(&hits);
//! let _sub = store.subscribe(Listener::new(move || h.set(h.get() + 1)));
//!
//! store.set_state(3);
//! assert_eq!(*store.get_state(), 3);
//! assert_eq!(hits.get(), 1);
//! ```

pub mod config;
pub mod error;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ConfigError, Result};
pub use reactive::{
    ExternalStore, ExternalStoreExt, FrameClock, FrameScheduler, ImmediateScheduler,
    KeyedMultiplexer, Listener, PresenceGuard, PresenceTracker, Reader, Scheduler,
    SingletonMultiplexer, Subscription, SyncStore,
};
