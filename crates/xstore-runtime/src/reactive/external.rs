#![forbid(unsafe_code)]

//! The consumer-facing read contract shared by every store.
//!
//! A rendering layer needs three operations from an external store:
//! register a change listener, pull the live snapshot, and pull a snapshot
//! that is valid before any platform context exists. After a listener fires,
//! the next [`snapshot()`](ExternalStore::snapshot) must reflect the change
//! that triggered it.

use std::fmt;
use std::rc::Rc;

use super::listener::{Listener, Subscription};

/// Subscribe / snapshot / server-snapshot triple.
pub trait ExternalStore {
    /// The value consumers read.
    type Snapshot;

    /// Register `listener`; the returned guard unregisters it.
    fn subscribe(&self, listener: Listener) -> Subscription;

    /// The current value.
    fn snapshot(&self) -> Self::Snapshot;

    /// A deterministic value for contexts without a live platform.
    fn server_snapshot(&self) -> Self::Snapshot;
}

impl<S: ExternalStore + ?Sized> ExternalStore for Rc<S> {
    type Snapshot = S::Snapshot;

    fn subscribe(&self, listener: Listener) -> Subscription {
        (**self).subscribe(listener)
    }

    fn snapshot(&self) -> Self::Snapshot {
        (**self).snapshot()
    }

    fn server_snapshot(&self) -> Self::Snapshot {
        (**self).server_snapshot()
    }
}

/// Adapter combinators for [`ExternalStore`].
pub trait ExternalStoreExt: ExternalStore + Sized {
    /// Project every snapshot (live and server) through `selector`.
    ///
    /// The selector must be a pure function of its input; it runs on every
    /// read.
    fn map<R, F>(self, selector: F) -> Mapped<Self, R>
    where
        F: Fn(Self::Snapshot) -> R + 'static,
    {
        Mapped {
            store: self,
            selector: Rc::new(selector),
        }
    }
}

impl<S: ExternalStore> ExternalStoreExt for S {}

/// A store whose snapshots are projected through a selector.
pub struct Mapped<S: ExternalStore, R> {
    store: S,
    selector: Rc<dyn Fn(S::Snapshot) -> R>,
}

impl<S: ExternalStore + Clone, R> Clone for Mapped<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            selector: Rc::clone(&self.selector),
        }
    }
}

impl<S: ExternalStore, R> ExternalStore for Mapped<S, R> {
    type Snapshot = R;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.store.subscribe(listener)
    }

    fn snapshot(&self) -> R {
        (self.selector)(self.store.snapshot())
    }

    fn server_snapshot(&self) -> R {
        (self.selector)(self.store.server_snapshot())
    }
}

impl<S: ExternalStore + fmt::Debug, R> fmt::Debug for Mapped<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapped").field("store", &self.store).finish()
    }
}
