#![forbid(unsafe_code)]

//! Singleton subscription multiplexer: one process-wide resource shared by
//! every listener.
//!
//! This is a [`KeyedMultiplexer`] with the unit key. The acquire-on-first,
//! release-on-last discipline and the delivery-time listener lookup are
//! identical.

use std::fmt;

use super::external::ExternalStore;
use super::keyed::{EventSource, KeyedMultiplexer, MuxStats};
use super::listener::{Listener, Subscription};
use super::scheduler::Scheduler;

/// Shares a single platform resource among any number of listeners.
///
/// Cloning yields another handle to the same registry.
pub struct SingletonMultiplexer<S: EventSource<()>> {
    mux: KeyedMultiplexer<(), S>,
}

impl<S: EventSource<()>> Clone for SingletonMultiplexer<S> {
    fn clone(&self) -> Self {
        Self {
            mux: self.mux.clone(),
        }
    }
}

impl<S: EventSource<()> + 'static> SingletonMultiplexer<S> {
    pub fn new(source: S, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            mux: KeyedMultiplexer::new(source, scheduler),
        }
    }

    /// Register `listener`; the first listener acquires the resource.
    pub fn on(&self, listener: Listener) -> bool {
        self.mux.on((), listener)
    }

    /// Unregister `listener`; the last listener releases the resource.
    pub fn off(&self, listener: &Listener) -> bool {
        self.mux.off(&(), listener)
    }

    /// Pull the current value.
    pub fn get(&self) -> S::Value {
        self.mux.get(&())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mux.is_active(&())
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.mux.listener_count(&())
    }

    #[must_use]
    pub fn stats(&self) -> MuxStats {
        self.mux.stats()
    }

    #[must_use]
    pub fn source(&self) -> &S {
        self.mux.source()
    }
}

impl<S: EventSource<()> + 'static> ExternalStore for SingletonMultiplexer<S> {
    type Snapshot = S::Value;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.mux.subscribe((), listener)
    }

    fn snapshot(&self) -> S::Value {
        self.mux.get(&())
    }

    fn server_snapshot(&self) -> S::Value {
        self.mux.server_snapshot(&())
    }
}

impl<S: EventSource<()>> fmt::Debug for SingletonMultiplexer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonMultiplexer")
            .field("mux", &self.mux)
            .finish()
    }
}
