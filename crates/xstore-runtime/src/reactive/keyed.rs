#![forbid(unsafe_code)]

//! Keyed subscription multiplexer.
//!
//! # Design
//!
//! A [`KeyedMultiplexer`] owns a registry mapping each active key to a
//! subscription record: the acquired platform handle, the listeners for that
//! key, and the notification channel used with the [`Scheduler`].
//!
//! The first `on(key, ..)` acquires the underlying resource through
//! [`EventSource::attach`]; the `off` that empties the key's listener set
//! releases it through [`EventSource::detach`] and removes the record. Change
//! signals from the platform go through the scheduler, and the delivery looks
//! the listener set up in the registry **when it runs**. Listeners that join
//! before the tick are notified; listeners that leave before the tick are not.
//!
//! # Invariants
//!
//! 1. A record exists for a key iff that key has at least one listener.
//! 2. `attach` runs exactly once per 0→1 transition and `detach` exactly once
//!    per 1→0 transition of a key's listener count.
//! 3. A listener is never invoked after its `off` returned.
//! 4. Within one delivery, listeners run in registration order, each once.
//!
//! # Failure Modes
//!
//! - **Mismatched `off`**: removing an unknown key or listener is a no-op.
//! - **Stale delivery**: a delivery scheduled for a record that was released
//!   (and possibly re-acquired under a new channel) before the tick is
//!   dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap;

use super::external::ExternalStore;
use super::listener::{Listener, ListenerSet, Subscription};
use super::scheduler::{ChannelId, Scheduler};

/// Callback a source invokes when its underlying value changed.
pub type ChangeHandler = Rc<dyn Fn()>;

/// A family of platform resources addressed by key.
///
/// This is the whole surface the multiplexer needs from a platform: attach a
/// change handler, detach it, and read the current value.
pub trait EventSource<K> {
    /// The snapshot type read for a key.
    type Value;
    /// Whatever must be kept to release an acquired resource.
    type Handle;

    /// Acquire the resource for `key` and route its change signals to
    /// `on_change`.
    fn attach(&self, key: &K, on_change: ChangeHandler) -> Self::Handle;

    /// Release a resource previously returned by [`attach`](Self::attach).
    fn detach(&self, key: &K, handle: Self::Handle);

    /// Read the live value, or `None` when no platform context exists.
    fn read(&self, key: &K) -> Option<Self::Value>;

    /// The value reported without a platform context.
    fn server_default(&self, key: &K) -> Self::Value;
}

/// Lifetime counters for a multiplexer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxStats {
    /// Resources acquired (0→1 transitions).
    pub acquisitions: u64,
    /// Resources released (1→0 transitions).
    pub releases: u64,
    /// Raw change signals received from sources.
    pub raw_events: u64,
    /// Scheduled fan-outs that ran.
    pub deliveries: u64,
    /// Individual listener invocations.
    pub notifications: u64,
}

impl MuxStats {
    /// Resources currently held.
    #[must_use]
    pub fn held(&self) -> u64 {
        self.acquisitions.saturating_sub(self.releases)
    }
}

struct Record<H> {
    channel: ChannelId,
    handle: H,
    listeners: ListenerSet,
}

struct MuxInner<K, S: EventSource<K>> {
    source: S,
    scheduler: Rc<dyn Scheduler>,
    registry: RefCell<AHashMap<K, Record<S::Handle>>>,
    stats: Cell<MuxStats>,
}

impl<K, S> MuxInner<K, S>
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
    S: EventSource<K> + 'static,
{
    fn bump(&self, f: impl FnOnce(&mut MuxStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn deliver(&self, key: &K, channel: ChannelId) {
        let listeners = {
            let registry = self.registry.borrow();
            match registry.get(key) {
                Some(record) if record.channel == channel => record.listeners.snapshot(),
                _ => {
                    tracing::trace!(?key, %channel, "dropping delivery for released record");
                    return;
                }
            }
        };
        self.bump(|s| s.deliveries += 1);
        tracing::trace!(?key, %channel, listeners = listeners.len(), "fan-out");
        for listener in listeners {
            // An earlier listener in this batch may have removed this one.
            if self.is_listening(key, channel, &listener) {
                self.bump(|s| s.notifications += 1);
                listener.notify();
            }
        }
    }

    fn is_listening(&self, key: &K, channel: ChannelId, listener: &Listener) -> bool {
        self.registry
            .borrow()
            .get(key)
            .is_some_and(|r| r.channel == channel && r.listeners.contains(listener))
    }

    /// Detach a record already taken out of the registry.
    ///
    /// The record is consumed, so each acquisition is torn down at most once.
    fn release(&self, key: &K, record: Record<S::Handle>) {
        self.source.detach(key, record.handle);
        self.bump(|s| s.releases += 1);
        tracing::debug!(?key, channel = %record.channel, "released source");
    }
}

impl<K, S: EventSource<K>> Drop for MuxInner<K, S> {
    fn drop(&mut self) {
        let records: Vec<_> = self.registry.get_mut().drain().collect();
        for (key, record) in records {
            self.source.detach(&key, record.handle);
        }
    }
}

fn change_handler<K, S>(inner: &Rc<MuxInner<K, S>>, key: &K, channel: ChannelId) -> ChangeHandler
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
    S: EventSource<K> + 'static,
{
    let weak = Rc::downgrade(inner);
    let key = key.clone();
    Rc::new(move || {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        inner.bump(|s| s.raw_events += 1);
        let target = Rc::downgrade(&inner);
        let key = key.clone();
        inner.scheduler.schedule(
            channel,
            Box::new(move || {
                if let Some(inner) = target.upgrade() {
                    inner.deliver(&key, channel);
                }
            }),
        );
    })
}

/// Shares one platform resource per key among any number of listeners.
///
/// Cloning yields another handle to the **same** registry.
pub struct KeyedMultiplexer<K, S: EventSource<K>> {
    inner: Rc<MuxInner<K, S>>,
}

impl<K, S: EventSource<K>> Clone for KeyedMultiplexer<K, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K, S> KeyedMultiplexer<K, S>
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
    S: EventSource<K> + 'static,
{
    /// Create a multiplexer over `source`, delivering through `scheduler`.
    pub fn new(source: S, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            inner: Rc::new(MuxInner {
                source,
                scheduler: Rc::new(scheduler),
                registry: RefCell::new(AHashMap::new()),
                stats: Cell::new(MuxStats::default()),
            }),
        }
    }

    /// Register `listener` for `key`, acquiring the resource on first use.
    ///
    /// Returns `false` if `listener` was already registered for `key`.
    pub fn on(&self, key: K, listener: Listener) -> bool {
        if let Some(record) = self.inner.registry.borrow_mut().get_mut(&key) {
            return record.listeners.insert(listener);
        }

        let channel = ChannelId::next();
        let handler = change_handler(&self.inner, &key, channel);
        let handle = self.inner.source.attach(&key, handler);
        self.inner.bump(|s| s.acquisitions += 1);

        let mut registry = self.inner.registry.borrow_mut();
        let reentered = registry
            .get_mut(&key)
            .map(|record| record.listeners.insert(listener.clone()));
        if let Some(added) = reentered {
            // `attach` subscribed this key itself; keep that record.
            drop(registry);
            self.inner.source.detach(&key, handle);
            self.inner.bump(|s| s.releases += 1);
            return added;
        }

        let mut listeners = ListenerSet::new();
        listeners.insert(listener);
        tracing::debug!(?key, %channel, "acquired source");
        registry.insert(
            key,
            Record {
                channel,
                handle,
                listeners,
            },
        );
        true
    }

    /// Unregister `listener` from `key`, releasing the resource when it was
    /// the last one.
    ///
    /// Returns `false` (and does nothing) if the pair was not registered.
    pub fn off(&self, key: &K, listener: &Listener) -> bool {
        let released = {
            let mut registry = self.inner.registry.borrow_mut();
            let Some(record) = registry.get_mut(key) else {
                return false;
            };
            if !record.listeners.remove(listener) {
                return false;
            }
            if record.listeners.is_empty() {
                registry.remove(key)
            } else {
                None
            }
        };
        if let Some(record) = released {
            self.inner.release(key, record);
        }
        true
    }

    /// [`on`](Self::on) with a guard that calls [`off`](Self::off) on drop.
    ///
    /// If `listener` is already registered for `key` the guard is inert; the
    /// earlier registration stays in charge of removal.
    pub fn subscribe(&self, key: K, listener: Listener) -> Subscription {
        if !self.on(key.clone(), listener.clone()) {
            return Subscription::inert();
        }
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                KeyedMultiplexer { inner }.off(&key, &listener);
            }
        })
    }

    /// Pull the current value for `key`. Works with zero subscribers.
    pub fn get(&self, key: &K) -> S::Value {
        let source = &self.inner.source;
        source.read(key).unwrap_or_else(|| source.server_default(key))
    }

    /// The value for `key` without a platform context.
    pub fn server_snapshot(&self, key: &K) -> S::Value {
        self.inner.source.server_default(key)
    }

    /// A single-key view implementing [`ExternalStore`].
    #[must_use]
    pub fn view(&self, key: K) -> KeyedView<K, S> {
        KeyedView {
            mux: self.clone(),
            key,
        }
    }

    /// Whether a record (and so an acquired resource) exists for `key`.
    #[must_use]
    pub fn is_active(&self, key: &K) -> bool {
        self.inner.registry.borrow().contains_key(key)
    }

    #[must_use]
    pub fn listener_count(&self, key: &K) -> usize {
        self.inner
            .registry
            .borrow()
            .get(key)
            .map_or(0, |r| r.listeners.len())
    }

    /// Number of keys with an acquired resource.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    #[must_use]
    pub fn stats(&self) -> MuxStats {
        self.inner.stats.get()
    }

    /// The underlying event source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.inner.source
    }
}

impl<K, S: EventSource<K>> fmt::Debug for KeyedMultiplexer<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedMultiplexer")
            .field("active_keys", &self.inner.registry.borrow().len())
            .field("stats", &self.inner.stats.get())
            .finish()
    }
}

/// One key of a [`KeyedMultiplexer`], as an [`ExternalStore`].
pub struct KeyedView<K, S: EventSource<K>> {
    mux: KeyedMultiplexer<K, S>,
    key: K,
}

impl<K: Clone, S: EventSource<K>> Clone for KeyedView<K, S> {
    fn clone(&self) -> Self {
        Self {
            mux: self.mux.clone(),
            key: self.key.clone(),
        }
    }
}

impl<K, S> KeyedView<K, S>
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
    S: EventSource<K> + 'static,
{
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K, S> ExternalStore for KeyedView<K, S>
where
    K: Eq + Hash + Clone + fmt::Debug + 'static,
    S: EventSource<K> + 'static,
{
    type Snapshot = S::Value;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.mux.subscribe(self.key.clone(), listener)
    }

    fn snapshot(&self) -> S::Value {
        self.mux.get(&self.key)
    }

    fn server_snapshot(&self) -> S::Value {
        self.mux.server_snapshot(&self.key)
    }
}

impl<K: fmt::Debug, S: EventSource<K>> fmt::Debug for KeyedView<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedView").field("key", &self.key).finish()
    }
}
