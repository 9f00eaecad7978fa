#![forbid(unsafe_code)]

//! Synchronized store: shared state with synchronous fan-out.
//!
//! # Design
//!
//! [`SyncStore<T>`] holds the current state behind an `Rc<T>` that is
//! replaced, never mutated in place. [`set_state`](SyncStore::set_state)
//! shallow-merges a partial update through [`Merge`], swaps the new value in,
//! and then notifies every subscriber before returning. Store updates come
//! from explicit application actions, so they bypass the frame scheduler.
//!
//! [`Selected`] projects the state through a pure selector and implements
//! [`ExternalStore`]. Its server snapshot applies the selector to the
//! **initial** state, so pre-hydration output does not depend on mutations
//! made after construction.
//!
//! # Invariants
//!
//! 1. Every `set_state` produces exactly one notification per subscription,
//!    delivered before `set_state` returns.
//! 2. Subscriptions are independent: registering the same listener twice
//!    yields two notifications per change and two separate unsubscribes.
//! 3. A subscription removed during a notification pass is not invoked for
//!    the remainder of that pass.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::external::ExternalStore;
use super::listener::{Listener, Subscription};

/// Shallow merge of a partial update into a state value.
pub trait Merge: Sized {
    /// The partial update type; fields left unset keep their current value.
    type Partial;

    /// Produce the successor state.
    fn merge(&self, partial: Self::Partial) -> Self;
}

macro_rules! impl_replace_merge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Merge for $ty {
                type Partial = $ty;

                fn merge(&self, partial: $ty) -> $ty {
                    partial
                }
            }
        )*
    };
}

impl_replace_merge!(bool, i32, i64, u32, u64, usize, f64, String);

struct StoreInner<T> {
    initial: Rc<T>,
    state: RefCell<Rc<T>>,
    subscribers: RefCell<Vec<(u64, Listener)>>,
    next_id: Cell<u64>,
    notifications: Cell<u64>,
}

impl<T> StoreInner<T> {
    fn is_subscribed(&self, id: u64) -> bool {
        self.subscribers.borrow().iter().any(|(sid, _)| *sid == id)
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
    }

    fn notify(&self) {
        let subscribers = self.subscribers.borrow().clone();
        tracing::trace!(subscribers = subscribers.len(), "store notify");
        for (id, listener) in subscribers {
            if self.is_subscribed(id) {
                self.notifications.set(self.notifications.get() + 1);
                listener.notify();
            }
        }
    }
}

/// Shared mutable state with get / set / subscribe.
///
/// Cloning yields another handle to the same state.
pub struct SyncStore<T> {
    inner: Rc<StoreInner<T>>,
}

impl<T> Clone for SyncStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Merge + 'static> SyncStore<T> {
    pub fn new(initial: T) -> Self {
        let initial = Rc::new(initial);
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::clone(&initial)),
                initial,
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                notifications: Cell::new(0),
            }),
        }
    }

    /// The current state.
    #[must_use]
    pub fn get_state(&self) -> Rc<T> {
        Rc::clone(&self.inner.state.borrow())
    }

    /// The state the store was constructed with.
    #[must_use]
    pub fn initial_state(&self) -> Rc<T> {
        Rc::clone(&self.inner.initial)
    }

    /// Merge `partial` into the state and notify all subscribers.
    pub fn set_state(&self, partial: T::Partial) {
        let next = Rc::new(self.inner.state.borrow().merge(partial));
        *self.inner.state.borrow_mut() = next;
        self.inner.notify();
    }

    /// Compute a partial update from the current state, then apply it.
    pub fn update(&self, f: impl FnOnce(&T) -> T::Partial) {
        let partial = f(&self.get_state());
        self.set_state(partial);
    }

    /// Replace the whole state and notify.
    pub fn replace(&self, state: T) {
        *self.inner.state.borrow_mut() = Rc::new(state);
        self.inner.notify();
    }

    /// Register `listener`. Every call is an independent subscription.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.subscribers.borrow_mut().push((id, listener));

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.unsubscribe(id);
            }
        })
    }

    /// Read a projection of the current state.
    pub fn select<R>(&self, selector: impl FnOnce(&T) -> R) -> R {
        selector(&self.inner.state.borrow())
    }

    /// A derived store over `selector`.
    #[must_use]
    pub fn selected<R>(&self, selector: impl Fn(&T) -> R + 'static) -> Selected<T, R> {
        Selected {
            store: self.clone(),
            selector: Rc::new(selector),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Total listener invocations so far.
    #[must_use]
    pub fn notifications(&self) -> u64 {
        self.inner.notifications.get()
    }
}

impl<T: Merge + 'static> ExternalStore for SyncStore<T> {
    type Snapshot = Rc<T>;

    fn subscribe(&self, listener: Listener) -> Subscription {
        SyncStore::subscribe(self, listener)
    }

    fn snapshot(&self) -> Rc<T> {
        self.get_state()
    }

    fn server_snapshot(&self) -> Rc<T> {
        self.initial_state()
    }
}

impl<T: fmt::Debug> fmt::Debug for SyncStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncStore")
            .field("state", &self.inner.state.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

/// A selector applied to a [`SyncStore`].
pub struct Selected<T, R> {
    store: SyncStore<T>,
    selector: Rc<dyn Fn(&T) -> R>,
}

impl<T, R> Clone for Selected<T, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            selector: Rc::clone(&self.selector),
        }
    }
}

impl<T: Merge + 'static, R> Selected<T, R> {
    /// The projected current value.
    pub fn get(&self) -> R {
        self.store.select(|s| (self.selector)(s))
    }

    #[must_use]
    pub fn store(&self) -> &SyncStore<T> {
        &self.store
    }
}

impl<T: Merge + 'static, R> ExternalStore for Selected<T, R> {
    type Snapshot = R;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.store.subscribe(listener)
    }

    fn snapshot(&self) -> R {
        self.get()
    }

    fn server_snapshot(&self) -> R {
        (self.selector)(&self.store.inner.initial)
    }
}

impl<T, R> fmt::Debug for Selected<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selected").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Prefs {
        theme: &'static str,
        volume: u8,
    }

    #[derive(Default)]
    struct PrefsPatch {
        theme: Option<&'static str>,
        volume: Option<u8>,
    }

    impl Merge for Prefs {
        type Partial = PrefsPatch;

        fn merge(&self, p: PrefsPatch) -> Self {
            Self {
                theme: p.theme.unwrap_or(self.theme),
                volume: p.volume.unwrap_or(self.volume),
            }
        }
    }

    fn prefs() -> SyncStore<Prefs> {
        SyncStore::new(Prefs {
            theme: "light",
            volume: 5,
        })
    }

    #[test]
    fn set_state_merges_shallowly() {
        let store = prefs();
        store.set_state(PrefsPatch {
            volume: Some(9),
            ..PrefsPatch::default()
        });
        assert_eq!(
            *store.get_state(),
            Prefs {
                theme: "light",
                volume: 9
            }
        );
    }

    #[test]
    fn notification_is_synchronous_and_sees_new_state() {
        let store = prefs();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = store.clone();
        let log = Rc::clone(&seen);
        let _sub = store.subscribe(Listener::new(move || log.borrow_mut().push(s.get_state().volume)));

        store.set_state(PrefsPatch {
            volume: Some(1),
            ..PrefsPatch::default()
        });
        assert_eq!(*seen.borrow(), vec![1]);
        store.update(|p| PrefsPatch {
            volume: Some(p.volume + 1),
            ..PrefsPatch::default()
        });
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn duplicate_registrations_are_independent() {
        let store = SyncStore::new(0_i64);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let listener = Listener::new(move || h.set(h.get() + 1));

        let first = store.subscribe(listener.clone());
        let second = store.subscribe(listener);
        store.set_state(1);
        assert_eq!(hits.get(), 2);

        first.unsubscribe();
        store.set_state(2);
        assert_eq!(hits.get(), 3);
        assert_eq!(store.subscriber_count(), 1);
        drop(second);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_during_notify_skips_remaining_call() {
        let store = SyncStore::new(0_i64);
        let hits = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let v = Rc::clone(&victim);
        let _killer = store.subscribe(Listener::new(move || {
            v.borrow_mut().take();
        }));
        let h = Rc::clone(&hits);
        *victim.borrow_mut() = Some(store.subscribe(Listener::new(move || h.set(h.get() + 1))));

        store.set_state(1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn selector_server_snapshot_uses_initial_state() {
        let store = prefs();
        let volume = store.selected(|p| p.volume);
        store.set_state(PrefsPatch {
            volume: Some(11),
            ..PrefsPatch::default()
        });
        assert_eq!(volume.snapshot(), 11);
        assert_eq!(volume.server_snapshot(), 5);
        assert_eq!(store.server_snapshot().volume, 5);
    }

    #[test]
    fn nested_set_state_from_listener_is_delivered() {
        let store = SyncStore::new(0_i64);
        let s = store.clone();
        let _clamp = store.subscribe(Listener::new(move || {
            if *s.get_state() > 10 {
                s.set_state(10);
            }
        }));
        store.set_state(42);
        assert_eq!(*store.get_state(), 10);
        assert_eq!(store.notifications(), 2);
    }
}
