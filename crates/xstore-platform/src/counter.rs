#![forbid(unsafe_code)]

//! Counter stores.
//!
//! Two flavors of the same idea:
//!
//! - [`Counter`]: a bare value with an identity listener set and
//!   synchronous notification.
//! - [`CounterStore`]: a [`SyncStore`] of [`CounterState`] with named
//!   actions and derived views ([`CounterSummary`]).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use xstore_runtime::reactive::{
    ExternalStore, Listener, ListenerSet, Merge, Selected, Subscription, SyncStore,
};

use crate::error::ParseCountError;

// ─── Counter ─────────────────────────────────────────────────────────────────

struct CounterInner {
    value: Cell<i64>,
    listeners: RefCell<ListenerSet>,
}

impl CounterInner {
    fn set(&self, value: i64) {
        self.value.set(value);
        let listeners = self.listeners.borrow().snapshot();
        for listener in listeners {
            if self.listeners.borrow().contains(&listener) {
                listener.notify();
            }
        }
    }
}

/// A shared integer starting at 0.
///
/// Cloning yields another handle to the same value.
#[derive(Clone)]
pub struct Counter {
    inner: Rc<CounterInner>,
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(CounterInner {
                value: Cell::new(0),
                listeners: RefCell::new(ListenerSet::new()),
            }),
        }
    }

    #[must_use]
    pub fn get(&self) -> i64 {
        self.inner.value.get()
    }

    /// Register `listener`. Returns `false` if it was already registered.
    pub fn on(&self, listener: Listener) -> bool {
        self.inner.listeners.borrow_mut().insert(listener)
    }

    /// Unregister `listener`. Unknown listeners are ignored.
    pub fn off(&self, listener: &Listener) -> bool {
        self.inner.listeners.borrow_mut().remove(listener)
    }

    pub fn increment(&self) {
        self.inner.set(self.get().saturating_add(1));
    }

    pub fn decrement(&self) {
        self.inner.set(self.get().saturating_sub(1));
    }

    pub fn reset(&self) {
        self.inner.set(0);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl ExternalStore for Counter {
    type Snapshot = i64;

    fn subscribe(&self, listener: Listener) -> Subscription {
        if !self.on(listener.clone()) {
            return Subscription::inert();
        }
        let weak: Weak<CounterInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().remove(&listener);
            }
        })
    }

    fn snapshot(&self) -> i64 {
        self.get()
    }

    fn server_snapshot(&self) -> i64 {
        0
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("value", &self.get())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ─── CounterStore ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CounterState {
    pub count: i64,
}

/// Partial update of [`CounterState`]; `None` keeps the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterPatch {
    pub count: Option<i64>,
}

impl From<CounterState> for CounterPatch {
    fn from(state: CounterState) -> Self {
        Self {
            count: Some(state.count),
        }
    }
}

impl Merge for CounterState {
    type Partial = CounterPatch;

    fn merge(&self, partial: CounterPatch) -> Self {
        Self {
            count: partial.count.unwrap_or(self.count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Parity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Even => "even",
            Self::Odd => "odd",
        }
    }
}

impl Sign {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Zero => "zero",
            Self::Positive => "positive",
        }
    }
}

/// Display-oriented facts about a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterSummary {
    pub count: i64,
    pub parity: Parity,
    pub sign: Sign,
}

impl CounterSummary {
    #[must_use]
    pub fn of(count: i64) -> Self {
        Self {
            count,
            parity: if count % 2 == 0 { Parity::Even } else { Parity::Odd },
            sign: match count.signum() {
                1 => Sign::Positive,
                -1 => Sign::Negative,
                _ => Sign::Zero,
            },
        }
    }
}

impl fmt::Display for CounterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.count,
            self.parity.as_str(),
            self.sign.as_str()
        )
    }
}

/// Counter state with named actions. Every action notifies synchronously.
#[derive(Debug, Clone)]
pub struct CounterStore {
    store: SyncStore<CounterState>,
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::new(CounterState::default())
    }
}

impl CounterStore {
    #[must_use]
    pub fn new(initial: CounterState) -> Self {
        Self {
            store: SyncStore::new(initial),
        }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &SyncStore<CounterState> {
        &self.store
    }

    #[must_use]
    pub fn get(&self) -> i64 {
        self.store.select(|s| s.count)
    }

    /// The count as its own store.
    #[must_use]
    pub fn count(&self) -> Selected<CounterState, i64> {
        self.store.selected(|s| s.count)
    }

    /// Parity and sign of the count as a store.
    #[must_use]
    pub fn summary(&self) -> Selected<CounterState, CounterSummary> {
        self.store.selected(|s| CounterSummary::of(s.count))
    }

    pub fn increment(&self) {
        self.store.update(|s| CounterPatch {
            count: Some(s.count.saturating_add(1)),
        });
    }

    pub fn decrement(&self) {
        self.store.update(|s| CounterPatch {
            count: Some(s.count.saturating_sub(1)),
        });
    }

    /// Restore the initial state.
    pub fn reset(&self) {
        self.store.set_state((*self.store.initial_state()).into());
    }

    pub fn set_count(&self, count: i64) {
        self.store.set_state(CounterPatch { count: Some(count) });
    }

    /// Parse `input` as a whole number and set the count to it.
    ///
    /// On rejection the state is untouched and nobody is notified.
    pub fn set_count_from_input(&self, input: &str) -> Result<i64, ParseCountError> {
        let count = input
            .trim()
            .parse::<i64>()
            .map_err(|source| ParseCountError {
                input: input.to_string(),
                source,
            })?;
        self.set_count(count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xstore_runtime::reactive::Reader;

    #[test]
    fn counter_notifies_each_listener_once() {
        let counter = Counter::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let listener = Listener::new(move || h.set(h.get() + 1));
        assert!(counter.on(listener.clone()));
        assert!(!counter.on(listener.clone()));

        counter.increment();
        counter.increment();
        counter.decrement();
        assert_eq!(counter.get(), 1);
        assert_eq!(hits.get(), 3);

        counter.off(&listener);
        counter.reset();
        assert_eq!(counter.get(), 0);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn counter_off_unknown_is_noop() {
        let counter = Counter::new();
        assert!(!counter.off(&Listener::new(|| {})));
        assert_eq!(counter.server_snapshot(), 0);
    }

    #[test]
    fn counter_subscription_guard() {
        let counter = Counter::new();
        let reader = Reader::new(&counter);
        assert_eq!(counter.listener_count(), 1);
        counter.increment();
        assert_eq!(reader.get(), 1);
        drop(reader);
        assert_eq!(counter.listener_count(), 0);
    }

    #[test]
    fn reset_restores_initial_state() {
        let counter = CounterStore::new(CounterState { count: 5 });
        counter.increment();
        counter.set_count(-3);
        assert_eq!(counter.get(), -3);
        counter.reset();
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn rejected_input_leaves_state_alone() {
        let counter = CounterStore::default();
        let reader = Reader::new(&counter.count());
        assert_eq!(counter.set_count_from_input(" 42 "), Ok(42));
        assert_eq!(reader.get(), 42);

        let before = counter.store().notifications();
        let err = counter.set_count_from_input("4.5").unwrap_err();
        assert_eq!(err.input, "4.5");
        assert!(counter.set_count_from_input("").is_err());
        assert!(counter.set_count_from_input("abc").is_err());
        assert_eq!(counter.get(), 42);
        assert_eq!(counter.store().notifications(), before);
    }

    #[test]
    fn summary_renders_only_when_facts_change() {
        let counter = CounterStore::default();
        let summary = Reader::new(&counter.summary());
        assert_eq!(summary.get().sign, Sign::Zero);

        counter.increment();
        assert_eq!(summary.get(), CounterSummary::of(1));
        counter.set_count(1);
        assert_eq!(summary.renders(), 1);

        counter.set_count(-4);
        assert_eq!(summary.get().parity, Parity::Even);
        assert_eq!(summary.get().sign, Sign::Negative);
        assert_eq!(summary.get().to_string(), "-4 (even, negative)");
    }

    #[test]
    fn server_count_uses_initial_state() {
        let counter = CounterStore::new(CounterState { count: 2 });
        counter.set_count(9);
        assert_eq!(counter.count().server_snapshot(), 2);
        assert_eq!(counter.count().snapshot(), 9);
    }
}
