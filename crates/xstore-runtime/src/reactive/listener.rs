#![forbid(unsafe_code)]

//! Listener identity, ordered listener sets, and RAII subscription guards.
//!
//! # Design
//!
//! A [`Listener`] is a reference-counted zero-argument callback. Identity is
//! the allocation: clones of one `Listener` compare equal, two listeners built
//! from identical closures do not. This mirrors the "same callback reference"
//! rule consumers rely on when they call `off` with the callback they passed
//! to `on`.
//!
//! [`ListenerSet`] keeps insertion order and rejects duplicates by identity.
//!
//! [`Subscription`] runs its cancel action exactly once: on
//! [`unsubscribe`](Subscription::unsubscribe) or on drop, whichever comes
//! first.

use std::fmt;
use std::rc::Rc;

/// A zero-argument change callback supplied by a consumer.
///
/// Listeners carry no payload. After being notified, the consumer pulls the
/// current snapshot itself.
#[derive(Clone)]
pub struct Listener {
    callback: Rc<dyn Fn()>,
}

impl Listener {
    /// Wrap a callback in a new listener identity.
    pub fn new(callback: impl Fn() + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Invoke the callback.
    pub fn notify(&self) {
        (self.callback)();
    }

    /// Whether `self` and `other` are the same listener.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Insertion-ordered set of listeners, deduplicated by identity.
#[derive(Debug, Default, Clone)]
pub struct ListenerSet {
    entries: Vec<Listener>,
}

impl ListenerSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `listener`. Returns `false` if it was already present.
    pub fn insert(&mut self, listener: Listener) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.entries.push(listener);
        true
    }

    /// Remove `listener`. Returns `false` if it was not present.
    pub fn remove(&mut self, listener: &Listener) -> bool {
        match self.entries.iter().position(|l| l.same(listener)) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, listener: &Listener) -> bool {
        self.entries.iter().any(|l| l.same(listener))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone the current members in registration order.
    ///
    /// Notification paths iterate over a snapshot so callbacks may freely
    /// add or remove listeners while a fan-out is in progress.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Listener> {
        self.entries.clone()
    }
}

/// RAII guard for a registered listener.
///
/// Dropping the guard unsubscribes. Call [`unsubscribe`](Self::unsubscribe)
/// to do so explicitly.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a guard that runs `cancel` once when released.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard with nothing to release.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Combine several guards into one that releases them in order.
    pub fn all(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || {
            for sub in subscriptions {
                sub.unsubscribe();
            }
        })
    }

    /// Whether the cancel action has not run yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Release the subscription now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
