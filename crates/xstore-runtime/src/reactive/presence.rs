#![forbid(unsafe_code)]

//! Reference-counted presence gate around a shared side effect.
//!
//! Any number of holders may be present at once. The tracker runs
//! `on_first_enter` when the count goes 0→1 and `on_last_leave` when it goes
//! 1→0. Holders normally acquire a [`PresenceGuard`] so that `leave()` runs on
//! every exit path, including unwinding.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

struct PresenceInner {
    count: Cell<usize>,
    sessions: Cell<u64>,
    on_first_enter: Box<dyn Fn()>,
    on_last_leave: Box<dyn Fn()>,
}

impl PresenceInner {
    fn enter(&self) {
        let prev = self.count.get();
        self.count.set(prev + 1);
        if prev == 0 {
            self.sessions.set(self.sessions.get() + 1);
            tracing::debug!(session = self.sessions.get(), "presence: first enter");
            (self.on_first_enter)();
        }
    }

    fn leave(&self) {
        let prev = self.count.get();
        if prev == 0 {
            if cfg!(debug_assertions) {
                panic!("presence leave() without a matching enter()");
            }
            tracing::warn!("presence: ignoring leave() without a matching enter()");
            return;
        }
        self.count.set(prev - 1);
        if prev == 1 {
            tracing::debug!(session = self.sessions.get(), "presence: last leave");
            (self.on_last_leave)();
        }
    }
}

/// Counts present holders and gates a global side effect on 0↔1.
///
/// Cloning yields another handle to the same counter.
#[derive(Clone)]
pub struct PresenceTracker {
    inner: Rc<PresenceInner>,
}

impl PresenceTracker {
    pub fn new(on_first_enter: impl Fn() + 'static, on_last_leave: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(PresenceInner {
                count: Cell::new(0),
                sessions: Cell::new(0),
                on_first_enter: Box::new(on_first_enter),
                on_last_leave: Box::new(on_last_leave),
            }),
        }
    }

    /// Register one holder.
    pub fn enter(&self) {
        self.inner.enter();
    }

    /// Unregister one holder.
    ///
    /// # Panics
    ///
    /// In debug builds, when called more often than [`enter`](Self::enter).
    /// Release builds log and ignore the extra call.
    pub fn leave(&self) {
        self.inner.leave();
    }

    /// Enter and return a guard that leaves on drop.
    pub fn acquire(&self) -> PresenceGuard {
        self.inner.enter();
        PresenceGuard {
            tracker: Rc::clone(&self.inner),
        }
    }

    /// Current number of holders.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count.get()
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.inner.count.get() > 0
    }

    /// Number of maximal runs of `count > 0` started so far.
    #[must_use]
    pub fn sessions(&self) -> u64 {
        self.inner.sessions.get()
    }
}

impl fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("count", &self.count())
            .field("sessions", &self.sessions())
            .finish()
    }
}

/// Scoped presence token: leaves the tracker when dropped.
#[must_use = "dropping a PresenceGuard leaves immediately"]
pub struct PresenceGuard {
    tracker: Rc<PresenceInner>,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        self.tracker.leave();
    }
}

impl fmt::Debug for PresenceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceGuard")
            .field("count", &self.tracker.count.get())
            .finish()
    }
}
