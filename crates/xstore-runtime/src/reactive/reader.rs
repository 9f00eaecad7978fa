#![forbid(unsafe_code)]

//! Pull-based consumer of an [`ExternalStore`].
//!
//! A [`Reader`] behaves like a rendering component bound to a store: it
//! subscribes on creation, keeps the last snapshot it rendered, and on every
//! notification re-reads the snapshot and "renders" only if the value
//! changed. Dropping the reader unsubscribes.
//!
//! Readers created with [`Reader::from_server`] start from the store's server
//! snapshot and switch to live values on [`hydrate`](Reader::hydrate).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::external::ExternalStore;
use super::listener::{Listener, Subscription};

type RenderHook<T> = Box<dyn Fn(&T)>;

struct ReaderState<T> {
    read: Box<dyn Fn() -> T>,
    current: RefCell<T>,
    hydrated: Cell<bool>,
    renders: Cell<u64>,
    notifications: Cell<u64>,
    on_render: Option<RenderHook<T>>,
}

impl<T: PartialEq> ReaderState<T> {
    fn refresh(&self) -> bool {
        let next = (self.read)();
        if *self.current.borrow() == next {
            return false;
        }
        *self.current.borrow_mut() = next;
        self.renders.set(self.renders.get() + 1);
        if let Some(hook) = &self.on_render {
            hook(&*self.current.borrow());
        }
        true
    }
}

/// A consumer that caches the last rendered snapshot of a store.
pub struct Reader<T> {
    state: Rc<ReaderState<T>>,
    _subscription: Subscription,
}

impl<T: Clone + PartialEq + 'static> Reader<T> {
    /// Bind to `store`, reading its live snapshot immediately.
    pub fn new<S>(store: &S) -> Self
    where
        S: ExternalStore<Snapshot = T> + Clone + 'static,
    {
        Self::build(store, None, true)
    }

    /// Like [`new`](Self::new), calling `hook` after every render.
    pub fn with_hook<S>(store: &S, hook: impl Fn(&T) + 'static) -> Self
    where
        S: ExternalStore<Snapshot = T> + Clone + 'static,
    {
        Self::build(store, Some(Box::new(hook)), true)
    }

    /// Bind to `store` starting from its server snapshot.
    ///
    /// Notifications before [`hydrate`](Self::hydrate) are counted but do not
    /// render.
    pub fn from_server<S>(store: &S) -> Self
    where
        S: ExternalStore<Snapshot = T> + Clone + 'static,
    {
        Self::build(store, None, false)
    }

    fn build<S>(store: &S, on_render: Option<RenderHook<T>>, hydrated: bool) -> Self
    where
        S: ExternalStore<Snapshot = T> + Clone + 'static,
    {
        let initial = if hydrated {
            store.snapshot()
        } else {
            store.server_snapshot()
        };
        let source = store.clone();
        let state = Rc::new(ReaderState {
            read: Box::new(move || source.snapshot()),
            current: RefCell::new(initial),
            hydrated: Cell::new(hydrated),
            renders: Cell::new(0),
            notifications: Cell::new(0),
            on_render,
        });

        let weak = Rc::downgrade(&state);
        let subscription = store.subscribe(Listener::new(move || {
            if let Some(state) = weak.upgrade() {
                state.notifications.set(state.notifications.get() + 1);
                if state.hydrated.get() {
                    state.refresh();
                }
            }
        }));

        Self {
            state,
            _subscription: subscription,
        }
    }

    /// Switch from the server snapshot to live values.
    ///
    /// Returns `true` if the live value differed and a render happened.
    pub fn hydrate(&self) -> bool {
        if self.state.hydrated.replace(true) {
            return false;
        }
        self.state.refresh()
    }

    /// The last rendered value.
    #[must_use]
    pub fn get(&self) -> T {
        self.state.current.borrow().clone()
    }

    /// Renders caused by a changed snapshot.
    #[must_use]
    pub fn renders(&self) -> u64 {
        self.state.renders.get()
    }

    /// Listener invocations received.
    #[must_use]
    pub fn notifications(&self) -> u64 {
        self.state.notifications.get()
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.state.hydrated.get()
    }
}

impl<T: fmt::Debug> fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("current", &self.state.current.borrow())
            .field("renders", &self.state.renders.get())
            .field("notifications", &self.state.notifications.get())
            .finish()
    }
}
