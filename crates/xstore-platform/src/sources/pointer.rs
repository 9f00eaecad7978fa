#![forbid(unsafe_code)]

//! Pointer position store.
//!
//! The position is cached from the last pointer-move event rather than read
//! from the window, so both live and server snapshots return the cache.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use xstore_runtime::reactive::{
    ChangeHandler, EventSource, ExternalStore, ExternalStoreExt, Listener, Mapped, MuxStats,
    Scheduler, SingletonMultiplexer, Subscription,
};

use crate::window::{EventKind, HandlerId, Window, WindowEvent};

/// A pointer position in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Pointer-move listener with a cached last position.
#[derive(Debug, Clone)]
pub struct PointerSource {
    window: Option<Window>,
    position: Rc<Cell<Point>>,
}

impl PointerSource {
    #[must_use]
    pub fn new(window: Option<Window>) -> Self {
        Self {
            window,
            position: Rc::new(Cell::new(Point::default())),
        }
    }
}

impl EventSource<()> for PointerSource {
    type Value = Point;
    type Handle = Option<HandlerId>;

    fn attach(&self, _key: &(), on_change: ChangeHandler) -> Option<HandlerId> {
        let window = self.window.as_ref()?;
        let position = Rc::clone(&self.position);
        Some(
            window.add_event_listener(EventKind::PointerMove, move |event| {
                if let WindowEvent::PointerMove { x, y } = *event {
                    position.set(Point { x, y });
                    on_change();
                }
            }),
        )
    }

    fn detach(&self, _key: &(), handle: Option<HandlerId>) {
        if let (Some(window), Some(id)) = (&self.window, handle) {
            window.remove_event_listener(id);
        }
    }

    fn read(&self, _key: &()) -> Option<Point> {
        Some(self.position.get())
    }

    fn server_default(&self, _key: &()) -> Point {
        self.position.get()
    }
}

/// Shared pointer position, coalesced per frame.
#[derive(Debug, Clone)]
pub struct PointerPosition {
    mux: SingletonMultiplexer<PointerSource>,
}

impl PointerPosition {
    pub fn new(window: Option<Window>, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            mux: SingletonMultiplexer::new(PointerSource::new(window), scheduler),
        }
    }

    #[must_use]
    pub fn get(&self) -> Point {
        self.mux.get()
    }

    /// The horizontal coordinate as its own store.
    #[must_use]
    pub fn x(&self) -> Mapped<Self, i32> {
        self.clone().map(|p: Point| p.x)
    }

    /// The vertical coordinate as its own store.
    #[must_use]
    pub fn y(&self) -> Mapped<Self, i32> {
        self.clone().map(|p: Point| p.y)
    }

    /// Whether a pointer-move handler is currently attached.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.mux.is_active()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.mux.listener_count()
    }

    #[must_use]
    pub fn stats(&self) -> MuxStats {
        self.mux.stats()
    }
}

impl ExternalStore for PointerPosition {
    type Snapshot = Point;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.mux.subscribe(listener)
    }

    fn snapshot(&self) -> Point {
        self.mux.snapshot()
    }

    fn server_snapshot(&self) -> Point {
        self.mux.server_snapshot()
    }
}
