#![forbid(unsafe_code)]

//! Vertical scroll offset store.

use xstore_runtime::reactive::{
    ChangeHandler, EventSource, ExternalStore, ExternalStoreExt, Listener, Mapped, MuxStats,
    Scheduler, SingletonMultiplexer, Subscription,
};

use crate::window::{EventKind, HandlerId, Window};

/// Round `y` down to a multiple of `step`.
///
/// A non-positive or non-finite step floors to whole pixels. Offset 0 stays 0.
#[must_use]
pub fn floor_to(y: f64, step: f64) -> f64 {
    if !(step.is_finite() && step > 0.0) {
        return y.floor();
    }
    (y / step).floor() * step
}

/// Scroll listener. Reads the window offset directly.
#[derive(Debug, Clone)]
pub struct ScrollSource {
    window: Option<Window>,
}

impl ScrollSource {
    #[must_use]
    pub fn new(window: Option<Window>) -> Self {
        Self { window }
    }
}

impl EventSource<()> for ScrollSource {
    type Value = Option<f64>;
    type Handle = Option<HandlerId>;

    fn attach(&self, _key: &(), on_change: ChangeHandler) -> Option<HandlerId> {
        let window = self.window.as_ref()?;
        Some(window.add_event_listener(EventKind::Scroll, move |_| on_change()))
    }

    fn detach(&self, _key: &(), handle: Option<HandlerId>) {
        if let (Some(window), Some(id)) = (&self.window, handle) {
            window.remove_event_listener(id);
        }
    }

    fn read(&self, _key: &()) -> Option<Option<f64>> {
        self.window.as_ref().map(|w| Some(w.scroll_y()))
    }

    fn server_default(&self, _key: &()) -> Option<f64> {
        None
    }
}

/// Shared scroll offset, coalesced per frame. `None` before a window exists.
#[derive(Debug, Clone)]
pub struct ScrollY {
    mux: SingletonMultiplexer<ScrollSource>,
}

impl ScrollY {
    pub fn new(window: Option<Window>, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            mux: SingletonMultiplexer::new(ScrollSource::new(window), scheduler),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<f64> {
        self.mux.get()
    }

    /// The offset floored to multiples of `step`.
    #[must_use]
    pub fn floored(&self, step: f64) -> Mapped<Self, Option<f64>> {
        self.clone()
            .map(move |y: Option<f64>| y.map(|y| floor_to(y, step)))
    }

    #[must_use]
    pub fn stats(&self) -> MuxStats {
        self.mux.stats()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mux.is_active()
    }
}

impl ExternalStore for ScrollY {
    type Snapshot = Option<f64>;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.mux.subscribe(listener)
    }

    fn snapshot(&self) -> Option<f64> {
        self.mux.snapshot()
    }

    fn server_snapshot(&self) -> Option<f64> {
        self.mux.server_snapshot()
    }
}
