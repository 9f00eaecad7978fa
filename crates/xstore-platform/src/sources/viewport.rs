#![forbid(unsafe_code)]

//! Viewport size store.

use std::fmt;

use xstore_runtime::reactive::{
    ChangeHandler, EventSource, ExternalStore, ExternalStoreExt, Listener, Mapped, MuxStats,
    Scheduler, SingletonMultiplexer, Subscription,
};

use crate::window::{EventKind, HandlerId, Window};

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct ViewportSource {
    window: Option<Window>,
}

impl ViewportSource {
    #[must_use]
    pub fn new(window: Option<Window>) -> Self {
        Self { window }
    }
}

impl EventSource<()> for ViewportSource {
    type Value = Size;
    type Handle = Option<HandlerId>;

    fn attach(&self, _key: &(), on_change: ChangeHandler) -> Option<HandlerId> {
        let window = self.window.as_ref()?;
        Some(window.add_event_listener(EventKind::Resize, move |_| on_change()))
    }

    fn detach(&self, _key: &(), handle: Option<HandlerId>) {
        if let (Some(window), Some(id)) = (&self.window, handle) {
            window.remove_event_listener(id);
        }
    }

    fn read(&self, _key: &()) -> Option<Size> {
        self.window.as_ref().map(|w| Size {
            width: w.inner_width(),
            height: w.inner_height(),
        })
    }

    fn server_default(&self, _key: &()) -> Size {
        Size::default()
    }
}

/// Shared viewport size, coalesced per frame. Zero before a window exists.
#[derive(Debug, Clone)]
pub struct WindowSize {
    mux: SingletonMultiplexer<ViewportSource>,
}

impl WindowSize {
    pub fn new(window: Option<Window>, scheduler: impl Scheduler + 'static) -> Self {
        Self {
            mux: SingletonMultiplexer::new(ViewportSource::new(window), scheduler),
        }
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.mux.get()
    }

    #[must_use]
    pub fn width(&self) -> Mapped<Self, u32> {
        self.width_with(|w| w)
    }

    #[must_use]
    pub fn height(&self) -> Mapped<Self, u32> {
        self.height_with(|h| h)
    }

    /// Width projected through `selector`, e.g. to bucket it.
    pub fn width_with<R>(&self, selector: impl Fn(u32) -> R + 'static) -> Mapped<Self, R> {
        self.clone().map(move |s: Size| selector(s.width))
    }

    /// Height projected through `selector`.
    pub fn height_with<R>(&self, selector: impl Fn(u32) -> R + 'static) -> Mapped<Self, R> {
        self.clone().map(move |s: Size| selector(s.height))
    }

    #[must_use]
    pub fn stats(&self) -> MuxStats {
        self.mux.stats()
    }
}

impl ExternalStore for WindowSize {
    type Snapshot = Size;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.mux.subscribe(listener)
    }

    fn snapshot(&self) -> Size {
        self.mux.snapshot()
    }

    fn server_snapshot(&self) -> Size {
        self.mux.server_snapshot()
    }
}
