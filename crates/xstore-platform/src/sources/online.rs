#![forbid(unsafe_code)]

//! Connectivity store.
//!
//! Online/offline transitions are rare and users expect immediate feedback,
//! so notifications bypass frame coalescing.

use std::rc::Rc;

use xstore_runtime::reactive::{
    ChangeHandler, EventSource, ExternalStore, ImmediateScheduler, Listener, MuxStats,
    SingletonMultiplexer, Subscription,
};

use crate::window::{EventKind, HandlerId, Window};

#[derive(Debug, Clone)]
pub struct OnlineSource {
    window: Option<Window>,
}

impl OnlineSource {
    #[must_use]
    pub fn new(window: Option<Window>) -> Self {
        Self { window }
    }
}

impl EventSource<()> for OnlineSource {
    type Value = bool;
    type Handle = Option<(HandlerId, HandlerId)>;

    fn attach(&self, _key: &(), on_change: ChangeHandler) -> Self::Handle {
        let window = self.window.as_ref()?;
        let on_offline = Rc::clone(&on_change);
        let online = window.add_event_listener(EventKind::Online, move |_| on_change());
        let offline = window.add_event_listener(EventKind::Offline, move |_| on_offline());
        Some((online, offline))
    }

    fn detach(&self, _key: &(), handle: Self::Handle) {
        if let (Some(window), Some((online, offline))) = (&self.window, handle) {
            window.remove_event_listener(online);
            window.remove_event_listener(offline);
        }
    }

    fn read(&self, _key: &()) -> Option<bool> {
        self.window.as_ref().map(Window::is_online)
    }

    fn server_default(&self, _key: &()) -> bool {
        true
    }
}

/// Shared online flag. Assumed online before a window exists.
#[derive(Debug, Clone)]
pub struct OnlineStatus {
    mux: SingletonMultiplexer<OnlineSource>,
}

impl OnlineStatus {
    #[must_use]
    pub fn new(window: Option<Window>) -> Self {
        Self {
            mux: SingletonMultiplexer::new(OnlineSource::new(window), ImmediateScheduler),
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.mux.get()
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

impl ExternalStore for OnlineStatus {
    type Snapshot = bool;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.mux.subscribe(listener)
    }

    fn snapshot(&self) -> bool {
        self.mux.snapshot()
    }

    fn server_snapshot(&self) -> bool {
        self.mux.server_snapshot()
    }
}
