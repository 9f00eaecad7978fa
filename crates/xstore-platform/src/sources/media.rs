#![forbid(unsafe_code)]

//! Media query store.
//!
//! One media query list and one change handler per distinct query text, no
//! matter how many consumers watch it. Change notifications are coalesced
//! through the store's scheduler.
//!
//! Without a window every query reports its server default: the desktop
//! query matches, everything else does not.
//!
//! The aggregate views ([`MediaStateView`], [`BreakpointView`]) watch several
//! queries through one relay listener that runs at most once per tick, so a
//! resize flipping two width queries notifies their consumer once.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use xstore_runtime::reactive::{
    ChangeHandler, EventSource, ExternalStore, KeyedMultiplexer, KeyedView, Listener, MuxStats,
    Scheduler, Subscription,
};

use crate::breakpoints::{Breakpoint, Breakpoints, MediaQueryState, NamedQuery};
use crate::window::{HandlerId, MediaQueryList, Window};

/// Media query lists keyed by query text.
#[derive(Debug, Clone)]
pub struct MediaQuerySource {
    window: Option<Window>,
    desktop: String,
}

impl MediaQuerySource {
    #[must_use]
    pub fn new(window: Option<Window>, breakpoints: &Breakpoints) -> Self {
        Self {
            window,
            desktop: breakpoints.query(NamedQuery::Desktop),
        }
    }
}

impl EventSource<String> for MediaQuerySource {
    type Value = bool;
    type Handle = Option<(MediaQueryList, HandlerId)>;

    fn attach(&self, key: &String, on_change: ChangeHandler) -> Self::Handle {
        let window = self.window.as_ref()?;
        match window.match_media(key) {
            Ok(list) => {
                let id = list.add_change_listener(move || on_change());
                Some((list, id))
            }
            Err(error) => {
                tracing::warn!(query = %key, %error, "unsupported media query; it will never change");
                None
            }
        }
    }

    fn detach(&self, _key: &String, handle: Self::Handle) {
        if let Some((list, id)) = handle {
            list.remove_change_listener(id);
        }
    }

    fn read(&self, key: &String) -> Option<bool> {
        self.window
            .as_ref()
            .map(|w| w.match_media(key).is_ok_and(|list| list.matches()))
    }

    fn server_default(&self, key: &String) -> bool {
        *key == self.desktop
    }
}

/// Shared media query subscriptions.
#[derive(Clone)]
pub struct MediaQueryStore {
    mux: KeyedMultiplexer<String, MediaQuerySource>,
    scheduler: Rc<dyn Scheduler>,
    breakpoints: Breakpoints,
}

impl MediaQueryStore {
    pub fn new(
        window: Option<Window>,
        scheduler: impl Scheduler + 'static,
        breakpoints: Breakpoints,
    ) -> Self {
        let scheduler: Rc<dyn Scheduler> = Rc::new(scheduler);
        Self {
            mux: KeyedMultiplexer::new(
                MediaQuerySource::new(window, &breakpoints),
                Rc::clone(&scheduler),
            ),
            scheduler,
            breakpoints,
        }
    }

    /// Register `listener` for `query`. Returns `false` on a duplicate.
    pub fn on(&self, query: &str, listener: Listener) -> bool {
        self.mux.on(query.to_string(), listener)
    }

    /// Unregister `listener` from `query`. Returns `false` if it was not
    /// registered.
    pub fn off(&self, query: &str, listener: &Listener) -> bool {
        self.mux.off(&query.to_string(), listener)
    }

    /// Whether `query` matches now.
    #[must_use]
    pub fn get(&self, query: &str) -> bool {
        self.mux.get(&query.to_string())
    }

    /// `query` as a standalone store.
    #[must_use]
    pub fn query(&self, query: &str) -> KeyedView<String, MediaQuerySource> {
        self.mux.view(query.to_string())
    }

    /// One of the standard queries as a standalone store.
    #[must_use]
    pub fn named(&self, named: NamedQuery) -> KeyedView<String, MediaQuerySource> {
        self.mux.view(self.breakpoints.query(named))
    }

    #[must_use]
    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// Match state of all six standard queries.
    #[must_use]
    pub fn state(&self) -> MediaQueryState {
        self.state_with(|view| view.snapshot())
    }

    #[must_use]
    pub fn server_state(&self) -> MediaQueryState {
        self.state_with(|view| view.server_snapshot())
    }

    fn state_with(
        &self,
        read: impl Fn(&KeyedView<String, MediaQuerySource>) -> bool,
    ) -> MediaQueryState {
        let flag = |named| read(&self.named(named));
        MediaQueryState {
            is_mobile: flag(NamedQuery::Mobile),
            is_tablet: flag(NamedQuery::Tablet),
            is_desktop: flag(NamedQuery::Desktop),
            is_large: flag(NamedQuery::Large),
            is_dark: flag(NamedQuery::Dark),
            is_reduced_motion: flag(NamedQuery::ReducedMotion),
        }
    }

    #[must_use]
    pub fn current_breakpoint(&self) -> Breakpoint {
        self.state().breakpoint()
    }

    /// All six standard queries as one store.
    #[must_use]
    pub fn state_view(&self) -> MediaStateView {
        MediaStateView {
            store: self.clone(),
        }
    }

    /// The current breakpoint as a store; watches the four width queries.
    #[must_use]
    pub fn breakpoint_view(&self) -> BreakpointView {
        BreakpointView {
            store: self.clone(),
        }
    }

    #[must_use]
    pub fn is_active(&self, query: &str) -> bool {
        self.mux.is_active(&query.to_string())
    }

    #[must_use]
    pub fn listener_count(&self, query: &str) -> usize {
        self.mux.listener_count(&query.to_string())
    }

    /// Queries with an attached change handler.
    #[must_use]
    pub fn active_queries(&self) -> usize {
        self.mux.active_keys()
    }

    #[must_use]
    pub fn stats(&self) -> MuxStats {
        self.mux.stats()
    }

    fn subscribe_all(&self, queries: &[NamedQuery], listener: Listener) -> Subscription {
        let relay = once_per_tick(listener, Rc::clone(&self.scheduler));
        Subscription::all(
            queries
                .iter()
                .map(|&named| self.named(named).subscribe(relay.clone()))
                .collect(),
        )
    }
}

impl fmt::Debug for MediaQueryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaQueryStore")
            .field("mux", &self.mux)
            .field("breakpoints", &self.breakpoints)
            .finish_non_exhaustive()
    }
}

/// Forward to `listener` at most once per scheduler tick.
fn once_per_tick(listener: Listener, scheduler: Rc<dyn Scheduler>) -> Listener {
    let last = Cell::new(None);
    Listener::new(move || {
        let tick = scheduler.current_tick();
        if tick.is_none() || last.replace(tick) != tick {
            listener.notify();
        }
    })
}

/// [`MediaQueryState`] as a store.
#[derive(Debug, Clone)]
pub struct MediaStateView {
    store: MediaQueryStore,
}

impl ExternalStore for MediaStateView {
    type Snapshot = MediaQueryState;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.store.subscribe_all(&NamedQuery::ALL, listener)
    }

    fn snapshot(&self) -> MediaQueryState {
        self.store.state()
    }

    fn server_snapshot(&self) -> MediaQueryState {
        self.store.server_state()
    }
}

/// [`Breakpoint`] as a store.
#[derive(Debug, Clone)]
pub struct BreakpointView {
    store: MediaQueryStore,
}

const WIDTH_QUERIES: [NamedQuery; 4] = [
    NamedQuery::Mobile,
    NamedQuery::Tablet,
    NamedQuery::Desktop,
    NamedQuery::Large,
];

impl ExternalStore for BreakpointView {
    type Snapshot = Breakpoint;

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.store.subscribe_all(&WIDTH_QUERIES, listener)
    }

    fn snapshot(&self) -> Breakpoint {
        self.store.current_breakpoint()
    }

    fn server_snapshot(&self) -> Breakpoint {
        self.store.server_state().breakpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xstore_runtime::reactive::{FrameScheduler, Reader};

    fn store(window: &Window, frames: &FrameScheduler) -> MediaQueryStore {
        MediaQueryStore::new(Some(window.clone()), frames.clone(), Breakpoints::default())
    }

    #[test]
    fn server_defaults_favor_desktop() {
        let media = MediaQueryStore::new(None, FrameScheduler::new(), Breakpoints::default());
        assert!(media.get("(min-width: 1024px)"));
        assert!(!media.get("(max-width: 767px)"));
        assert_eq!(media.current_breakpoint(), Breakpoint::Desktop);
        assert_eq!(media.breakpoint_view().server_snapshot(), Breakpoint::Desktop);
    }

    #[test]
    fn one_window_listener_per_query() {
        let window = Window::new(1200, 800);
        let frames = FrameScheduler::new();
        let media = store(&window, &frames);
        let _state = Reader::new(&media.state_view());
        let _bp = Reader::new(&media.breakpoint_view());
        assert_eq!(media.active_queries(), 6);
        assert_eq!(window.media_listener_count(), 6);
        assert_eq!(media.listener_count("(min-width: 1024px)"), 2);
    }

    #[test]
    fn breakpoint_follows_resize() {
        let window = Window::new(1200, 800);
        let frames = FrameScheduler::new();
        let media = store(&window, &frames);
        let bp = Reader::new(&media.breakpoint_view());
        assert_eq!(bp.get(), Breakpoint::Desktop);

        window.resize(800, 800);
        frames.tick();
        assert_eq!(bp.get(), Breakpoint::Tablet);

        window.resize(1600, 800);
        frames.tick();
        assert_eq!(bp.get(), Breakpoint::Large);
        assert_eq!(bp.renders(), 2);
    }

    #[test]
    fn unsupported_query_attaches_nothing() {
        let window = Window::default();
        let frames = FrameScheduler::new();
        let media = store(&window, &frames);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = media
            .query("(orientation: portrait)")
            .subscribe(Listener::new(move || h.set(h.get() + 1)));

        assert!(media.is_active("(orientation: portrait)"));
        assert_eq!(window.media_listener_count(), 0);
        assert!(!media.get("(orientation: portrait)"));
        drop(sub);
        assert!(!media.is_active("(orientation: portrait)"));
    }

    #[test]
    fn custom_breakpoints_shift_queries() {
        let window = Window::new(1300, 800);
        let bp = Breakpoints {
            desktop_min: 1280,
            tablet_max: 1279,
            ..Breakpoints::default()
        };
        let media = MediaQueryStore::new(Some(window), FrameScheduler::new(), bp);
        assert!(media.state().is_desktop);
        assert!(media.get("(min-width: 1280px)"));
    }

    #[test]
    fn aggregate_views_notify_once_per_tick() {
        let window = Window::new(1200, 800);
        let frames = FrameScheduler::new();
        let media = store(&window, &frames);
        let bp_hits = Rc::new(Cell::new(0));
        let state_hits = Rc::new(Cell::new(0));
        let (b, s) = (Rc::clone(&bp_hits), Rc::clone(&state_hits));
        let _bp = media
            .breakpoint_view()
            .subscribe(Listener::new(move || b.set(b.get() + 1)));
        let _state = media
            .state_view()
            .subscribe(Listener::new(move || s.set(s.get() + 1)));

        // Mobile and desktop both flip.
        window.resize(700, 800);
        assert_eq!(frames.tick(), 2);
        assert_eq!(bp_hits.get(), 1);
        assert_eq!(state_hits.get(), 1);

        window.resize(1600, 800);
        frames.tick();
        assert_eq!(bp_hits.get(), 2);
        assert_eq!(state_hits.get(), 2);
    }
}
