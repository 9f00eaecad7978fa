#![forbid(unsafe_code)]

//! Headless host window.
//!
//! [`Window`] models the parts of a browser window that stores observe:
//! pointer position, vertical scroll offset, viewport size, connectivity,
//! user preferences for color scheme and motion, and the class list of the
//! document root. Tests and the demo driver mutate it through methods like
//! [`move_pointer`](Window::move_pointer) and [`resize`](Window::resize),
//! which dispatch events synchronously to registered handlers.
//!
//! Media query lists obtained from [`match_media`](Window::match_media) fire
//! their change listeners only when their match result flips, after the
//! triggering state change has been applied.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::error::MediaQueryError;
use crate::media_query::{ColorScheme, MediaEnv, MediaQuery};

/// Event categories a handler can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    Scroll,
    Resize,
    Online,
    Offline,
}

/// An event dispatched by the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowEvent {
    PointerMove { x: i32, y: i32 },
    Scroll { y: f64 },
    Resize { width: u32, height: u32 },
    Online,
    Offline,
}

impl WindowEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PointerMove { .. } => EventKind::PointerMove,
            Self::Scroll { .. } => EventKind::Scroll,
            Self::Resize { .. } => EventKind::Resize,
            Self::Online => EventKind::Online,
            Self::Offline => EventKind::Offline,
        }
    }
}

/// Identifies a registered handler for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

type EventHandler = Rc<dyn Fn(&WindowEvent)>;
type MediaHandler = Rc<dyn Fn()>;

#[derive(Debug, Clone)]
struct WindowState {
    pointer: (i32, i32),
    scroll_y: f64,
    width: u32,
    height: u32,
    online: bool,
    color_scheme: ColorScheme,
    reduced_motion: bool,
    classes: BTreeSet<String>,
}

struct MediaWatch {
    id: HandlerId,
    query: MediaQuery,
    last: bool,
    handler: MediaHandler,
}

struct WindowInner {
    state: RefCell<WindowState>,
    handlers: RefCell<Vec<(HandlerId, EventKind, EventHandler)>>,
    media: RefCell<Vec<MediaWatch>>,
    next_id: Cell<u64>,
    dispatched: Cell<u64>,
}

/// Shared handle to a simulated host window.
#[derive(Clone)]
pub struct Window {
    inner: Rc<WindowInner>,
}

impl Default for Window {
    fn default() -> Self {
        Self::new(1280, 800)
    }
}

impl Window {
    /// A window with the given viewport, online, light scheme, no motion
    /// preference, pointer and scroll at the origin.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Rc::new(WindowInner {
                state: RefCell::new(WindowState {
                    pointer: (0, 0),
                    scroll_y: 0.0,
                    width,
                    height,
                    online: true,
                    color_scheme: ColorScheme::Light,
                    reduced_motion: false,
                    classes: BTreeSet::new(),
                }),
                handlers: RefCell::new(Vec::new()),
                media: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                dispatched: Cell::new(0),
            }),
        }
    }

    fn next_id(&self) -> HandlerId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        HandlerId(id)
    }

    // ── Reads ────────────────────────────────────────────────────────

    #[must_use]
    pub fn pointer(&self) -> (i32, i32) {
        self.inner.state.borrow().pointer
    }

    #[must_use]
    pub fn scroll_y(&self) -> f64 {
        self.inner.state.borrow().scroll_y
    }

    #[must_use]
    pub fn inner_width(&self) -> u32 {
        self.inner.state.borrow().width
    }

    #[must_use]
    pub fn inner_height(&self) -> u32 {
        self.inner.state.borrow().height
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.inner.state.borrow().online
    }

    #[must_use]
    pub fn color_scheme(&self) -> ColorScheme {
        self.inner.state.borrow().color_scheme
    }

    #[must_use]
    pub fn prefers_reduced_motion(&self) -> bool {
        self.inner.state.borrow().reduced_motion
    }

    /// The environment media queries are evaluated against.
    #[must_use]
    pub fn media_env(&self) -> MediaEnv {
        let state = self.inner.state.borrow();
        MediaEnv {
            width: f64::from(state.width),
            height: f64::from(state.height),
            color_scheme: state.color_scheme,
            reduced_motion: state.reduced_motion,
        }
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.inner.state.borrow().classes.contains(class)
    }

    /// Document root classes, sorted.
    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        self.inner.state.borrow().classes.iter().cloned().collect()
    }

    /// Events dispatched so far.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.inner.dispatched.get()
    }

    // ── Event handlers ───────────────────────────────────────────────

    /// Register `handler` for events of `kind`.
    pub fn add_event_listener(
        &self,
        kind: EventKind,
        handler: impl Fn(&WindowEvent) + 'static,
    ) -> HandlerId {
        let id = self.next_id();
        self.inner
            .handlers
            .borrow_mut()
            .push((id, kind, Rc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if `id` is unknown.
    pub fn remove_event_listener(&self, id: HandlerId) -> bool {
        let mut handlers = self.inner.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(hid, _, _)| *hid != id);
        handlers.len() != before
    }

    /// Number of handlers registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .handlers
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    /// Number of media query change listeners across all lists.
    #[must_use]
    pub fn media_listener_count(&self) -> usize {
        self.inner.media.borrow().len()
    }

    /// Open a media query list for `query`.
    pub fn match_media(&self, query: &str) -> Result<MediaQueryList, MediaQueryError> {
        Ok(MediaQueryList {
            window: self.clone(),
            query: MediaQuery::parse(query)?,
        })
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Move the pointer and dispatch a pointer-move event.
    pub fn move_pointer(&self, x: i32, y: i32) {
        self.inner.state.borrow_mut().pointer = (x, y);
        self.dispatch(&WindowEvent::PointerMove { x, y });
    }

    /// Scroll vertically; dispatches only if the offset changed.
    pub fn scroll_to(&self, y: f64) {
        let y = y.max(0.0);
        {
            let mut state = self.inner.state.borrow_mut();
            if state.scroll_y == y {
                return;
            }
            state.scroll_y = y;
        }
        self.dispatch(&WindowEvent::Scroll { y });
    }

    /// Resize the viewport; dispatches only if the size changed.
    pub fn resize(&self, width: u32, height: u32) {
        {
            let mut state = self.inner.state.borrow_mut();
            if (state.width, state.height) == (width, height) {
                return;
            }
            state.width = width;
            state.height = height;
        }
        self.dispatch(&WindowEvent::Resize { width, height });
        self.evaluate_media();
    }

    /// Change connectivity; dispatches `Online`/`Offline` only on change.
    pub fn set_online(&self, online: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.online == online {
                return;
            }
            state.online = online;
        }
        let event = if online {
            WindowEvent::Online
        } else {
            WindowEvent::Offline
        };
        self.dispatch(&event);
    }

    pub fn set_color_scheme(&self, scheme: ColorScheme) {
        self.inner.state.borrow_mut().color_scheme = scheme;
        self.evaluate_media();
    }

    pub fn set_reduced_motion(&self, reduce: bool) {
        self.inner.state.borrow_mut().reduced_motion = reduce;
        self.evaluate_media();
    }

    /// Add a class to the document root. Returns `false` if already present.
    pub fn add_class(&self, class: &str) -> bool {
        self.inner
            .state
            .borrow_mut()
            .classes
            .insert(class.to_string())
    }

    /// Remove a class from the document root. Returns `false` if absent.
    pub fn remove_class(&self, class: &str) -> bool {
        self.inner.state.borrow_mut().classes.remove(class)
    }

    fn dispatch(&self, event: &WindowEvent) {
        let kind = event.kind();
        let targets: Vec<EventHandler> = self
            .inner
            .handlers
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| Rc::clone(h))
            .collect();
        self.inner.dispatched.set(self.inner.dispatched.get() + 1);
        tracing::trace!(?event, handlers = targets.len(), "window dispatch");
        for handler in targets {
            handler(event);
        }
    }

    fn evaluate_media(&self) {
        let env = self.media_env();
        let flipped: Vec<MediaHandler> = self
            .inner
            .media
            .borrow_mut()
            .iter_mut()
            .filter_map(|watch| {
                let now = watch.query.matches(&env);
                if now == watch.last {
                    return None;
                }
                watch.last = now;
                Some(Rc::clone(&watch.handler))
            })
            .collect();
        for handler in flipped {
            handler();
        }
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Window")
            .field("size", &(state.width, state.height))
            .field("pointer", &state.pointer)
            .field("scroll_y", &state.scroll_y)
            .field("online", &state.online)
            .field("handlers", &self.inner.handlers.borrow().len())
            .field("media_listeners", &self.inner.media.borrow().len())
            .finish()
    }
}

/// A media query bound to a window.
#[derive(Clone)]
pub struct MediaQueryList {
    window: Window,
    query: MediaQuery,
}

impl MediaQueryList {
    /// Whether the query currently matches.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.query.matches(&self.window.media_env())
    }

    /// The query text.
    #[must_use]
    pub fn media(&self) -> &str {
        self.query.as_str()
    }

    /// Call `handler` whenever the match result flips.
    pub fn add_change_listener(&self, handler: impl Fn() + 'static) -> HandlerId {
        let id = self.window.next_id();
        let last = self.matches();
        self.window.inner.media.borrow_mut().push(MediaWatch {
            id,
            query: self.query.clone(),
            last,
            handler: Rc::new(handler),
        });
        id
    }

    /// Remove a change listener. Returns `false` if `id` is unknown.
    pub fn remove_change_listener(&self, id: HandlerId) -> bool {
        let mut media = self.window.inner.media.borrow_mut();
        let before = media.len();
        media.retain(|w| w.id != id);
        media.len() != before
    }
}

impl fmt::Debug for MediaQueryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaQueryList")
            .field("media", &self.media())
            .field("matches", &self.matches())
            .finish()
    }
}
