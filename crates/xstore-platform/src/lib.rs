#![forbid(unsafe_code)]

//! Concrete external stores over a headless host window.
//!
//! [`Window`] stands in for the browser: tests and the demo driver mutate it
//! and it dispatches events. The stores in [`sources`] attach to it through
//! the multiplexers of `xstore-runtime`, so each platform listener exists at
//! most once regardless of how many consumers read a store.
//!
//! [`Stores`] wires the full set against one window and one frame scheduler.

pub mod breakpoints;
pub mod counter;
pub mod cursor;
pub mod error;
pub mod media_query;
pub mod sources;
pub mod window;

use xstore_runtime::reactive::{FrameScheduler, PresenceTracker};

pub use breakpoints::{Breakpoint, Breakpoints, MediaQueryState, NamedQuery};
pub use counter::{Counter, CounterPatch, CounterState, CounterStore, CounterSummary, Parity, Sign};
pub use cursor::{CURSOR_HIDDEN_CLASS, FakeCursor, cursor_presence};
pub use error::{BreakpointsError, MediaQueryError, ParseCountError};
pub use media_query::{ColorScheme, MediaEnv, MediaQuery};
pub use sources::{MediaQueryStore, OnlineStatus, Point, PointerPosition, ScrollY, Size, WindowSize};
pub use window::{EventKind, HandlerId, MediaQueryList, Window, WindowEvent};

/// Every store, sharing one window and one frame scheduler.
///
/// Online status bypasses the scheduler and notifies synchronously.
#[derive(Debug, Clone)]
pub struct Stores {
    pub frames: FrameScheduler,
    pub pointer: PointerPosition,
    pub scroll: ScrollY,
    pub size: WindowSize,
    pub online: OnlineStatus,
    pub media: MediaQueryStore,
    pub cursor: PresenceTracker,
    pub counter: Counter,
    pub counter_store: CounterStore,
}

impl Stores {
    /// Build the store set. `None` gives server-side stores that only report
    /// their defaults.
    #[must_use]
    pub fn new(window: Option<Window>, frames: FrameScheduler, breakpoints: Breakpoints) -> Self {
        Self {
            pointer: PointerPosition::new(window.clone(), frames.clone()),
            scroll: ScrollY::new(window.clone(), frames.clone()),
            size: WindowSize::new(window.clone(), frames.clone()),
            online: OnlineStatus::new(window.clone()),
            media: MediaQueryStore::new(window.clone(), frames.clone(), breakpoints),
            cursor: cursor_presence(window),
            counter: Counter::new(),
            counter_store: CounterStore::default(),
            frames,
        }
    }
}
