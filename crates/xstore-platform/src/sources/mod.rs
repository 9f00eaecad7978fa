//! Stores backed by [`Window`](crate::window::Window) events.
//!
//! Each store pairs an [`EventSource`](xstore_runtime::reactive::EventSource)
//! that knows how to attach to the window with a multiplexer that shares the
//! attachment among subscribers. Passing `None` for the window gives a store
//! that only ever reports its server default.

pub mod media;
pub mod online;
pub mod pointer;
pub mod scroll;
pub mod viewport;

pub use media::{BreakpointView, MediaQuerySource, MediaQueryStore, MediaStateView};
pub use online::{OnlineSource, OnlineStatus};
pub use pointer::{Point, PointerPosition, PointerSource};
pub use scroll::{ScrollSource, ScrollY, floor_to};
pub use viewport::{Size, ViewportSource, WindowSize};
