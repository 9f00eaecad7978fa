#![forbid(unsafe_code)]

//! Fake cursor: a consumer that follows the pointer and hides the real
//! cursor while at least one instance is mounted.

use std::fmt;

use xstore_runtime::reactive::{PresenceGuard, PresenceTracker, Reader};

use crate::sources::{Point, PointerPosition};
use crate::window::Window;

/// Document class applied while any fake cursor is mounted.
pub const CURSOR_HIDDEN_CLASS: &str = "cursor-none";

/// Presence tracker that toggles [`CURSOR_HIDDEN_CLASS`] on `window`.
///
/// Without a window the tracker still counts but has no effect.
#[must_use]
pub fn cursor_presence(window: Option<Window>) -> PresenceTracker {
    let (on_enter, on_leave) = (window.clone(), window);
    PresenceTracker::new(
        move || {
            if let Some(window) = &on_enter {
                window.add_class(CURSOR_HIDDEN_CLASS);
                tracing::debug!("real cursor hidden");
            }
        },
        move || {
            if let Some(window) = &on_leave {
                window.remove_class(CURSOR_HIDDEN_CLASS);
                tracing::debug!("real cursor restored");
            }
        },
    )
}

/// A mounted fake cursor. Dropping it unmounts.
pub struct FakeCursor {
    position: Reader<Point>,
    _presence: PresenceGuard,
}

impl FakeCursor {
    /// Mount a cursor that renders at the pointer position.
    #[must_use]
    pub fn mount(pointer: &PointerPosition, presence: &PresenceTracker) -> Self {
        Self {
            position: Reader::new(pointer),
            _presence: presence.acquire(),
        }
    }

    /// Where the cursor was last rendered.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position.get()
    }

    #[must_use]
    pub fn renders(&self) -> u64 {
        self.position.renders()
    }
}

impl fmt::Debug for FakeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeCursor")
            .field("position", &self.position())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xstore_runtime::reactive::FrameScheduler;

    #[test]
    fn class_present_while_any_cursor_mounted() {
        let window = Window::default();
        let pointer = PointerPosition::new(Some(window.clone()), FrameScheduler::new());
        let presence = cursor_presence(Some(window.clone()));

        let first = FakeCursor::mount(&pointer, &presence);
        let second = FakeCursor::mount(&pointer, &presence);
        assert!(window.has_class(CURSOR_HIDDEN_CLASS));

        drop(first);
        assert!(window.has_class(CURSOR_HIDDEN_CLASS));
        drop(second);
        assert!(!window.has_class(CURSOR_HIDDEN_CLASS));
        assert!(!pointer.is_tracking());

        let _again = FakeCursor::mount(&pointer, &presence);
        assert!(window.has_class(CURSOR_HIDDEN_CLASS));
        assert_eq!(presence.sessions(), 2);
    }

    #[test]
    fn cursor_follows_pointer_per_frame() {
        let window = Window::default();
        let frames = FrameScheduler::new();
        let pointer = PointerPosition::new(Some(window.clone()), frames.clone());
        let presence = cursor_presence(Some(window.clone()));
        let cursor = FakeCursor::mount(&pointer, &presence);

        window.move_pointer(4, 4);
        window.move_pointer(12, 30);
        frames.tick();
        assert_eq!(cursor.position(), Point { x: 12, y: 30 });
        assert_eq!(cursor.renders(), 1);
    }

    #[test]
    fn server_presence_has_no_effect() {
        let presence = cursor_presence(None);
        let _guard = presence.acquire();
        assert!(presence.is_present());
    }
}
