//! Property tests for media query stores driven by random resize sequences.
//!
//! Verifies:
//!
//! 1. After a tick, a breakpoint reader agrees with a fresh evaluation of
//!    the window, and exactly one of mobile/tablet/desktop matches.
//! 2. A media query list handler exists iff its query has subscribers.
//! 3. A reader never renders more often than it is notified.

use proptest::prelude::*;
use xstore_platform::{Breakpoints, MediaQuery, NamedQuery, Stores, Window};
use xstore_runtime::reactive::{ExternalStore, FrameScheduler, Listener, Reader};

fn arb_widths() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(200u32..2400, 1..=40)
}

proptest! {
    #[test]
    fn breakpoint_tracks_window(widths in arb_widths()) {
        let window = Window::new(1280, 800);
        let stores = Stores::new(Some(window.clone()), FrameScheduler::new(), Breakpoints::default());
        let breakpoint = Reader::new(&stores.media.breakpoint_view());

        for w in widths {
            window.resize(w, 800);
            stores.frames.tick();

            let fresh = Stores::new(Some(window.clone()), FrameScheduler::new(), Breakpoints::default());
            prop_assert_eq!(breakpoint.get(), fresh.media.current_breakpoint());

            let env = window.media_env();
            let bp = stores.media.breakpoints();
            let exclusive = [NamedQuery::Mobile, NamedQuery::Tablet, NamedQuery::Desktop]
                .iter()
                .filter(|&&q| MediaQuery::parse(&bp.query(q)).is_ok_and(|mq| mq.matches(&env)))
                .count();
            prop_assert_eq!(exclusive, 1);
        }
        prop_assert!(breakpoint.renders() <= breakpoint.notifications());
    }

    #[test]
    fn handlers_follow_subscribers(ops in proptest::collection::vec((0usize..6, any::<bool>()), 0..=60)) {
        let window = Window::new(1280, 800);
        let stores = Stores::new(Some(window.clone()), FrameScheduler::new(), Breakpoints::default());
        let mut subs: Vec<Vec<_>> = (0..6).map(|_| Vec::new()).collect();

        for (slot, subscribe) in ops {
            let named = NamedQuery::ALL[slot];
            if subscribe {
                subs[slot].push(stores.media.named(named).subscribe(Listener::new(|| {})));
            } else {
                subs[slot].pop();
            }
            let expected = subs.iter().filter(|s| !s.is_empty()).count();
            prop_assert_eq!(window.media_listener_count(), expected);
            prop_assert_eq!(stores.media.active_queries(), expected);
        }
    }
}
