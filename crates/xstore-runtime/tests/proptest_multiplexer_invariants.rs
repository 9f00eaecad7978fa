//! Property-based invariant tests for the multiplexing core.
//!
//! Verifies:
//!
//! 1. Ref-count: per key, acquisitions − releases == 1 iff the key has
//!    listeners, else 0, after every operation of any on/off sequence.
//! 2. Eager cleanup: a key is active iff its listener count is positive.
//! 3. Batching idempotence: N raw events before a tick → one notification
//!    per listener.
//! 4. Late join / early leave: membership at delivery time decides who is
//!    notified.
//! 5. Presence gating: first-enter / last-leave fire once per maximal run of
//!    `count > 0`.
//! 6. Store scenario: three increments then reset.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;
use xstore_runtime::reactive::{
    ChangeHandler, EventSource, FrameScheduler, KeyedMultiplexer, Listener, Merge,
    PresenceTracker, SyncStore,
};

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct LedgerSource {
    acquired: Rc<RefCell<HashMap<u8, i64>>>,
    handlers: Rc<RefCell<HashMap<u8, ChangeHandler>>>,
}

impl LedgerSource {
    fn held(&self, key: u8) -> i64 {
        self.acquired.borrow().get(&key).copied().unwrap_or(0)
    }

    fn fire(&self, key: u8) {
        let handler = self.handlers.borrow().get(&key).cloned();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl EventSource<u8> for LedgerSource {
    type Value = i64;
    type Handle = u8;

    fn attach(&self, key: &u8, on_change: ChangeHandler) -> u8 {
        *self.acquired.borrow_mut().entry(*key).or_default() += 1;
        self.handlers.borrow_mut().insert(*key, on_change);
        *key
    }

    fn detach(&self, key: &u8, handle: u8) {
        assert_eq!(*key, handle);
        *self.acquired.borrow_mut().entry(*key).or_default() -= 1;
        self.handlers.borrow_mut().remove(key);
    }

    fn read(&self, key: &u8) -> Option<i64> {
        Some(self.held(*key))
    }

    fn server_default(&self, _key: &u8) -> i64 {
        0
    }
}

#[derive(Debug, Clone)]
enum Op {
    On { key: u8, listener: usize },
    Off { key: u8, listener: usize },
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0u8..4, 0usize..6).prop_map(|(key, listener)| Op::On { key, listener }),
        (0u8..4, 0usize..6).prop_map(|(key, listener)| Op::Off { key, listener }),
    ];
    proptest::collection::vec(op, 0..=120)
}

fn counting_listeners(n: usize) -> (Vec<Listener>, Rc<RefCell<Vec<u32>>>) {
    let hits = Rc::new(RefCell::new(vec![0_u32; n]));
    let listeners = (0..n)
        .map(|i| {
            let h = Rc::clone(&hits);
            Listener::new(move || h.borrow_mut()[i] += 1)
        })
        .collect();
    (listeners, hits)
}

// ═════════════════════════════════════════════════════════════════════════
// 1–2. Ref-count invariant and eager cleanup
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn refcount_matches_listener_presence(ops in arb_ops()) {
        let source = LedgerSource::default();
        let mux = KeyedMultiplexer::new(source.clone(), FrameScheduler::new());
        let (listeners, _) = counting_listeners(6);

        for op in ops {
            match op {
                Op::On { key, listener } => { mux.on(key, listeners[listener].clone()); }
                Op::Off { key, listener } => { mux.off(&key, &listeners[listener]); }
            }
            for key in 0u8..4 {
                let count = mux.listener_count(&key);
                let expected = i64::from(count > 0);
                prop_assert_eq!(source.held(key), expected);
                prop_assert_eq!(mux.is_active(&key), count > 0);
            }
        }
        let stats = mux.stats();
        prop_assert_eq!(stats.held(), mux.active_keys() as u64);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Batching idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn burst_delivers_once_per_listener(events in 1usize..50, subscribers in 1usize..6) {
        let source = LedgerSource::default();
        let frames = FrameScheduler::new();
        let mux = KeyedMultiplexer::new(source.clone(), frames.clone());
        let (listeners, hits) = counting_listeners(subscribers);
        for l in &listeners {
            mux.on(7, l.clone());
        }

        for _ in 0..events {
            source.fire(7);
        }
        prop_assert_eq!(frames.pending(), 1);
        frames.tick();

        prop_assert!(hits.borrow().iter().all(|&h| h == 1));
        prop_assert_eq!(mux.stats().raw_events, events as u64);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Late join / early leave
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn delivery_uses_membership_at_tick(
        before in proptest::collection::vec(any::<bool>(), 6),
        after in proptest::collection::vec(any::<bool>(), 6),
    ) {
        let source = LedgerSource::default();
        let frames = FrameScheduler::new();
        let mux = KeyedMultiplexer::new(source.clone(), frames.clone());
        let (listeners, hits) = counting_listeners(6);
        // Anchor keeps the record alive so the pending delivery stays valid.
        let anchor = Listener::new(|| {});
        mux.on(1, anchor.clone());

        for (i, &member) in before.iter().enumerate() {
            if member {
                mux.on(1, listeners[i].clone());
            }
        }
        source.fire(1);
        for (i, &member) in after.iter().enumerate() {
            if member {
                mux.on(1, listeners[i].clone());
            } else {
                mux.off(&1, &listeners[i]);
            }
        }
        frames.tick();

        for (i, &member) in after.iter().enumerate() {
            prop_assert_eq!(hits.borrow()[i], u32::from(member));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Presence gating
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn presence_edges_fire_once_per_run(steps in proptest::collection::vec(any::<bool>(), 0..=200)) {
        let enters = Rc::new(Cell::new(0_u32));
        let leaves = Rc::new(Cell::new(0_u32));
        let (e, l) = (Rc::clone(&enters), Rc::clone(&leaves));
        let tracker = PresenceTracker::new(move || e.set(e.get() + 1), move || l.set(l.get() + 1));

        let mut guards = Vec::new();
        let mut runs = 0_u32;
        let mut returns = 0_u32;
        for enter in steps {
            if enter {
                if guards.is_empty() {
                    runs += 1;
                }
                guards.push(tracker.acquire());
            } else if guards.pop().is_some() && guards.is_empty() {
                returns += 1;
            }
            prop_assert_eq!(tracker.count(), guards.len());
        }
        prop_assert_eq!(enters.get(), runs);
        prop_assert_eq!(leaves.get(), returns);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Store scenario
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tally {
    count: i64,
    clicks: u32,
}

#[derive(Default)]
struct TallyPatch {
    count: Option<i64>,
    clicks: Option<u32>,
}

impl Merge for Tally {
    type Partial = TallyPatch;

    fn merge(&self, patch: TallyPatch) -> Self {
        Self {
            count: patch.count.unwrap_or(self.count),
            clicks: patch.clicks.unwrap_or(self.clicks),
        }
    }
}

#[test]
fn increments_then_reset_notify_in_order() {
    let store = SyncStore::new(Tally {
        count: 0,
        clicks: 0,
    });
    let observed = Rc::new(RefCell::new(Vec::new()));
    let s = store.clone();
    let o = Rc::clone(&observed);
    let _sub = store.subscribe(Listener::new(move || o.borrow_mut().push(s.get_state().count)));

    for _ in 0..3 {
        store.update(|t| TallyPatch {
            count: Some(t.count + 1),
            clicks: Some(t.clicks + 1),
        });
    }
    store.set_state(TallyPatch {
        count: Some(0),
        ..TallyPatch::default()
    });

    // The reset patch leaves `clicks` untouched.
    assert_eq!(
        *store.get_state(),
        Tally {
            count: 0,
            clicks: 3
        }
    );
    assert_eq!(*observed.borrow(), vec![1, 2, 3, 0]);
}
