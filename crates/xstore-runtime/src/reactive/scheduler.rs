#![forbid(unsafe_code)]

//! Frame-coalescing notification scheduler.
//!
//! # Design
//!
//! Every notification source owns a [`ChannelId`]. A source calls
//! [`Scheduler::schedule`] each time its platform resource reports a change;
//! the scheduler keeps at most one pending delivery per channel until the next
//! refresh tick. Deliveries look up their listeners when they run, so any one
//! queued delivery for a channel is as good as another and later requests for
//! the same channel are dropped.
//!
//! Three implementations are provided:
//!
//! - [`ImmediateScheduler`]: runs the delivery synchronously. For sources
//!   whose events are rare and need feedback without a frame of latency.
//! - [`FrameScheduler`]: queues deliveries until the host calls
//!   [`tick()`](FrameScheduler::tick). Arming a tick invokes an optional hook
//!   so a host loop can request a frame.
//! - [`FrameClock`]: a `FrameScheduler` that ticks itself from
//!   [`poll()`](FrameClock::poll) once the configured frame interval elapsed.
//!
//! # Invariants
//!
//! 1. At most one pending delivery per channel between two ticks.
//! 2. A tick clears the pending set **before** running any delivery, so a
//!    delivery that schedules again lands in the next tick.
//! 3. Deliveries within a tick run in the order they were first scheduled.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;
use web_time::{Duration, Instant};

use crate::config::RuntimeConfig;

/// A queued fan-out, run once when its tick fires.
pub type Deliver = Box<dyn FnOnce()>;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one notification channel (one subscription record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocate a process-unique channel id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch#{}", self.0)
    }
}

/// Injectable delivery policy for change notifications.
pub trait Scheduler {
    /// Queue `deliver` for `channel`.
    ///
    /// Returns `false` when the request was coalesced into a delivery that is
    /// already pending for the same channel.
    fn schedule(&self, channel: ChannelId, deliver: Deliver) -> bool;

    /// Number of the tick that is running or ran last.
    ///
    /// `None` for schedulers that do not batch into ticks; every delivery is
    /// then its own notification cycle.
    fn current_tick(&self) -> Option<u64> {
        None
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule(&self, channel: ChannelId, deliver: Deliver) -> bool {
        (**self).schedule(channel, deliver)
    }

    fn current_tick(&self) -> Option<u64> {
        (**self).current_tick()
    }
}

// ─── ImmediateScheduler ──────────────────────────────────────────────────────

/// Runs every delivery synchronously, inside the `schedule` call.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, _channel: ChannelId, deliver: Deliver) -> bool {
        deliver();
        true
    }
}

// ─── FrameScheduler ──────────────────────────────────────────────────────────

type ArmHook = Rc<dyn Fn()>;

#[derive(Default)]
struct FrameState {
    pending: VecDeque<(ChannelId, Deliver)>,
    queued: AHashSet<ChannelId>,
    armed: bool,
    ticks: u64,
    coalesced: u64,
    max_per_tick: Option<usize>,
    on_arm: Option<ArmHook>,
}

/// Manually stepped refresh-tick scheduler.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    state: Rc<RefCell<FrameState>>,
}

impl FrameScheduler {
    /// Create an idle scheduler with no arm hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler honoring `config.max_deliveries_per_tick`.
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let scheduler = Self::new();
        scheduler.state.borrow_mut().max_per_tick = config.max_deliveries_per_tick;
        scheduler
    }

    /// Install a hook invoked whenever a new tick is armed.
    ///
    /// A host loop uses this to request its next frame.
    #[must_use]
    pub fn with_arm_hook(self, hook: impl Fn() + 'static) -> Self {
        self.state.borrow_mut().on_arm = Some(Rc::new(hook));
        self
    }

    /// Whether a tick is armed and waiting to fire.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.borrow().armed
    }

    /// Number of deliveries waiting for the next tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Number of ticks fired so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.state.borrow().ticks
    }

    /// Number of schedule requests absorbed by an already-pending delivery.
    #[must_use]
    pub fn coalesced(&self) -> u64 {
        self.state.borrow().coalesced
    }

    /// Fire the armed tick, running the pending batch in order.
    ///
    /// Returns the number of deliveries run. A tick with nothing pending is a
    /// no-op and is not counted.
    pub fn tick(&self) -> usize {
        let (batch, tick) = {
            let mut state = self.state.borrow_mut();
            if state.pending.is_empty() {
                state.armed = false;
                return 0;
            }
            let len = state.pending.len();
            let take = state.max_per_tick.map_or(len, |max| max.clamp(1, len));
            let batch: Vec<(ChannelId, Deliver)> = state.pending.drain(..take).collect();
            for (channel, _) in &batch {
                state.queued.remove(channel);
            }
            // Leftovers past the per-tick cap keep the tick armed.
            state.armed = !state.pending.is_empty();
            state.ticks += 1;
            (batch, state.ticks)
        };

        let count = batch.len();
        tracing::trace!(tick, batch = count, "frame tick");
        for (_, deliver) in batch {
            deliver();
        }
        count
    }

    /// Tick repeatedly until nothing is pending. Returns total deliveries.
    ///
    /// Stops after `max_ticks` to bound self-rescheduling feedback loops.
    pub fn run_until_idle(&self, max_ticks: usize) -> usize {
        let mut total = 0;
        for _ in 0..max_ticks {
            if self.pending() == 0 {
                break;
            }
            total += self.tick();
        }
        total
    }
}

impl Scheduler for FrameScheduler {
    fn schedule(&self, channel: ChannelId, deliver: Deliver) -> bool {
        let hook = {
            let mut state = self.state.borrow_mut();
            if !state.queued.insert(channel) {
                state.coalesced += 1;
                tracing::trace!(%channel, "coalesced into pending tick");
                return false;
            }
            state.pending.push_back((channel, deliver));
            if state.armed {
                None
            } else {
                state.armed = true;
                state.on_arm.clone()
            }
        };
        if let Some(hook) = hook {
            hook();
        }
        true
    }

    fn current_tick(&self) -> Option<u64> {
        Some(self.state.borrow().ticks)
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FrameScheduler")
            .field("pending", &state.pending.len())
            .field("armed", &state.armed)
            .field("ticks", &state.ticks)
            .field("coalesced", &state.coalesced)
            .finish()
    }
}

// ─── FrameClock ──────────────────────────────────────────────────────────────

/// A [`FrameScheduler`] that fires its tick on a fixed frame interval.
#[derive(Clone)]
pub struct FrameClock {
    frames: FrameScheduler,
    interval: Duration,
    last_frame: Rc<RefCell<Option<Instant>>>,
}

impl FrameClock {
    /// Create a clock ticking at most once per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            frames: FrameScheduler::new(),
            interval,
            last_frame: Rc::new(RefCell::new(None)),
        }
    }

    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            frames: FrameScheduler::from_config(config),
            interval: config.frame_interval,
            last_frame: Rc::new(RefCell::new(None)),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The underlying tick queue.
    #[must_use]
    pub fn frames(&self) -> &FrameScheduler {
        &self.frames
    }

    /// When the next tick may fire, or `None` if nothing is pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.frames.is_armed() {
            return None;
        }
        let last = *self.last_frame.borrow();
        Some(last.map_or_else(Instant::now, |t| t + self.interval))
    }

    /// Fire the pending tick if one is armed and the interval has elapsed
    /// since the previous frame. Returns the number of deliveries run.
    pub fn poll(&self, now: Instant) -> usize {
        if !self.frames.is_armed() {
            return 0;
        }
        let due = match *self.last_frame.borrow() {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if !due {
            return 0;
        }
        *self.last_frame.borrow_mut() = Some(now);
        self.frames.tick()
    }

    /// [`poll`](Self::poll) at the current wall-clock time.
    pub fn poll_now(&self) -> usize {
        self.poll(Instant::now())
    }
}

impl Scheduler for FrameClock {
    fn schedule(&self, channel: ChannelId, deliver: Deliver) -> bool {
        self.frames.schedule(channel, deliver)
    }

    fn current_tick(&self) -> Option<u64> {
        self.frames.current_tick()
    }
}

impl fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameClock")
            .field("interval", &self.interval)
            .field("frames", &self.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Deliver) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let make = move || -> Deliver {
            let h = Rc::clone(&h);
            Box::new(move || h.set(h.get() + 1))
        };
        (hits, make)
    }

    #[test]
    fn immediate_runs_synchronously() {
        let (hits, make) = counter();
        let ch = ChannelId::next();
        assert!(ImmediateScheduler.schedule(ch, make()));
        assert!(ImmediateScheduler.schedule(ch, make()));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn frame_coalesces_per_channel() {
        let frames = FrameScheduler::new();
        let (hits, make) = counter();
        let ch = ChannelId::next();

        assert!(frames.schedule(ch, make()));
        for _ in 0..9 {
            assert!(!frames.schedule(ch, make()));
        }
        assert_eq!(hits.get(), 0);
        assert_eq!(frames.pending(), 1);
        assert_eq!(frames.coalesced(), 9);

        assert_eq!(frames.tick(), 1);
        assert_eq!(hits.get(), 1);
        assert!(!frames.is_armed());
    }

    #[test]
    fn distinct_channels_run_in_schedule_order() {
        let frames = FrameScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let o = Rc::clone(&order);
            frames.schedule(ChannelId::next(), Box::new(move || o.borrow_mut().push(tag)));
        }
        frames.tick();
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn arm_hook_fires_once_per_tick() {
        let arms = Rc::new(Cell::new(0));
        let a = Rc::clone(&arms);
        let frames = FrameScheduler::new().with_arm_hook(move || a.set(a.get() + 1));
        let (_, make) = counter();

        frames.schedule(ChannelId::next(), make());
        frames.schedule(ChannelId::next(), make());
        assert_eq!(arms.get(), 1);

        frames.tick();
        frames.schedule(ChannelId::next(), make());
        assert_eq!(arms.get(), 2);
    }

    #[test]
    fn reschedule_during_delivery_lands_in_next_tick() {
        let frames = FrameScheduler::new();
        let ch = ChannelId::next();
        let runs = Rc::new(Cell::new(0));

        let f = frames.clone();
        let r = Rc::clone(&runs);
        frames.schedule(
            ch,
            Box::new(move || {
                r.set(r.get() + 1);
                let r2 = Rc::clone(&r);
                // Same channel: must not be coalesced into the running tick.
                assert!(f.schedule(ch, Box::new(move || r2.set(r2.get() + 1))));
            }),
        );

        assert_eq!(frames.tick(), 1);
        assert_eq!(runs.get(), 1);
        assert!(frames.is_armed());
        assert_eq!(frames.tick(), 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn empty_tick_is_noop() {
        let frames = FrameScheduler::new();
        assert_eq!(frames.tick(), 0);
        assert_eq!(frames.ticks(), 0);
    }

    #[test]
    fn per_tick_cap_defers_leftovers() {
        let config = RuntimeConfig::default().with_max_deliveries_per_tick(Some(2));
        let frames = FrameScheduler::from_config(&config);
        let (hits, make) = counter();
        for _ in 0..5 {
            frames.schedule(ChannelId::next(), make());
        }
        assert_eq!(frames.tick(), 2);
        assert!(frames.is_armed());
        assert_eq!(frames.run_until_idle(10), 3);
        assert_eq!(hits.get(), 5);
    }

    #[test]
    fn clock_waits_for_interval() {
        let clock = FrameClock::new(Duration::from_millis(16));
        let (hits, make) = counter();
        let t0 = Instant::now();

        clock.schedule(ChannelId::next(), make());
        assert_eq!(clock.poll(t0), 1);

        clock.schedule(ChannelId::next(), make());
        assert_eq!(clock.poll(t0 + Duration::from_millis(5)), 0);
        assert!(clock.next_deadline().is_some());
        assert_eq!(clock.poll(t0 + Duration::from_millis(16)), 1);
        assert_eq!(hits.get(), 2);
        assert!(clock.next_deadline().is_none());
    }

    #[test]
    fn deliveries_see_their_own_tick_number() {
        let frames = FrameScheduler::new();
        assert_eq!(ImmediateScheduler.current_tick(), None);
        assert_eq!(frames.current_tick(), Some(0));

        let seen = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..2 {
            let (f, s) = (frames.clone(), Rc::clone(&seen));
            frames.schedule(
                ChannelId::next(),
                Box::new(move || s.borrow_mut().push(f.current_tick())),
            );
        }
        frames.tick();
        assert_eq!(*seen.borrow(), vec![Some(1), Some(1)]);
        assert_eq!(frames.current_tick(), Some(1));
    }
}
