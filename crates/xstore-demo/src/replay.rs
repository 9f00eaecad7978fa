//! Script replay: mounts readers on a headless window, applies host events,
//! and records every render.

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Value, json};
use web_time::{Duration, Instant};
use xstore_platform::{
    Breakpoint, ColorScheme, CounterSummary, FakeCursor, MediaQueryState, Point, Size, Stores,
    Window,
};
use xstore_runtime::reactive::{ExternalStore, FrameClock, Reader};

use crate::config::DemoConfig;
use crate::error::{DemoError, Result};
use crate::script::{ConsumerSpec, Script, Step, StoreRef, WindowSpec};

/// Ticks allowed when flushing at the end of a replay.
const FLUSH_TICKS: usize = 64;

/// One consumer render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderLine {
    /// 0 for the initial mount, else the 1-based step that caused it.
    pub step: usize,
    pub consumer: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayReport {
    pub renders: Vec<RenderLine>,
    pub steps: usize,
    pub ticks: u64,
    pub events: u64,
}

impl ReplayReport {
    /// Write one JSON object per render line.
    pub fn write_jsonl(&self, out: &mut dyn Write) -> Result<()> {
        for line in &self.renders {
            serde_json::to_writer(&mut *out, line)?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Render lines for `consumer`, in order.
    #[must_use]
    pub fn renders_of(&self, consumer: &str) -> Vec<&RenderLine> {
        self.renders
            .iter()
            .filter(|line| line.consumer == consumer)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Fire a frame after every step that is not itself `tick` or `wait`.
    pub auto_tick: bool,
}

trait Mounted {
    fn renders(&self) -> u64;
}

impl<T: Clone + PartialEq + 'static> Mounted for Reader<T> {
    fn renders(&self) -> u64 {
        Reader::renders(self)
    }
}

pub struct Replay {
    window: Window,
    clock: FrameClock,
    stores: Stores,
    now: Instant,
    step: Rc<Cell<usize>>,
    lines: Rc<RefCell<Vec<RenderLine>>>,
    consumers: Vec<(String, Box<dyn Mounted>)>,
    cursors: Vec<FakeCursor>,
    classes: Vec<String>,
    steps: usize,
    options: ReplayOptions,
}

impl Replay {
    #[must_use]
    pub fn new(config: &DemoConfig, spec: &WindowSpec, options: ReplayOptions) -> Self {
        let window = Window::new(spec.width, spec.height);
        window.set_online(spec.online);
        if spec.dark {
            window.set_color_scheme(ColorScheme::Dark);
        }
        window.set_reduced_motion(spec.reduced_motion);

        let clock = FrameClock::from_config(&config.runtime);
        let stores = Stores::new(
            Some(window.clone()),
            clock.frames().clone(),
            config.breakpoints,
        );
        Self {
            classes: window.classes(),
            window,
            clock,
            stores,
            now: Instant::now(),
            step: Rc::new(Cell::new(0)),
            lines: Rc::new(RefCell::new(Vec::new())),
            consumers: Vec::new(),
            cursors: Vec::new(),
            steps: 0,
            options,
        }
    }

    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Mount a consumer and record its initial render.
    pub fn mount(&mut self, consumer: &ConsumerSpec) -> Result<()> {
        let label = consumer.label();
        if self.consumers.iter().any(|(name, _)| *name == label) {
            return Err(DemoError::invalid(format!(
                "duplicate consumer name {label:?}"
            )));
        }

        let s = &self.stores;
        let mounted = match &consumer.store {
            StoreRef::Pointer => self.reader(&label, &s.pointer, point_json),
            StoreRef::PointerX => self.reader(&label, &s.pointer.x(), |x: &i32| json!(x)),
            StoreRef::PointerY => self.reader(&label, &s.pointer.y(), |y: &i32| json!(y)),
            StoreRef::Scroll => self.reader(&label, &s.scroll, |y: &Option<f64>| json!(y)),
            StoreRef::FlooredScroll { step } => {
                self.reader(&label, &s.scroll.floored(*step), |y: &Option<f64>| json!(y))
            }
            StoreRef::Size => self.reader(&label, &s.size, size_json),
            StoreRef::Width => self.reader(&label, &s.size.width(), |w: &u32| json!(w)),
            StoreRef::Height => self.reader(&label, &s.size.height(), |h: &u32| json!(h)),
            StoreRef::Online => self.reader(&label, &s.online, |on: &bool| json!(on)),
            StoreRef::Breakpoint => self.reader(&label, &s.media.breakpoint_view(), |b: &Breakpoint| {
                json!(b.as_str())
            }),
            StoreRef::MediaState => self.reader(&label, &s.media.state_view(), media_state_json),
            StoreRef::Query { query } => {
                self.reader(&label, &s.media.query(query), |m: &bool| json!(m))
            }
            StoreRef::Count => self.reader(&label, &s.counter_store.count(), |n: &i64| json!(n)),
            StoreRef::CounterSummary => {
                self.reader(&label, &s.counter_store.summary(), summary_json)
            }
        };
        tracing::debug!(consumer = %label, store = consumer.store.kind(), "mounted");
        self.consumers.push((label, mounted));
        Ok(())
    }

    fn reader<S, F>(&self, label: &str, store: &S, to_json: F) -> Box<dyn Mounted>
    where
        S: ExternalStore + Clone + 'static,
        S::Snapshot: Clone + PartialEq + 'static,
        F: Fn(&S::Snapshot) -> Value + 'static,
    {
        let to_json = Rc::new(to_json);
        let render = Rc::clone(&to_json);
        let lines = Rc::clone(&self.lines);
        let step = Rc::clone(&self.step);
        let consumer = label.to_string();
        let reader = Reader::with_hook(store, move |value| {
            lines.borrow_mut().push(RenderLine {
                step: step.get(),
                consumer: consumer.clone(),
                value: render(value),
            });
        });
        self.lines.borrow_mut().push(RenderLine {
            step: self.step.get(),
            consumer: label.to_string(),
            value: to_json(&reader.get()),
        });
        Box::new(reader)
    }

    /// Apply step number `index` (1-based).
    pub fn apply(&mut self, index: usize, step: &Step) -> Result<()> {
        self.step.set(index);
        self.steps = self.steps.max(index);
        match step {
            Step::Pointer { x, y } => self.window.move_pointer(*x, *y),
            Step::Scroll { y } => self.window.scroll_to(*y),
            Step::Resize { width, height } => self.window.resize(*width, *height),
            Step::Online { online } => self.window.set_online(*online),
            Step::ColorScheme { dark } => self.window.set_color_scheme(if *dark {
                ColorScheme::Dark
            } else {
                ColorScheme::Light
            }),
            Step::ReducedMotion { reduce } => self.window.set_reduced_motion(*reduce),
            Step::Tick => {
                self.clock.frames().tick();
            }
            Step::Wait { ms } => {
                self.now += Duration::from_millis(*ms);
                self.clock.poll(self.now);
            }
            Step::Increment => self.stores.counter_store.increment(),
            Step::Decrement => self.stores.counter_store.decrement(),
            Step::Reset => self.stores.counter_store.reset(),
            Step::SetCount { input } => {
                if let Err(error) = self.stores.counter_store.set_count_from_input(input) {
                    tracing::warn!(step = index, %error, "set-count input rejected");
                }
            }
            Step::MountCursor => self
                .cursors
                .push(FakeCursor::mount(&self.stores.pointer, &self.stores.cursor)),
            Step::UnmountCursor => {
                if self.cursors.pop().is_none() {
                    return Err(DemoError::step(index, "no fake cursor mounted"));
                }
            }
            Step::Unmount { consumer } => {
                let pos = self
                    .consumers
                    .iter()
                    .position(|(name, _)| name == consumer)
                    .ok_or_else(|| DemoError::step(index, format!("no consumer named {consumer:?}")))?;
                let (name, mounted) = self.consumers.remove(pos);
                tracing::debug!(consumer = %name, renders = mounted.renders(), "unmounted");
            }
        }

        if self.options.auto_tick && !matches!(step, Step::Tick | Step::Wait { .. }) {
            self.clock.frames().tick();
        }
        self.record_classes();
        Ok(())
    }

    fn record_classes(&mut self) {
        let classes = self.window.classes();
        if classes != self.classes {
            self.lines.borrow_mut().push(RenderLine {
                step: self.step.get(),
                consumer: "document".to_string(),
                value: json!({ "classes": classes }),
            });
            self.classes = classes;
        }
    }

    /// Flush pending frames and collect the report.
    #[must_use]
    pub fn finish(self) -> ReplayReport {
        let flushed = self.clock.frames().run_until_idle(FLUSH_TICKS);
        if flushed > 0 {
            tracing::debug!(flushed, "flushed pending deliveries");
        }
        let renders = self.lines.borrow().clone();
        ReplayReport {
            renders,
            steps: self.steps,
            ticks: self.clock.frames().ticks(),
            events: self.window.dispatched(),
        }
    }
}

/// Mount every consumer of `script`, then apply its steps in order.
pub fn replay(script: &Script, config: &DemoConfig, options: ReplayOptions) -> Result<ReplayReport> {
    let mut replay = Replay::new(config, &script.window, options);
    for consumer in &script.consumers {
        replay.mount(consumer)?;
    }
    for (i, step) in script.steps.iter().enumerate() {
        replay.apply(i + 1, step)?;
    }
    Ok(replay.finish())
}

fn point_json(p: &Point) -> Value {
    json!({ "x": p.x, "y": p.y })
}

fn size_json(s: &Size) -> Value {
    json!({ "width": s.width, "height": s.height })
}

fn media_state_json(m: &MediaQueryState) -> Value {
    json!({
        "mobile": m.is_mobile,
        "tablet": m.is_tablet,
        "desktop": m.is_desktop,
        "large": m.is_large,
        "dark": m.is_dark,
        "reduced_motion": m.is_reduced_motion,
    })
}

fn summary_json(s: &CounterSummary) -> Value {
    json!({
        "count": s.count,
        "parity": s.parity.as_str(),
        "sign": s.sign.as_str(),
    })
}
