//! Built-in scenarios, expressed as scripts.

use clap::ValueEnum;

use crate::script::{ConsumerSpec, Script, Step, StoreRef, WindowSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenarioName {
    /// Counter actions with a count display and a parity/sign summary.
    Counter,
    /// Two consumers of one media query, a breakpoint, and the full state.
    Media,
    /// Pointer bursts coalesced per frame.
    Pointer,
    /// Fake cursors hiding the real cursor while mounted.
    Presence,
    /// Connectivity changes, delivered without waiting for a frame.
    Online,
}

impl ScenarioName {
    pub const ALL: [Self; 5] = [
        Self::Counter,
        Self::Media,
        Self::Pointer,
        Self::Presence,
        Self::Online,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Media => "media",
            Self::Pointer => "pointer",
            Self::Presence => "presence",
            Self::Online => "online",
        }
    }

    #[must_use]
    pub fn script(self) -> Script {
        match self {
            Self::Counter => counter(),
            Self::Media => media(),
            Self::Pointer => pointer(),
            Self::Presence => presence(),
            Self::Online => online(),
        }
    }
}

fn script(consumers: Vec<ConsumerSpec>, steps: Vec<Step>) -> Script {
    Script {
        window: WindowSpec::default(),
        consumers,
        steps,
    }
}

fn counter() -> Script {
    script(
        vec![
            ConsumerSpec::new(StoreRef::Count),
            ConsumerSpec::new(StoreRef::CounterSummary),
        ],
        vec![
            Step::Increment,
            Step::Increment,
            Step::Increment,
            Step::Reset,
            Step::SetCount {
                input: "12".into(),
            },
            Step::SetCount {
                input: "twelve".into(),
            },
            Step::Decrement,
        ],
    )
}

fn media() -> Script {
    let mobile = "(max-width: 767px)".to_string();
    script(
        vec![
            ConsumerSpec::named("nav", StoreRef::Query { query: mobile.clone() }),
            ConsumerSpec::named("sidebar", StoreRef::Query { query: mobile }),
            ConsumerSpec::new(StoreRef::Breakpoint),
            ConsumerSpec::new(StoreRef::MediaState),
        ],
        vec![
            Step::Resize {
                width: 1000,
                height: 800,
            },
            Step::Tick,
            Step::Resize {
                width: 700,
                height: 800,
            },
            Step::Tick,
            Step::ColorScheme { dark: true },
            Step::Tick,
            Step::Unmount {
                consumer: "nav".into(),
            },
            Step::Resize {
                width: 1500,
                height: 800,
            },
            Step::Tick,
        ],
    )
}

fn pointer() -> Script {
    let mut steps: Vec<Step> = (1..=5)
        .map(|i| Step::Pointer { x: i * 10, y: i * 5 })
        .collect();
    steps.push(Step::Tick);
    steps.push(Step::Pointer { x: 60, y: 25 });
    steps.push(Step::Tick);
    script(
        vec![
            ConsumerSpec::new(StoreRef::Pointer),
            ConsumerSpec::new(StoreRef::PointerX),
        ],
        steps,
    )
}

fn presence() -> Script {
    script(
        Vec::new(),
        vec![
            Step::MountCursor,
            Step::MountCursor,
            Step::Pointer { x: 40, y: 40 },
            Step::Tick,
            Step::UnmountCursor,
            Step::UnmountCursor,
            Step::MountCursor,
        ],
    )
}

fn online() -> Script {
    script(
        vec![ConsumerSpec::new(StoreRef::Online)],
        vec![
            Step::Online { online: false },
            Step::Online { online: false },
            Step::Online { online: true },
        ],
    )
}
