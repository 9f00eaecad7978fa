//! Event script format.
//!
//! A script names the consumers to mount and the host events to replay:
//!
//! ```json
//! {
//!   "window": { "width": 1280, "height": 800 },
//!   "consumers": [
//!     { "store": "breakpoint" },
//!     { "name": "y", "store": "floored-scroll", "step": 100 }
//!   ],
//!   "steps": [
//!     { "op": "resize", "width": 700, "height": 800 },
//!     { "op": "scroll", "y": 250 },
//!     { "op": "tick" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DemoError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub window: WindowSpec,
    #[serde(default)]
    pub consumers: Vec<ConsumerSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DemoError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Initial host state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSpec {
    pub width: u32,
    pub height: u32,
    pub online: bool,
    pub dark: bool,
    pub reduced_motion: bool,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            online: true,
            dark: false,
            reduced_motion: false,
        }
    }
}

/// A consumer to mount before the first step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerSpec {
    /// Label used in output lines; defaults to the store name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub store: StoreRef,
}

impl ConsumerSpec {
    #[must_use]
    pub fn new(store: StoreRef) -> Self {
        Self { name: None, store }
    }

    #[must_use]
    pub fn named(name: &str, store: StoreRef) -> Self {
        Self {
            name: Some(name.to_string()),
            store,
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.store.kind().to_string())
    }
}

/// Which store a consumer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "store", rename_all = "kebab-case")]
pub enum StoreRef {
    Pointer,
    PointerX,
    PointerY,
    Scroll,
    FlooredScroll { step: f64 },
    Size,
    Width,
    Height,
    Online,
    Breakpoint,
    MediaState,
    Query { query: String },
    Count,
    CounterSummary,
}

impl StoreRef {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Pointer => "pointer",
            Self::PointerX => "pointer-x",
            Self::PointerY => "pointer-y",
            Self::Scroll => "scroll",
            Self::FlooredScroll { .. } => "floored-scroll",
            Self::Size => "size",
            Self::Width => "width",
            Self::Height => "height",
            Self::Online => "online",
            Self::Breakpoint => "breakpoint",
            Self::MediaState => "media-state",
            Self::Query { .. } => "query",
            Self::Count => "count",
            Self::CounterSummary => "counter-summary",
        }
    }
}

/// One host event or consumer action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    Pointer { x: i32, y: i32 },
    Scroll { y: f64 },
    Resize { width: u32, height: u32 },
    Online { online: bool },
    ColorScheme { dark: bool },
    ReducedMotion { reduce: bool },
    /// Fire the pending frame now.
    Tick,
    /// Advance the virtual clock; a frame fires if its interval has elapsed.
    Wait { ms: u64 },
    Increment,
    Decrement,
    Reset,
    SetCount { input: String },
    MountCursor,
    UnmountCursor,
    Unmount { consumer: String },
}
