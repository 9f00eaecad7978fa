#![forbid(unsafe_code)]

//! `xstore-demo`: runs built-in scenarios and replays JSON event scripts
//! against a headless window, printing one JSON line per consumer render.

pub mod cli;
pub mod config;
pub mod error;
pub mod replay;
pub mod scenario;
pub mod script;

pub use cli::{Cli, Commands, execute, run, run_from_env};
pub use config::DemoConfig;
pub use error::{DemoError, Result};
pub use replay::{RenderLine, Replay, ReplayOptions, ReplayReport, replay};
pub use scenario::ScenarioName;
pub use script::{ConsumerSpec, Script, Step, StoreRef, WindowSpec};
