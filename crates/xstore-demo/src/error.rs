use std::path::PathBuf;

use thiserror::Error;
use xstore_platform::BreakpointsError;
use xstore_runtime::ConfigError;

pub type Result<T> = std::result::Result<T, DemoError>;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("breakpoints error: {0}")]
    Breakpoints(#[from] BreakpointsError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("step {step}: {message}")]
    Step { step: usize, message: String },
}

impl DemoError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::Step { .. } => 3,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn step(step: usize, message: impl Into<String>) -> Self {
        Self::Step {
            step,
            message: message.into(),
        }
    }
}
