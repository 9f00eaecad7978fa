#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Defaults match a 60 Hz display. With the `config-file` feature the values
//! can be read from the `[runtime]` table of a TOML file:
//!
//! ```toml
//! [runtime]
//! frame_interval_ms = 16
//! max_deliveries_per_tick = 64
//! ```

use web_time::Duration;

use crate::error::{ConfigError, Result};

/// Longest accepted frame interval.
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for schedulers and multiplexers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Minimum time between two refresh ticks of a [`FrameClock`].
    /// Default: 16ms.
    ///
    /// [`FrameClock`]: crate::reactive::FrameClock
    pub frame_interval: Duration,

    /// Cap on deliveries run by one tick; the rest wait for the next tick.
    /// Default: unlimited.
    pub max_deliveries_per_tick: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            max_deliveries_per_tick: None,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_deliveries_per_tick(mut self, max: Option<usize>) -> Self {
        self.max_deliveries_per_tick = max;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.frame_interval.is_zero() {
            return Err(ConfigError::invalid("frame_interval_ms", "must be positive"));
        }
        if self.frame_interval > MAX_FRAME_INTERVAL {
            return Err(ConfigError::invalid(
                "frame_interval_ms",
                format!("must be at most {}ms", MAX_FRAME_INTERVAL.as_millis()),
            ));
        }
        if self.max_deliveries_per_tick == Some(0) {
            return Err(ConfigError::invalid(
                "max_deliveries_per_tick",
                "must be positive when set",
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "config-file")]
mod file {
    use std::path::Path;

    use serde::Deserialize;
    use web_time::Duration;

    use super::RuntimeConfig;
    use crate::error::{ConfigError, Result};

    #[derive(Debug, Default, Deserialize)]
    struct ConfigFile {
        #[serde(default)]
        runtime: RuntimeTable,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct RuntimeTable {
        frame_interval_ms: Option<u64>,
        max_deliveries_per_tick: Option<usize>,
    }

    impl RuntimeConfig {
        /// Parse the `[runtime]` table of a TOML document. Other tables are
        /// ignored; missing keys keep their defaults.
        pub fn from_toml_str(text: &str) -> Result<Self> {
            let file: ConfigFile = toml::from_str(text)?;
            let mut config = Self::default();
            if let Some(ms) = file.runtime.frame_interval_ms {
                config.frame_interval = Duration::from_millis(ms);
            }
            if file.runtime.max_deliveries_per_tick.is_some() {
                config.max_deliveries_per_tick = file.runtime.max_deliveries_per_tick;
            }
            config.validate()?;
            Ok(config)
        }

        /// Read and parse a TOML config file.
        pub fn load(path: &Path) -> Result<Self> {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let config = Self::from_toml_str(&text)?;
            tracing::debug!(path = %path.display(), ?config, "loaded runtime config");
            Ok(config)
        }
    }
}
