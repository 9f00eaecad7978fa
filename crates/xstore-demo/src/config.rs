//! Demo configuration: runtime settings plus breakpoints, read from one TOML
//! file.
//!
//! ```toml
//! [runtime]
//! frame_interval_ms = 16
//! max_deliveries_per_tick = 64
//!
//! [breakpoints]
//! mobile_max = 767
//! large_min = 1440
//! ```

use std::path::Path;

use xstore_platform::Breakpoints;
use xstore_runtime::RuntimeConfig;

use crate::error::{DemoError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemoConfig {
    pub runtime: RuntimeConfig,
    pub breakpoints: Breakpoints,
}

impl DemoConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(Self {
            runtime: RuntimeConfig::from_toml_str(text)?,
            breakpoints: Breakpoints::from_toml_str(text)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DemoError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded demo config");
        Ok(config)
    }

    /// Load `path` if given, else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn reads_both_tables() {
        let config = DemoConfig::from_toml_str(
            "[runtime]\nframe_interval_ms = 8\n\n[breakpoints]\ndesktop_min = 1100\ntablet_max = 1099\n",
        )
        .unwrap();
        assert_eq!(config.runtime.frame_interval, Duration::from_millis(8));
        assert_eq!(config.breakpoints.desktop_min, 1100);
    }

    #[test]
    fn bad_breakpoints_are_reported() {
        let err = DemoConfig::from_toml_str("[breakpoints]\nmobile_max = 900\n").unwrap_err();
        assert!(matches!(err, DemoError::Breakpoints(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runtime]\nmax_deliveries_per_tick = 4").unwrap();
        let config = DemoConfig::load(file.path()).unwrap();
        assert_eq!(config.runtime.max_deliveries_per_tick, Some(4));
        assert!(matches!(
            DemoConfig::load(Path::new("/nonexistent/xstore.toml")),
            Err(DemoError::ReadFile { .. })
        ));
    }
}
