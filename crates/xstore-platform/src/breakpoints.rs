#![forbid(unsafe_code)]

//! Viewport breakpoints and the standard named media queries.

use std::fmt;

use crate::error::BreakpointsError;

/// Width thresholds, in CSS pixels, for the standard layout classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct Breakpoints {
    pub mobile_max: u32,
    pub tablet_min: u32,
    pub tablet_max: u32,
    pub desktop_min: u32,
    pub large_min: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            mobile_max: 767,
            tablet_min: 768,
            tablet_max: 1023,
            desktop_min: 1024,
            large_min: 1440,
        }
    }
}

impl Breakpoints {
    /// Check that the ranges ascend without overlap.
    pub fn validate(&self) -> Result<(), BreakpointsError> {
        let unordered = |message: String| Err(BreakpointsError::Unordered { message });
        if self.mobile_max >= self.tablet_min {
            return unordered(format!(
                "mobile_max {} must be below tablet_min {}",
                self.mobile_max, self.tablet_min
            ));
        }
        if self.tablet_min > self.tablet_max {
            return unordered(format!(
                "tablet_min {} exceeds tablet_max {}",
                self.tablet_min, self.tablet_max
            ));
        }
        if self.tablet_max >= self.desktop_min {
            return unordered(format!(
                "tablet_max {} must be below desktop_min {}",
                self.tablet_max, self.desktop_min
            ));
        }
        if self.desktop_min > self.large_min {
            return unordered(format!(
                "desktop_min {} exceeds large_min {}",
                self.desktop_min, self.large_min
            ));
        }
        Ok(())
    }

    /// The media query text for `named`.
    #[must_use]
    pub fn query(&self, named: NamedQuery) -> String {
        match named {
            NamedQuery::Mobile => format!("(max-width: {}px)", self.mobile_max),
            NamedQuery::Tablet => format!(
                "(min-width: {}px) and (max-width: {}px)",
                self.tablet_min, self.tablet_max
            ),
            NamedQuery::Desktop => format!("(min-width: {}px)", self.desktop_min),
            NamedQuery::Large => format!("(min-width: {}px)", self.large_min),
            NamedQuery::Dark => "(prefers-color-scheme: dark)".to_string(),
            NamedQuery::ReducedMotion => "(prefers-reduced-motion: reduce)".to_string(),
        }
    }
}

#[cfg(feature = "config-file")]
mod file {
    use super::{Breakpoints, BreakpointsError};

    #[derive(serde::Deserialize, Default)]
    struct BreakpointsFile {
        #[serde(default)]
        breakpoints: Breakpoints,
    }

    impl Breakpoints {
        /// Read the `[breakpoints]` table of a TOML document.
        ///
        /// Other tables are ignored so the same file can carry runtime
        /// settings. A missing table yields the defaults.
        pub fn from_toml_str(text: &str) -> Result<Self, BreakpointsError> {
            let file: BreakpointsFile = toml::from_str(text)?;
            file.breakpoints.validate()?;
            Ok(file.breakpoints)
        }
    }
}

/// The six standard queries every media store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedQuery {
    Mobile,
    Tablet,
    Desktop,
    Large,
    Dark,
    ReducedMotion,
}

impl NamedQuery {
    pub const ALL: [Self; 6] = [
        Self::Mobile,
        Self::Tablet,
        Self::Desktop,
        Self::Large,
        Self::Dark,
        Self::ReducedMotion,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::Large => "large",
            Self::Dark => "dark",
            Self::ReducedMotion => "reduced-motion",
        }
    }
}

/// Layout class derived from the width queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
    Large,
    #[default]
    Unknown,
}

impl Breakpoint {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::Large => "large",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match state of all six standard queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaQueryState {
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub is_desktop: bool,
    pub is_large: bool,
    pub is_dark: bool,
    pub is_reduced_motion: bool,
}

impl MediaQueryState {
    /// Most specific matching width class: large, desktop, tablet, mobile.
    #[must_use]
    pub fn breakpoint(&self) -> Breakpoint {
        if self.is_large {
            Breakpoint::Large
        } else if self.is_desktop {
            Breakpoint::Desktop
        } else if self.is_tablet {
            Breakpoint::Tablet
        } else if self.is_mobile {
            Breakpoint::Mobile
        } else {
            Breakpoint::Unknown
        }
    }
}
