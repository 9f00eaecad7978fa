#![forbid(unsafe_code)]

//! Minimal media query parsing and evaluation.
//!
//! Supported grammar (case-insensitive, whitespace tolerant):
//!
//! ```text
//! query      := condition ( "and" condition )*
//! condition  := "(" feature ":" value ")"
//! feature    := min-width | max-width | min-height | max-height
//!             | prefers-color-scheme | prefers-reduced-motion
//! ```
//!
//! Lengths are CSS pixels, with or without a `px` suffix.

use std::fmt;

use crate::error::MediaQueryError;

/// Preferred color scheme reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// The host properties a media query is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaEnv {
    pub width: f64,
    pub height: f64,
    pub color_scheme: ColorScheme,
    pub reduced_motion: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Condition {
    MinWidth(f64),
    MaxWidth(f64),
    MinHeight(f64),
    MaxHeight(f64),
    ColorScheme(ColorScheme),
    ReducedMotion(bool),
}

impl Condition {
    fn matches(self, env: &MediaEnv) -> bool {
        match self {
            Self::MinWidth(px) => env.width >= px,
            Self::MaxWidth(px) => env.width <= px,
            Self::MinHeight(px) => env.height >= px,
            Self::MaxHeight(px) => env.height <= px,
            Self::ColorScheme(scheme) => env.color_scheme == scheme,
            Self::ReducedMotion(reduce) => env.reduced_motion == reduce,
        }
    }
}

/// A parsed media query.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaQuery {
    text: String,
    conditions: Vec<Condition>,
}

impl MediaQuery {
    /// Parse `text`.
    pub fn parse(text: &str) -> Result<Self, MediaQueryError> {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(MediaQueryError::Empty);
        }

        let conditions = normalized
            .split(" and ")
            .map(|part| parse_condition(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            text: text.trim().to_string(),
            conditions,
        })
    }

    /// Whether every condition holds in `env`.
    #[must_use]
    pub fn matches(&self, env: &MediaEnv) -> bool {
        self.conditions.iter().all(|c| c.matches(env))
    }

    /// The query text as given (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::str::FromStr for MediaQuery {
    type Err = MediaQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_condition(part: &str) -> Result<Condition, MediaQueryError> {
    let inner = part
        .strip_prefix('(')
        .and_then(|p| p.strip_suffix(')'))
        .ok_or_else(|| MediaQueryError::MissingParens {
            part: part.to_string(),
        })?;
    let (feature, value) = inner
        .split_once(':')
        .ok_or_else(|| MediaQueryError::MissingValue {
            part: part.to_string(),
        })?;
    let (feature, value) = (feature.trim(), value.trim());

    match feature {
        "min-width" => parse_length(value).map(Condition::MinWidth),
        "max-width" => parse_length(value).map(Condition::MaxWidth),
        "min-height" => parse_length(value).map(Condition::MinHeight),
        "max-height" => parse_length(value).map(Condition::MaxHeight),
        "prefers-color-scheme" => match value {
            "dark" => Ok(Condition::ColorScheme(ColorScheme::Dark)),
            "light" => Ok(Condition::ColorScheme(ColorScheme::Light)),
            _ => Err(invalid(feature, value)),
        },
        "prefers-reduced-motion" => match value {
            "reduce" => Ok(Condition::ReducedMotion(true)),
            "no-preference" => Ok(Condition::ReducedMotion(false)),
            _ => Err(invalid(feature, value)),
        },
        _ => Err(MediaQueryError::UnknownFeature {
            feature: feature.to_string(),
        }),
    }
}

fn parse_length(value: &str) -> Result<f64, MediaQueryError> {
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    match number.parse::<f64>() {
        Ok(px) if px.is_finite() && px >= 0.0 => Ok(px),
        _ => Err(MediaQueryError::InvalidLength {
            value: value.to_string(),
        }),
    }
}

fn invalid(feature: &str, value: &str) -> MediaQueryError {
    MediaQueryError::InvalidValue {
        feature: feature.to_string(),
        value: value.to_string(),
    }
}
