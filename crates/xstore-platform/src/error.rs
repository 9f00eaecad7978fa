use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaQueryError {
    #[error("empty media query")]
    Empty,

    #[error("condition must be wrapped in parentheses: {part}")]
    MissingParens { part: String },

    #[error("condition has no `feature: value` pair: {part}")]
    MissingValue { part: String },

    #[error("unsupported media feature: {feature}")]
    UnknownFeature { feature: String },

    #[error("invalid length: {value}")]
    InvalidLength { value: String },

    #[error("invalid value for {feature}: {value}")]
    InvalidValue { feature: String, value: String },
}

/// A "set count" request whose input is not an integer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a whole number: {input:?}")]
pub struct ParseCountError {
    pub input: String,
    #[source]
    pub source: ParseIntError,
}

#[derive(Debug, Error)]
pub enum BreakpointsError {
    #[cfg(feature = "config-file")]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("breakpoints must ascend: {message}")]
    Unordered { message: String },
}
