//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Backend kind is neither `local` nor `remote`.
    #[error("unknown backend '{value}': expected 'local' or 'remote'")]
    UnknownBackend { value: String },

    /// A URL setting is malformed.
    #[error("invalid URL '{value}' for {name}")]
    InvalidUrl { name: &'static str, value: String },

    /// A duration setting was zero where a positive deadline is required.
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },

    /// A count setting is below its minimum.
    #[error("{name} must be at least {min}")]
    TooSmall { name: &'static str, min: usize },

    /// The model identifier is empty.
    #[error("model identifier cannot be empty")]
    EmptyModel,

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
