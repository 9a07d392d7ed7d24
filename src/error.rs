//! Error types
//!
//! Per-file and per-subscriber failures are contained where they happen and
//! never surface here; these types cover setup, configuration and request
//! validation.

use thiserror::Error;

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem or socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The directory watch could not be established
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stream session could not be opened
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors raised while opening a stream session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Requested name is not a servable log file
    #[error("invalid log file name: {0}")]
    InvalidFilename(String),

    /// Concurrent session limit reached
    #[error("too many concurrent streams")]
    TooManySessions,
}

/// Errors raised while building configuration from the environment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// Channel capacity must be at least one
    #[error("delivery capacity must be at least 1")]
    ZeroCapacity,
}
