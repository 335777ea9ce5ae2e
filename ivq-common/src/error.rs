//! Common error types for IVQ

use thiserror::Error;

/// Common result type for IVQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the IVQ crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON schedule or answers file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chapter or question data violates a schedule invariant
    #[error("Malformed schedule: {0}")]
    MalformedSchedule(String),
}
