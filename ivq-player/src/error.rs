//! Error types for ivq-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for ivq-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared library (config, schedule, parsing)
    #[error(transparent)]
    Common(#[from] ivq_common::Error),

    /// Playback surface failed to execute a transport command
    #[error("Transport error: {0}")]
    Transport(String),

    /// The engine task has stopped and no longer accepts input
    #[error("Player runtime closed")]
    RuntimeClosed,

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using ivq-player Error
pub type Result<T> = std::result::Result<T, Error>;
