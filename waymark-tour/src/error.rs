//! Error types for waymark-tour
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Runtime anomalies (duplicate sensor events, stale timers,
//! failed asset loads) are deliberately NOT errors — they are absorbed by
//! idempotency guards or surfaced as events. Errors here are reserved for
//! misuse of the API surface and construction-time problems.

use thiserror::Error;

/// Main error type for the waymark tour engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared error from waymark-common
    #[error(transparent)]
    Common(#[from] waymark_common::Error),

    /// Referenced target index does not exist
    #[error("Unknown target index: {0}")]
    UnknownTarget(usize),

    /// Engine actor is no longer running
    #[error("Engine stopped: {0}")]
    EngineStopped(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience Result type using the waymark-tour Error
pub type Result<T> = std::result::Result<T, Error>;
