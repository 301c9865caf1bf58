//! Error types for saltlimit.

use thiserror::Error;

/// Errors raised while building a limiter or loading its configuration.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// The operating system could not supply secure random bytes for the salt
    #[error("Cannot initialize rate limiter: secure randomness unavailable: {0}")]
    Entropy(#[from] rand::Error),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure outcome of a single throttle request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleError {
    /// Waiting for the next free slot would take longer than the deadline.
    #[error("applicable rate limit would exceed given deadline")]
    DeadlineExceeded,

    /// The cache returned something other than a timestamp for an owned key.
    #[error("invalid value in cache")]
    CorruptCacheEntry,

    /// The admission task ended without reporting a result.
    #[error("throttle task aborted before resolving")]
    Aborted,
}

/// Result type alias for saltlimit construction and configuration.
pub type Result<T> = std::result::Result<T, LimiterError>;
