//! Saltlimit - Anonymizing Per-Identifier Throttling
//!
//! This crate enforces a minimum time distance between admissions that share
//! an identifier (such as a visitor fingerprint). Identifiers are hashed with
//! a random per-limiter salt before they are written to the pluggable
//! expiring cache, and callers are rejected instead of delayed when the wait
//! would exceed a configured deadline.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use error::{LimiterError, ThrottleError};
pub use ratelimit::{ExpiringCache, Limiter, MemoryCache, ThrottleHandle, ThrottleResult, Throttler};
