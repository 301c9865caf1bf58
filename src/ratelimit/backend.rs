//! Throttler trait for abstracting over limiter implementations.

use std::fmt;

use super::handle::ThrottleHandle;
use super::limiter::Limiter;

/// Trait for anything that can throttle requests by identifier.
///
/// Lets callers depend on the abstraction rather than on [`Limiter`]
/// directly, e.g. to substitute a no-op throttler in tests.
pub trait Throttler: Send + Sync {
    /// Request admission for `identifier`.
    fn throttle(&self, identifier: &str) -> ThrottleHandle;

    /// Request admission for the identifier rendered from `args`.
    fn throttle_fmt(&self, args: fmt::Arguments<'_>) -> ThrottleHandle {
        self.throttle(&args.to_string())
    }
}

impl Throttler for Limiter {
    fn throttle(&self, identifier: &str) -> ThrottleHandle {
        Limiter::throttle(self, identifier)
    }

    fn throttle_fmt(&self, args: fmt::Arguments<'_>) -> ThrottleHandle {
        Limiter::throttle_fmt(self, args)
    }
}

/// Throttle on an identifier built from a format string.
///
/// ```ignore
/// let delay = throttlef!(limiter, "{}-{}", account_id, visitor_id).await?;
/// ```
#[macro_export]
macro_rules! throttlef {
    ($throttler:expr, $($arg:tt)+) => {
        $throttler.throttle_fmt(::std::format_args!($($arg)+))
    };
}
