//! Core rate limiter implementation.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use super::cache::{CacheValue, ExpiringCache};
use super::handle::{ThrottleHandle, ThrottleResult};
use super::key::{AnonymizedKey, Salt};
use crate::config::LimiterConfig;
use crate::error::{LimiterError, Result, ThrottleError};

/// Number of lock stripes serializing cache read-modify-write per key.
const LOCK_STRIPES: usize = 64;

/// Enforces a minimum distance between admissions of the same identifier.
///
/// Identifiers are hashed together with a random per-instance salt before
/// they touch the cache, so the cache never sees raw identifiers and keys
/// from two limiters cannot be correlated. Clones share salt, cache and
/// locks.
#[derive(Clone)]
pub struct Limiter {
    inner: Arc<Inner>,
}

struct Inner {
    threshold: Duration,
    deadline: Duration,
    /// `threshold` as a wall-clock offset
    step: TimeDelta,
    salt: Salt,
    cache: Arc<dyn ExpiringCache>,
    /// Held across a key's cache get and set, never while waiting
    stripes: Box<[Mutex<()>]>,
}

/// What the scheduling step decided for one request.
enum Decision {
    Admit { wait: Duration },
    Reject(ThrottleError),
}

impl Limiter {
    /// Create a new limiter.
    ///
    /// `threshold` is the enforced minimum distance between two admissions
    /// for the same identifier, `deadline` the longest a request may be held
    /// before it is rejected instead.
    pub fn new(
        threshold: Duration,
        deadline: Duration,
        cache: Arc<dyn ExpiringCache>,
    ) -> Result<Self> {
        let step = TimeDelta::from_std(threshold).map_err(|e| {
            LimiterError::Config(format!("threshold {:?} out of range: {}", threshold, e))
        })?;
        TimeDelta::from_std(deadline).map_err(|e| {
            LimiterError::Config(format!("deadline {:?} out of range: {}", deadline, e))
        })?;
        if Utc::now().checked_add_signed(step).is_none() {
            return Err(LimiterError::Config(format!(
                "threshold {:?} reaches past the latest representable timestamp",
                threshold
            )));
        }

        let salt = Salt::generate()?;

        let stripes = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();

        info!(
            threshold_ms = threshold.as_millis() as u64,
            deadline_ms = deadline.as_millis() as u64,
            "Rate limiter initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                threshold,
                deadline,
                step,
                salt,
                cache,
                stripes,
            }),
        })
    }

    /// Create a limiter from the `limiter` section of the configuration.
    pub fn from_config(config: &LimiterConfig, cache: Arc<dyn ExpiringCache>) -> Result<Self> {
        Self::new(config.threshold(), config.deadline(), cache)
    }

    pub fn threshold(&self) -> Duration {
        self.inner.threshold
    }

    pub fn deadline(&self) -> Duration {
        self.inner.deadline
    }

    /// Derive the cache key used for `raw`.
    pub fn anonymize(&self, raw: &str) -> AnonymizedKey {
        self.inner.salt.anonymize(raw)
    }

    /// Request admission for `raw`.
    ///
    /// Returns immediately. The handle resolves once the rate limit has been
    /// satisfied, with the delay that was applied, or right away with an
    /// error. Must be called from within a tokio runtime.
    pub fn throttle(&self, raw: &str) -> ThrottleHandle {
        let key = self.anonymize(raw);
        let inner = Arc::clone(&self.inner);
        let (tx, handle) = ThrottleHandle::channel();

        tokio::spawn(async move {
            let result = inner.admit(&key).await;
            // Nobody may be listening any more; the reservation stands anyway.
            let _ = tx.send(result);
        });

        handle
    }

    /// Request admission for the identifier rendered from `args`.
    pub fn throttle_fmt(&self, args: fmt::Arguments<'_>) -> ThrottleHandle {
        self.throttle(&args.to_string())
    }
}

impl fmt::Debug for Limiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limiter")
            .field("threshold", &self.inner.threshold)
            .field("deadline", &self.inner.deadline)
            .finish_non_exhaustive()
    }
}

impl Inner {
    async fn admit(&self, key: &AnonymizedKey) -> ThrottleResult {
        let decision = {
            let _guard = self.stripes[key.bucket(self.stripes.len())].lock().await;
            self.schedule(key, Utc::now()).await
        };

        match decision {
            Decision::Admit { wait } if wait.is_zero() => Ok(wait),
            Decision::Admit { wait } => {
                tokio::time::sleep(wait).await;
                trace!(key = %key, delay_ms = wait.as_millis() as u64, "Admitted after waiting");
                Ok(wait)
            }
            Decision::Reject(err) => Err(err),
        }
    }

    /// Read the key's schedule and reserve the next slot if it is reachable
    /// within the deadline.
    async fn schedule(&self, key: &AnonymizedKey, now: DateTime<Utc>) -> Decision {
        let Some(value) = self.cache.get(key.as_str()).await else {
            let Some(next_allowed) = now.checked_add_signed(self.step) else {
                // The next slot cannot be represented, so it is never reachable.
                return Decision::Reject(ThrottleError::DeadlineExceeded);
            };
            trace!(key = %key, "First admission in window");
            self.cache
                .set(key.as_str(), CacheValue::Timestamp(next_allowed), self.threshold)
                .await;
            return Decision::Admit {
                wait: Duration::ZERO,
            };
        };

        let Some(next_allowed) = value.as_timestamp() else {
            warn!(key = %key, "Invalid value in rate limit cache");
            return Decision::Reject(ThrottleError::CorruptCacheEntry);
        };

        let remaining = (next_allowed - now).to_std().unwrap_or(Duration::ZERO);
        if remaining > self.deadline {
            debug!(
                key = %key,
                remaining_ms = remaining.as_millis() as u64,
                deadline_ms = self.deadline.as_millis() as u64,
                "Rate limit would exceed deadline"
            );
            return Decision::Reject(ThrottleError::DeadlineExceeded);
        }

        // Only a foreign writer can leave a timestamp this close to the end of time.
        let Some(reserved) = next_allowed.checked_add_signed(self.step) else {
            warn!(key = %key, "Cached timestamp cannot be advanced");
            return Decision::Reject(ThrottleError::CorruptCacheEntry);
        };

        self.cache
            .set(key.as_str(), CacheValue::Timestamp(reserved), remaining)
            .await;

        debug!(
            key = %key,
            delay_ms = remaining.as_millis() as u64,
            "Reserved next slot"
        );
        Decision::Admit { wait: remaining }
    }
}
