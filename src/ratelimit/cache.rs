//! Expiring key-value cache abstraction consumed by the limiter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A value held in the cache.
///
/// The limiter only ever writes [`CacheValue::Timestamp`]. The other variants
/// let string or byte oriented backends surface whatever they found under a
/// key, which the limiter reports as corrupt instead of reinterpreting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    /// Next point in time at which an identifier may be admitted
    Timestamp(DateTime<Utc>),
    /// Free-form text
    Text(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
}

impl CacheValue {
    /// Returns the timestamp if this value is one.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            CacheValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl From<DateTime<Utc>> for CacheValue {
    fn from(ts: DateTime<Utc>) -> Self {
        CacheValue::Timestamp(ts)
    }
}

/// Trait for caches the limiter can store its schedule in.
///
/// Implementations must be safe for concurrent `get`/`set` calls. Entries
/// written with a `ttl` must stop being returned by `get` once it elapses.
#[async_trait]
pub trait ExpiringCache: Send + Sync {
    /// Look up a live entry.
    async fn get(&self, key: &str) -> Option<CacheValue>;

    /// Store `value` under `key`, replacing any previous value, and evict it
    /// after `ttl`.
    async fn set(&self, key: &str, value: CacheValue, ttl: Duration);
}
