//! Rate limiting logic and cache integration.

mod backend;
mod cache;
mod handle;
mod key;
mod limiter;
mod memory;

pub use backend::Throttler;
pub use cache::{CacheValue, ExpiringCache};
pub use handle::{ThrottleHandle, ThrottleResult};
pub use key::{AnonymizedKey, Salt, SALT_LEN};
pub use limiter::Limiter;
pub use memory::MemoryCache;
