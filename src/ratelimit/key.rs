//! Salted identifier anonymization.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of random bytes mixed into every identifier hash.
pub const SALT_LEN: usize = 16;

/// Per-limiter secret salt.
///
/// Generated once from the operating system's CSPRNG and never rotated. The
/// bytes are never printed.
#[derive(Clone)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draw a fresh salt from the operating system.
    pub fn generate() -> Result<Self, rand::Error> {
        let mut bytes = [0u8; SALT_LEN];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Derive the cache key for a raw identifier.
    pub fn anonymize(&self, raw: &str) -> AnonymizedKey {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        hasher.update(self.0);
        AnonymizedKey(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// Hex-encoded SHA-256 of an identifier followed by the limiter's salt.
///
/// This is the only form of an identifier that reaches the cache or the logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnonymizedKey(String);

impl AnonymizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable bucket index in `0..buckets`, used to stripe per-key locks.
    pub(crate) fn bucket(&self, buckets: usize) -> usize {
        // Keys are 64 hex chars from `Salt::anonymize`; the first 16 form a
        // uniformly distributed u64.
        let prefix = self
            .0
            .get(..16)
            .and_then(|head| u64::from_str_radix(head, 16).ok())
            .unwrap_or_default();
        (prefix % buckets as u64) as usize
    }
}

impl fmt::Display for AnonymizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AnonymizedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
