//! Cache configuration.

use std::time::Duration;

const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Engine-wide cache settings. A single TTL applies to every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            ttl: Duration::from_secs(u64::from(settings.ttl_seconds.get())),
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// TTL in whole seconds, at least one.
    pub fn ttl_seconds(&self) -> i64 {
        i64::try_from(self.ttl.as_secs().max(1)).unwrap_or(i64::MAX)
    }
}
