//! Configuration structs consumed by the cache and fetch layers.
//!
//! These are pass-through tuning knobs: they are handed to constructors once
//! and never mutated globally.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for the sliding-window bar cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Number of bars fetched per backfill step; an entry's buffer is
    /// trimmed once it exceeds twice this length.
    pub chunk_size: usize,
    /// Soft bound on total resident bars across all cache entries. The
    /// entry capacity is `max_resident_bars / chunk_size`.
    pub max_resident_bars: usize,
    /// When false, the cache layer is not installed at all.
    pub enabled: bool,
}

impl CacheConfig {
    /// Number of independent cache entries the global budget allows.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        let chunk = if self.chunk_size == 0 {
            1
        } else {
            self.chunk_size
        };
        let n = self.max_resident_bars / chunk;
        if n == 0 { 1 } else { n }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            max_resident_bars: 40_000_000,
            enabled: true,
        }
    }
}

/// Bounded retry policy for remote day-bucket fetches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per day task, including the first one.
    pub max_attempts: u32,
    /// Base delay; attempt `k` waits `k * backoff` (linear backoff).
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}
