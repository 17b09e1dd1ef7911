//! Re-export of foundational types from `kbars-types`.
// Consolidated re-exports so downstream crates can depend on `kbars-core` only

pub use kbars_types::{Bar, CacheConfig, FreqUnit, Frequency, KbarsError, RetryConfig};
