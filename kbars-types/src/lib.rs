//! kbars-types
//!
//! Shared data transfer objects for the kbars ecosystem: the fixed OHLCV
//! `Bar` record, the `Frequency` grammar, the unified `KbarsError`, and the
//! configuration structs consumed by the cache and fetch layers.
#![warn(missing_docs)]

mod bar;
mod config;
mod error;
mod frequency;

pub use bar::Bar;
pub use config::{CacheConfig, RetryConfig};
pub use error::KbarsError;
pub use frequency::{FreqUnit, Frequency};
