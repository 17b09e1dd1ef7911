//! kbars-core
//!
//! Core traits and building blocks shared across the kbars ecosystem.
//!
//! - `source`: the `BarSource` fetch trait and its collaborator traits
//!   (live intraday store, per-day remote API, trading calendar, clock).
//! - `window`: the `BarWindow` request range ("exactly two of
//!   start/end/length" encoded in the type system).
//! - `timeseries`: pure calendar and resampling math: trading-point
//!   enumeration for split-session equity calendars, and right-closed
//!   minute-bucket aggregation.
//! - `odd`, `realtime`, `daybucket`: bar-source decorators implementing the
//!   odd-frequency resampler, the history+today merge layer, and the
//!   per-day fan-out fetcher.
//!
//! Async runtime (Tokio)
//! ---------------------
//! Source traits are `async_trait` over Tokio. Only calls into a source
//! suspend; cache lookups, resampling, and calendar math are pure CPU.
#![warn(missing_docs)]

/// Per-day fan-out fetcher over a remote day-indexed bar API.
pub mod daybucket;
/// Middleware trait implemented by bar-source wrappers.
pub mod middleware;
/// Odd-frequency resampling data source.
pub mod odd;
/// History + live-session merge data source.
pub mod realtime;
/// Bar-source and collaborator traits.
pub mod source;
/// Time-series utilities: session indexing and resampling.
pub mod timeseries;
/// Re-exported shared data types.
pub mod types;
/// Request range for bar fetches.
pub mod window;

pub use daybucket::{DayBucketSource, DayTask};
pub use middleware::Middleware;
pub use odd::{AdjustType, OddFrequencySource};
pub use realtime::RealtimeSource;
pub use source::{
    AdjustmentProvider, BarSource, Clock, DayBarApi, IntradayBarSource, SystemClock,
    TradingCalendar,
};
pub use timeseries::resample::resample_minute_bars;
pub use timeseries::session::{SessionPeriod, TradingSession, union_trading_points};
pub use types::*;
pub use window::BarWindow;
