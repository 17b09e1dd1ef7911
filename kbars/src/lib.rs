//! kbars: composable historical and real-time market bar retrieval.
//!
//! Overview
//! - One fetch contract, [`BarSource`], answered by decorators composed at
//!   build time: the sliding-window cache, the per-day fan-out fetcher, the
//!   history+live merge layer, and the odd-frequency resampler on top.
//! - Requests are [`BarWindow`]s: exactly two of start, end and bar count.
//! - Session-aware calendar math handles split trading days (the A-share
//!   lunch break) when enumerating bar close times or sizing day fetches.
//!
//! Key behaviors and trade-offs
//! - Caching: each (instrument, frequency) pair owns an independent sliding
//!   window backfilled in chunks; whole windows are evicted LRU under a
//!   global resident-bar budget. Sequential backtest access patterns hit
//!   the cache; random access degrades to direct fetches.
//! - Odd frequencies: any N-minute multiple is resampled from one-minute
//!   bars into right-closed buckets; the still-forming bucket is dropped
//!   unless the caller asks for it.
//! - Live merge: history through the previous trading day's close comes
//!   from the historical store, today's bars from the low-latency intraday
//!   store, stitched into one ascending series.
//! - Day fan-out: range requests against day-indexed remote APIs run one
//!   concurrent task per trading day with bounded linear-backoff retry; a
//!   single hard failure aborts the whole request rather than returning a
//!   series with holes.
//!
//! Building a stack over an in-memory store:
//! ```rust,ignore
//! use std::sync::Arc;
//! use kbars::{Kbars, CacheConfig, Frequency, AdjustType};
//!
//! let store = Arc::new(my_minute_store());
//! let kbars = Kbars::builder(store)
//!     .cache(CacheConfig::default())
//!     .build()?;
//!
//! let bars = kbars
//!     .history_bars("000001.XSHE", 50, "5m".parse()?, dt, false, AdjustType::None)
//!     .await?;
//! ```
#![warn(missing_docs)]

pub(crate) mod core;

pub use crate::core::{Kbars, KbarsBuilder};

pub use kbars_middleware::{CacheMiddleware, CachingSource, SourceBuilder};

// Re-export core types for convenience
pub use kbars_core::{
    AdjustType,
    AdjustmentProvider,
    // Foundational types
    Bar,
    // The fetch contract and its collaborators
    BarSource,
    BarWindow,
    CacheConfig,
    Clock,
    DayBarApi,
    // Decorators
    DayBucketSource,
    DayTask,
    FreqUnit,
    Frequency,
    IntradayBarSource,
    KbarsError,
    Middleware,
    OddFrequencySource,
    RealtimeSource,
    RetryConfig,
    // Session calendar math
    SessionPeriod,
    SystemClock,
    TradingCalendar,
    TradingSession,
    resample_minute_bars,
    union_trading_points,
};
