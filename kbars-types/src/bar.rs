use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One OHLCV record for a fixed time interval, timestamped at interval close.
///
/// Timestamps are exchange-local naive datetimes. Sequences of bars are
/// always sorted ascending by `datetime` with no duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Close time of the interval this bar covers.
    pub datetime: NaiveDateTime,
    /// First traded price in the interval.
    pub open: f64,
    /// Highest traded price in the interval.
    pub high: f64,
    /// Lowest traded price in the interval.
    pub low: f64,
    /// Last traded price in the interval.
    pub close: f64,
    /// Total traded volume in the interval.
    pub volume: f64,
}

impl Bar {
    /// A zero-volume bar carrying `price` in all four price fields.
    ///
    /// Used when probing a non-trading instant: downstream valuation code
    /// can treat the probe uniformly instead of special-casing "no trade".
    #[must_use]
    pub const fn flat(datetime: NaiveDateTime, price: f64) -> Self {
        Self {
            datetime,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
        }
    }
}
