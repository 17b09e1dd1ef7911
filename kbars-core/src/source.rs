use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::window::BarWindow;
use crate::{Bar, Frequency, KbarsError};

/// The primary fetch trait: anything that can serve raw bars for an
/// instrument, a frequency, and a [`BarWindow`].
///
/// Decorators (cache, realtime merge, day-bucket fetcher) implement this
/// trait over an inner `Arc<dyn BarSource>`, so a concrete data source is
/// assembled by composition rather than inheritance.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// A stable identifier for logging and error attribution.
    fn name(&self) -> &'static str;

    /// Fetch raw bars. Results are sorted ascending by timestamp with no
    /// duplicates. An empty vector is a legitimate answer ("no data in
    /// range"), not an error.
    async fn raw_history_bars(
        &self,
        instrument: &str,
        frequency: Frequency,
        window: BarWindow,
    ) -> Result<Vec<Bar>, KbarsError>;

    /// Whether this source natively stores the given frequency.
    fn is_base_frequency(&self, frequency: Frequency) -> bool {
        frequency.is_base()
    }

    /// The earliest and latest dates this source can serve for `frequency`.
    async fn available_data_range(
        &self,
        frequency: Frequency,
    ) -> Result<(NaiveDate, NaiveDate), KbarsError>;
}

/// A low-latency store holding the current trading day's still-accumulating
/// bars, read during live/paper trading.
#[async_trait]
pub trait IntradayBarSource: Send + Sync {
    /// Fetch today's bars for `trade_date`, optionally bounded by
    /// time-of-day on either side (bounds are inclusive).
    async fn bars(
        &self,
        instrument: &str,
        frequency: Frequency,
        trade_date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> Result<Vec<Bar>, KbarsError>;
}

/// A remote bar API indexed by trading day rather than by arbitrary range.
///
/// The [`crate::DayBucketSource`] decomposes range requests into one
/// [`crate::DayTask`] per trading day and fans them out against this trait.
#[async_trait]
pub trait DayBarApi: Send + Sync {
    /// A stable identifier for logging and error attribution.
    fn name(&self) -> &'static str;

    /// Fetch one day's worth of bars, honoring the task's partial
    /// time-of-day bounds when present.
    async fn bars_in_day(
        &self,
        instrument: &str,
        frequency: Frequency,
        task: &crate::DayTask,
    ) -> Result<Vec<Bar>, KbarsError>;

    /// The earliest and latest trade dates this API can serve.
    async fn available_range(&self) -> Result<(NaiveDate, NaiveDate), KbarsError>;
}

/// Exchange trading-day calendar. Pure CPU, never suspends.
pub trait TradingCalendar: Send + Sync {
    /// All trading dates in `[start, end]`, ascending.
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;

    /// The last trading date strictly before `date`.
    fn previous_trading_date(&self, date: NaiveDate) -> NaiveDate;

    /// The first `count` trading dates on or after `from`, ascending.
    fn next_trading_dates(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate>;

    /// The last `count` trading dates on or before `until`, ascending.
    fn previous_trading_dates(&self, until: NaiveDate, count: usize) -> Vec<NaiveDate>;
}

/// Wall-clock abstraction so live-trading components can be driven by a
/// simulated clock in tests and backtests.
pub trait Clock: Send + Sync {
    /// The current exchange-local datetime.
    fn now(&self) -> NaiveDateTime;
}

/// The real wall clock, in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Split/dividend adjustment factors for an instrument.
pub trait AdjustmentProvider: Send + Sync {
    /// Cumulative adjustment factors, sorted ascending by effective
    /// datetime. Empty when the instrument has no corporate actions.
    fn ex_cum_factors(&self, instrument: &str) -> Vec<(NaiveDateTime, f64)>;
}
