//! kbars-mock
//!
//! Deterministic in-memory bar sources for tests and examples. Bars are
//! synthesized on a trading-session grid with a fixed price walk, so every
//! run sees the same data. The magic instrument `"FAIL"` always errors, and
//! per-date failure injection exercises retry paths.
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use kbars_core::{
    Bar, BarSource, BarWindow, Clock, DayBarApi, DayTask, Frequency, IntradayBarSource,
    KbarsError, TradingCalendar, TradingSession,
};

/// Magic instrument: every fetch against it fails with a transient error.
pub const FAIL: &str = "FAIL";

fn synth_bar(idx: usize, datetime: NaiveDateTime) -> Bar {
    #[allow(clippy::cast_precision_loss)]
    let open = 100.0 + idx as f64 * 0.01;
    Bar {
        datetime,
        open,
        high: open + 0.02,
        low: open - 0.02,
        close: open + 0.01,
        volume: 1.0,
    }
}

/// In-memory minute-bar store serving [`BarSource`], [`DayBarApi`] and
/// [`IntradayBarSource`] over the same seeded data.
pub struct MockBarStore {
    session: TradingSession,
    series: HashMap<String, Vec<Bar>>,
    calls: AtomicUsize,
    day_failures: Mutex<HashMap<NaiveDate, u32>>,
}

impl Default for MockBarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBarStore {
    /// An empty store on the A-share session grid.
    #[must_use]
    pub fn new() -> Self {
        Self::with_session(TradingSession::a_stock())
    }

    /// An empty store on a custom session grid.
    #[must_use]
    pub fn with_session(session: TradingSession) -> Self {
        Self {
            session,
            series: HashMap::new(),
            calls: AtomicUsize::new(0),
            day_failures: Mutex::new(HashMap::new()),
        }
    }

    /// Seed full trading days of one-minute bars for an instrument.
    ///
    /// # Errors
    /// Propagates session grid errors.
    pub fn seed_minutes(
        &mut self,
        instrument: &str,
        dates: &[NaiveDate],
    ) -> Result<(), KbarsError> {
        let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).expect("static time");
        for &date in dates {
            self.seed_minutes_until(instrument, date, end_of_day)?;
        }
        Ok(())
    }

    /// Seed one day of one-minute bars, stopping at `cutoff` (inclusive).
    /// Useful for a live store that has only accumulated part of the day.
    ///
    /// # Errors
    /// Propagates session grid errors.
    pub fn seed_minutes_until(
        &mut self,
        instrument: &str,
        date: NaiveDate,
        cutoff: NaiveTime,
    ) -> Result<(), KbarsError> {
        let points = self.session.trading_points(date, Frequency::minutes(1)?)?;
        let series = self.series.entry(instrument.to_string()).or_default();
        for point in points {
            if point.time() <= cutoff {
                series.push(synth_bar(series.len(), point));
            }
        }
        Ok(())
    }

    /// Make the next `times` day fetches for `date` fail transiently.
    pub fn fail_day(&self, date: NaiveDate, times: u32) {
        if let Ok(mut failures) = self.day_failures.lock() {
            failures.insert(date, times);
        }
    }

    /// Total fetches served so far, across all three source traits.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The seeded series for an instrument, for assertions.
    #[must_use]
    pub fn seeded(&self, instrument: &str) -> Vec<Bar> {
        self.series.get(instrument).cloned().unwrap_or_default()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn series_of(&self, instrument: &str) -> Result<&Vec<Bar>, KbarsError> {
        if instrument == FAIL {
            return Err(KbarsError::source("kbars-mock", "forced failure"));
        }
        self.series
            .get(instrument)
            .ok_or_else(|| KbarsError::no_data(format!("bars for {instrument}")))
    }

    fn range_of(bars: &[Bar]) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok((first.datetime.date(), last.datetime.date())),
            _ => Err(KbarsError::no_data("empty mock store")),
        }
    }
}

#[async_trait]
impl BarSource for MockBarStore {
    fn name(&self) -> &'static str {
        "kbars-mock"
    }

    async fn raw_history_bars(
        &self,
        instrument: &str,
        _frequency: Frequency,
        window: BarWindow,
    ) -> Result<Vec<Bar>, KbarsError> {
        self.record_call();
        let bars = self.series_of(instrument)?;
        Ok(match window {
            BarWindow::Range { start, end } => bars
                .iter()
                .filter(|bar| bar.datetime >= start && bar.datetime <= end)
                .copied()
                .collect(),
            BarWindow::Since { start, length } => bars
                .iter()
                .filter(|bar| bar.datetime >= start)
                .take(length)
                .copied()
                .collect(),
            BarWindow::Until { end, length } => {
                let upto: Vec<Bar> = bars
                    .iter()
                    .filter(|bar| bar.datetime <= end)
                    .copied()
                    .collect();
                let skip = upto.len().saturating_sub(length);
                upto[skip..].to_vec()
            }
        })
    }

    async fn available_data_range(
        &self,
        _frequency: Frequency,
    ) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        let (_, bars) = self
            .series
            .iter()
            .next()
            .ok_or_else(|| KbarsError::no_data("empty mock store"))?;
        Self::range_of(bars)
    }
}

#[async_trait]
impl DayBarApi for MockBarStore {
    fn name(&self) -> &'static str {
        "kbars-mock"
    }

    async fn bars_in_day(
        &self,
        instrument: &str,
        _frequency: Frequency,
        task: &DayTask,
    ) -> Result<Vec<Bar>, KbarsError> {
        self.record_call();
        if let Ok(mut failures) = self.day_failures.lock()
            && let Some(left) = failures.get_mut(&task.trade_date)
            && *left > 0
        {
            *left -= 1;
            return Err(KbarsError::source(
                "kbars-mock",
                format!("forced day failure: {}", task.trade_date),
            ));
        }
        let bars = self.series_of(instrument)?;
        Ok(bars
            .iter()
            .filter(|bar| bar.datetime.date() == task.trade_date)
            .filter(|bar| task.start_time.is_none_or(|t| bar.datetime.time() >= t))
            .filter(|bar| task.end_time.is_none_or(|t| bar.datetime.time() <= t))
            .copied()
            .collect())
    }

    async fn available_range(&self) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        let (_, bars) = self
            .series
            .iter()
            .next()
            .ok_or_else(|| KbarsError::no_data("empty mock store"))?;
        Self::range_of(bars)
    }
}

#[async_trait]
impl IntradayBarSource for MockBarStore {
    async fn bars(
        &self,
        instrument: &str,
        _frequency: Frequency,
        trade_date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> Result<Vec<Bar>, KbarsError> {
        self.record_call();
        let bars = self.series_of(instrument)?;
        Ok(bars
            .iter()
            .filter(|bar| bar.datetime.date() == trade_date)
            .filter(|bar| start_time.is_none_or(|t| bar.datetime.time() >= t))
            .filter(|bar| end_time.is_none_or(|t| bar.datetime.time() <= t))
            .copied()
            .collect())
    }
}

/// Monday-through-Friday trading calendar with no holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayCalendar;

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl TradingCalendar for WeekdayCalendar {
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = start;
        while date <= end {
            if !is_weekend(date) {
                dates.push(date);
            }
            date += Duration::days(1);
        }
        dates
    }

    fn previous_trading_date(&self, date: NaiveDate) -> NaiveDate {
        let mut date = date - Duration::days(1);
        while is_weekend(date) {
            date -= Duration::days(1);
        }
        date
    }

    fn next_trading_dates(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(count);
        let mut date = from;
        while dates.len() < count {
            if !is_weekend(date) {
                dates.push(date);
            }
            date += Duration::days(1);
        }
        dates
    }

    fn previous_trading_dates(&self, until: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(count);
        let mut date = until;
        while dates.len() < count {
            if !is_weekend(date) {
                dates.push(date);
            }
            date -= Duration::days(1);
        }
        dates.reverse();
        dates
    }
}

/// A clock pinned to one instant, for driving live-trading components in
/// tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
