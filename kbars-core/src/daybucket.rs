//! Per-day fan-out fetcher over a day-indexed remote bar API.
//!
//! Remote minute-bar APIs are often addressed one trading day at a time.
//! This source decomposes any [`BarWindow`] into one [`DayTask`] per trading
//! day, fetches all days concurrently with bounded retry, and merges the
//! results into a single ascending, duplicate-free series.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::future::try_join_all;
use tracing::warn;

use crate::source::{BarSource, DayBarApi, TradingCalendar};
use crate::timeseries::session::TradingSession;
use crate::window::BarWindow;
use crate::{Bar, FreqUnit, Frequency, KbarsError, RetryConfig};

/// One day's fetch unit: a trade date with optional partial time bounds.
///
/// Interior days of a multi-day request carry no bounds; only the first and
/// last day of a window may be partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTask {
    /// The trading date to fetch.
    pub trade_date: NaiveDate,
    /// Inclusive lower time-of-day bound, when the day is entered mid-way.
    pub start_time: Option<NaiveTime>,
    /// Inclusive upper time-of-day bound, when the day is left mid-way.
    pub end_time: Option<NaiveTime>,
}

impl DayTask {
    /// A task covering the whole trading day.
    #[must_use]
    pub const fn full(trade_date: NaiveDate) -> Self {
        Self {
            trade_date,
            start_time: None,
            end_time: None,
        }
    }
}

/// Decorator turning a [`DayBarApi`] into a [`BarSource`] by day
/// decomposition, concurrent fan-out and bounded retry.
///
/// Window anchors outside the API's available range are clamped to its
/// nearest boundary with a warning; windows entirely outside it come back
/// empty without touching the API.
pub struct DayBucketSource {
    api: Arc<dyn DayBarApi>,
    calendar: Arc<dyn TradingCalendar>,
    session: TradingSession,
    retry: RetryConfig,
}

impl DayBucketSource {
    /// Assemble the fetcher from its collaborators.
    #[must_use]
    pub fn new(
        api: Arc<dyn DayBarApi>,
        calendar: Arc<dyn TradingCalendar>,
        session: TradingSession,
        retry: RetryConfig,
    ) -> Self {
        Self {
            api,
            calendar,
            session,
            retry,
        }
    }

    async fn fetch_day(
        &self,
        instrument: &str,
        frequency: Frequency,
        task: &DayTask,
    ) -> Result<Vec<Bar>, KbarsError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.api.bars_in_day(instrument, frequency, task).await {
                Ok(bars) => return Ok(bars),
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    warn!(
                        source = self.api.name(),
                        date = %task.trade_date,
                        attempt,
                        error = %err,
                        "day fetch failed, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetch all tasks concurrently; a single hard failure aborts the whole
    /// request with no partial data.
    async fn fetch_all(
        &self,
        instrument: &str,
        frequency: Frequency,
        tasks: &[DayTask],
    ) -> Result<Vec<Bar>, KbarsError> {
        let days = try_join_all(
            tasks
                .iter()
                .map(|task| self.fetch_day(instrument, frequency, task)),
        )
        .await?;
        let mut bars: Vec<Bar> = days.into_iter().flatten().collect();
        bars.sort_by_key(|bar| bar.datetime);
        bars.dedup_by_key(|bar| bar.datetime);
        Ok(bars)
    }

    fn range_tasks(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<DayTask> {
        let dates = self.calendar.trading_dates(start.date(), end.date());
        let last_idx = dates.len().wrapping_sub(1);
        dates
            .iter()
            .enumerate()
            .map(|(idx, &trade_date)| DayTask {
                trade_date,
                start_time: (idx == 0).then(|| start.time()),
                end_time: (idx == last_idx).then(|| end.time()),
            })
            .collect()
    }

    fn since_tasks(
        &self,
        frequency: Frequency,
        start: NaiveDateTime,
        length: usize,
    ) -> Result<Vec<DayTask>, KbarsError> {
        let Some(&first) = self.calendar.next_trading_dates(start.date(), 1).first() else {
            return Ok(Vec::new());
        };
        let per_day = self.session.bars_per_day(frequency)?;
        let first_count = if first == start.date() {
            self.session
                .bar_count_in_window(start.time(), end_of_day(), frequency)?
        } else {
            per_day
        };
        let extra = length.saturating_sub(first_count).div_ceil(per_day.max(1));
        let mut tasks = vec![DayTask {
            trade_date: first,
            start_time: (first == start.date()).then(|| start.time()),
            end_time: None,
        }];
        tasks.extend(
            self.calendar
                .next_trading_dates(first, extra + 1)
                .into_iter()
                .filter(|&d| d > first)
                .map(DayTask::full),
        );
        Ok(tasks)
    }

    fn until_tasks(
        &self,
        frequency: Frequency,
        end: NaiveDateTime,
        length: usize,
    ) -> Result<Vec<DayTask>, KbarsError> {
        let Some(&last) = self.calendar.previous_trading_dates(end.date(), 1).last() else {
            return Ok(Vec::new());
        };
        let per_day = self.session.bars_per_day(frequency)?;
        let last_count = if last == end.date() {
            self.session
                .bar_count_in_window(NaiveTime::MIN, end.time(), frequency)?
        } else {
            per_day
        };
        let extra = length.saturating_sub(last_count).div_ceil(per_day.max(1));
        let mut tasks: Vec<DayTask> = self
            .calendar
            .previous_trading_dates(last, extra + 1)
            .into_iter()
            .filter(|&d| d < last)
            .map(DayTask::full)
            .collect();
        tasks.push(DayTask {
            trade_date: last,
            start_time: None,
            end_time: (last == end.date()).then(|| end.time()),
        });
        Ok(tasks)
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).expect("static time")
}

#[async_trait]
impl BarSource for DayBucketSource {
    fn name(&self) -> &'static str {
        "daybucket"
    }

    async fn raw_history_bars(
        &self,
        instrument: &str,
        frequency: Frequency,
        window: BarWindow,
    ) -> Result<Vec<Bar>, KbarsError> {
        if frequency.unit() != FreqUnit::Minute {
            return Err(KbarsError::unsupported_frequency(frequency));
        }
        let (first_date, last_date) = self.api.available_range().await?;
        match window {
            BarWindow::Range { mut start, mut end } => {
                if start.date() > last_date || end.date() < first_date {
                    warn!(%start, %end, "requested range lies outside available data");
                    return Ok(Vec::new());
                }
                if end.date() > last_date {
                    warn!(%end, %last_date, "clamping range end to the last available date");
                    end = last_date.and_time(end_of_day());
                }
                if start.date() < first_date {
                    warn!(%start, %first_date, "clamping range start to the first available date");
                    start = first_date.and_time(NaiveTime::MIN);
                }
                let tasks = self.range_tasks(start, end);
                if tasks.is_empty() {
                    warn!(%start, %end, "no trading dates in requested range");
                    return Ok(Vec::new());
                }
                self.fetch_all(instrument, frequency, &tasks).await
            }
            BarWindow::Since { mut start, length } => {
                if start.date() > last_date {
                    warn!(%start, %last_date, "requested start is after the last available date");
                    return Ok(Vec::new());
                }
                if start.date() < first_date {
                    warn!(%start, %first_date, "clamping start to the first available date");
                    start = first_date.and_time(NaiveTime::MIN);
                }
                let tasks = self.since_tasks(frequency, start, length)?;
                if tasks.is_empty() {
                    warn!(%start, "no trading dates on or after requested start");
                    return Ok(Vec::new());
                }
                let mut bars = self.fetch_all(instrument, frequency, &tasks).await?;
                bars.truncate(length);
                Ok(bars)
            }
            BarWindow::Until { mut end, length } => {
                if end.date() < first_date {
                    warn!(%end, %first_date, "requested end is before the first available date");
                    return Ok(Vec::new());
                }
                if end.date() > last_date {
                    warn!(%end, %last_date, "clamping end to the last available date");
                    end = last_date.and_time(end_of_day());
                }
                let tasks = self.until_tasks(frequency, end, length)?;
                if tasks.is_empty() {
                    warn!(%end, "no trading dates on or before requested end");
                    return Ok(Vec::new());
                }
                let mut bars = self.fetch_all(instrument, frequency, &tasks).await?;
                if bars.len() > length {
                    bars.drain(..bars.len() - length);
                }
                Ok(bars)
            }
        }
    }

    async fn available_data_range(
        &self,
        _frequency: Frequency,
    ) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        self.api.available_range().await
    }
}
