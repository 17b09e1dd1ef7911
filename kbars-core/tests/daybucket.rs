use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use kbars_core::{
    Bar, BarSource, BarWindow, DayBarApi, DayBucketSource, DayTask, Frequency, KbarsError,
    RetryConfig, TradingCalendar, TradingSession,
};

struct DayApi {
    bars: Vec<Bar>,
    fail: Mutex<HashMap<NaiveDate, u32>>,
    calls: AtomicUsize,
}

impl DayApi {
    fn seeded(dates: &[NaiveDate]) -> Self {
        let session = TradingSession::a_stock();
        let mut bars = Vec::new();
        for &date in dates {
            for point in session.trading_points(date, "1m".parse().unwrap()).unwrap() {
                bars.push(Bar {
                    datetime: point,
                    open: 10.0,
                    high: 10.5,
                    low: 9.5,
                    close: 10.2,
                    volume: 1.0,
                });
            }
        }
        Self {
            bars,
            fail: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn fail_day(&self, date: NaiveDate, times: u32) {
        self.fail.lock().unwrap().insert(date, times);
    }
}

#[async_trait]
impl DayBarApi for DayApi {
    fn name(&self) -> &'static str {
        "day-api"
    }

    async fn bars_in_day(
        &self,
        instrument: &str,
        _frequency: Frequency,
        task: &DayTask,
    ) -> Result<Vec<Bar>, KbarsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if instrument == "MISSING" {
            return Err(KbarsError::no_data("bars for MISSING"));
        }
        if let Some(left) = self.fail.lock().unwrap().get_mut(&task.trade_date)
            && *left > 0
        {
            *left -= 1;
            return Err(KbarsError::source("day-api", "connection reset"));
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| b.datetime.date() == task.trade_date)
            .filter(|b| task.start_time.is_none_or(|t| b.datetime.time() >= t))
            .filter(|b| task.end_time.is_none_or(|t| b.datetime.time() <= t))
            .copied()
            .collect())
    }

    async fn available_range(&self) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Ok((first.datetime.date(), last.datetime.date())),
            _ => Err(KbarsError::no_data("empty day api")),
        }
    }
}

struct Weekdays;

impl TradingCalendar for Weekdays {
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = start;
        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(date);
            }
            date += chrono::Duration::days(1);
        }
        dates
    }

    fn previous_trading_date(&self, date: NaiveDate) -> NaiveDate {
        let mut date = date - chrono::Duration::days(1);
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date -= chrono::Duration::days(1);
        }
        date
    }

    fn next_trading_dates(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = from;
        while dates.len() < count {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(date);
            }
            date += chrono::Duration::days(1);
        }
        dates
    }

    fn previous_trading_dates(&self, until: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = until;
        while dates.len() < count {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(date);
            }
            date -= chrono::Duration::days(1);
        }
        dates.reverse();
        dates
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 6, d).unwrap()
}

fn at(d: u32, hour: u32, minute: u32) -> NaiveDateTime {
    day(d).and_hms_opt(hour, minute, 0).unwrap()
}

fn freq_1m() -> Frequency {
    "1m".parse().unwrap()
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
    }
}

fn source_over(api: Arc<DayApi>) -> DayBucketSource {
    DayBucketSource::new(api, Arc::new(Weekdays), TradingSession::a_stock(), fast_retry())
}

// 2020-06-01 is a Monday.

#[tokio::test]
async fn range_concatenates_whole_trading_days() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2), day(3)]));
    let source = source_over(api.clone());
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Range {
                start: at(1, 0, 0),
                end: at(3, 23, 0),
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 720);
    assert_eq!(api.calls.load(Ordering::SeqCst), 3, "one fetch per day");
    for pair in bars.windows(2) {
        assert!(pair[0].datetime < pair[1].datetime);
    }
}

#[tokio::test]
async fn range_bounds_apply_only_to_edge_days() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2)]));
    let source = source_over(api);
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Range {
                start: at(1, 10, 0),
                end: at(2, 9, 40),
            },
        )
        .await
        .unwrap();
    // Monday from 10:00 (91 morning + 120 afternoon) plus Tuesday through 09:40
    assert_eq!(bars.len(), 211 + 10);
    assert_eq!(bars[0].datetime, at(1, 10, 0));
    assert_eq!(bars.last().unwrap().datetime, at(2, 9, 40));
}

#[tokio::test]
async fn weekend_days_are_never_requested() {
    // Friday the 5th through Monday the 8th
    let api = Arc::new(DayApi::seeded(&[day(5), day(8)]));
    let source = source_over(api.clone());
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Range {
                start: at(5, 0, 0),
                end: at(8, 23, 0),
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 480);
    assert_eq!(api.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn since_fetches_just_enough_days_and_truncates() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2), day(3), day(4)]));
    let source = source_over(api);
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Since {
                start: at(1, 14, 31),
                length: 300,
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 300);
    assert_eq!(bars[0].datetime, at(1, 14, 31));
    assert_eq!(bars.last().unwrap().datetime, at(3, 10, 0));
}

#[tokio::test]
async fn until_keeps_the_last_bars_only() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2), day(3)]));
    let source = source_over(api);
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Until {
                end: at(3, 9, 40),
                length: 250,
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 250);
    assert_eq!(bars[0].datetime, at(2, 9, 31));
    assert_eq!(bars.last().unwrap().datetime, at(3, 9, 40));
}

#[tokio::test]
async fn one_failed_day_aborts_the_whole_request() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2), day(3)]));
    api.fail_day(day(2), u32::MAX);
    let source = source_over(api);
    let err = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Range {
                start: at(1, 0, 0),
                end: at(3, 23, 0),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_transient(), "retries exhausted on a transient error");
}

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2)]));
    api.fail_day(day(2), 2);
    let source = source_over(api.clone());
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Range {
                start: at(1, 0, 0),
                end: at(2, 23, 0),
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 480);
    // day one once, day two thrice
    assert_eq!(api.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn hard_failures_are_not_retried() {
    let api = Arc::new(DayApi::seeded(&[day(1)]));
    let source = source_over(api.clone());
    let err = source
        .raw_history_bars(
            "MISSING",
            freq_1m(),
            BarWindow::Range {
                start: at(1, 0, 0),
                end: at(1, 23, 0),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KbarsError::NoData { .. }));
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_timestamps_keep_the_first_occurrence() {
    struct OverlapApi;

    #[async_trait]
    impl DayBarApi for OverlapApi {
        fn name(&self) -> &'static str {
            "overlap"
        }

        async fn bars_in_day(
            &self,
            _instrument: &str,
            _frequency: Frequency,
            _task: &DayTask,
        ) -> Result<Vec<Bar>, KbarsError> {
            // every day reports the same bar
            Ok(vec![Bar {
                datetime: at(1, 10, 0),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            }])
        }

        async fn available_range(&self) -> Result<(NaiveDate, NaiveDate), KbarsError> {
            Ok((day(1), day(2)))
        }
    }

    let source = DayBucketSource::new(
        Arc::new(OverlapApi),
        Arc::new(Weekdays),
        TradingSession::a_stock(),
        fast_retry(),
    );
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Range {
                start: at(1, 0, 0),
                end: at(2, 23, 0),
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 1);
}

#[tokio::test]
async fn non_minute_frequencies_are_rejected() {
    let api = Arc::new(DayApi::seeded(&[day(1)]));
    let source = source_over(api);
    for spec in ["1h", "1d"] {
        let err = source
            .raw_history_bars(
                "000001.XSHE",
                spec.parse().unwrap(),
                BarWindow::Range {
                    start: at(1, 0, 0),
                    end: at(1, 23, 0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KbarsError::UnsupportedFrequency { .. }), "{spec}");
    }
}

#[tokio::test]
async fn until_past_the_data_end_clamps_to_the_last_day() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2)]));
    let source = source_over(api.clone());
    // anchored ten days after the data ends
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Until {
                end: at(12, 15, 0),
                length: 100,
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 100);
    assert_eq!(bars.last().unwrap().datetime, at(2, 15, 0));
    assert_eq!(api.calls.load(Ordering::SeqCst), 1, "no fetches past the data");
}

#[tokio::test]
async fn since_before_the_data_start_clamps_to_the_first_day() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2)]));
    let source = source_over(api.clone());
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Since {
                start: NaiveDate::from_ymd_opt(2020, 5, 20)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                length: 100,
            },
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 100);
    assert_eq!(bars[0].datetime, at(1, 9, 31));
    assert_eq!(api.calls.load(Ordering::SeqCst), 1, "no fetches before the data");
}

#[tokio::test]
async fn windows_entirely_outside_the_data_return_empty() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(2)]));
    let source = source_over(api.clone());
    let bars = source
        .raw_history_bars(
            "000001.XSHE",
            freq_1m(),
            BarWindow::Until {
                end: NaiveDate::from_ymd_opt(2020, 5, 1)
                    .unwrap()
                    .and_hms_opt(15, 0, 0)
                    .unwrap(),
                length: 10,
            },
        )
        .await
        .unwrap();
    assert!(bars.is_empty());
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn available_range_comes_from_the_api() {
    let api = Arc::new(DayApi::seeded(&[day(1), day(3)]));
    let source = source_over(api);
    let (start, end) = source.available_data_range(freq_1m()).await.unwrap();
    assert_eq!(start, day(1));
    assert_eq!(end, day(3));
}
