//! History + live-session merge source.
//!
//! Historical stores typically lag by one trading day, so during a live
//! session the current day's bars come from a separate low-latency store.
//! This decorator splits every request at the boundary between the previous
//! trading day's close and today, fetches each side from the right store,
//! and returns one seamless ascending series.

use std::cmp;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::source::{BarSource, Clock, IntradayBarSource, TradingCalendar};
use crate::window::BarWindow;
use crate::{Bar, Frequency, KbarsError};

/// Decorator merging a lagging historical source with a live intraday store.
pub struct RealtimeSource {
    hist: Arc<dyn BarSource>,
    live: Arc<dyn IntradayBarSource>,
    calendar: Arc<dyn TradingCalendar>,
    clock: Arc<dyn Clock>,
}

impl RealtimeSource {
    /// Assemble the merge layer from its collaborators.
    #[must_use]
    pub fn new(
        hist: Arc<dyn BarSource>,
        live: Arc<dyn IntradayBarSource>,
        calendar: Arc<dyn TradingCalendar>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hist,
            live,
            calendar,
            clock,
        }
    }

    /// End of the last trading day before `today`, as a bar timestamp bound.
    fn previous_close_bound(&self, today: NaiveDate) -> NaiveDateTime {
        self.calendar
            .previous_trading_date(today)
            .and_hms_opt(23, 59, 59)
            .expect("static time")
    }
}

#[async_trait]
impl BarSource for RealtimeSource {
    fn name(&self) -> &'static str {
        "realtime"
    }

    async fn raw_history_bars(
        &self,
        instrument: &str,
        frequency: Frequency,
        window: BarWindow,
    ) -> Result<Vec<Bar>, KbarsError> {
        let now = self.clock.now();
        let today = now.date();
        match window {
            BarWindow::Range { start, end } => {
                let end = cmp::min(end, now);
                if start > end {
                    return Ok(Vec::new());
                }
                let hist_end = cmp::min(end, self.previous_close_bound(today));
                let mut bars = if start.date() < today && start <= hist_end {
                    self.hist
                        .raw_history_bars(
                            instrument,
                            frequency,
                            BarWindow::Range {
                                start,
                                end: hist_end,
                            },
                        )
                        .await?
                } else {
                    Vec::new()
                };
                if end.date() == today {
                    let start_time = (start.date() == today).then(|| start.time());
                    let today_bars = self
                        .live
                        .bars(instrument, frequency, today, start_time, Some(end.time()))
                        .await?;
                    bars.extend(today_bars);
                }
                Ok(bars)
            }
            BarWindow::Since { start, length } => {
                if start.date() > today {
                    return Ok(Vec::new());
                }
                let mut bars = if start.date() < today {
                    self.hist
                        .raw_history_bars(instrument, frequency, BarWindow::Since { start, length })
                        .await?
                } else {
                    Vec::new()
                };
                let left = length.saturating_sub(bars.len());
                if left > 0 {
                    let start_time = (start.date() == today).then(|| start.time());
                    let mut today_bars = self
                        .live
                        .bars(instrument, frequency, today, start_time, None)
                        .await?;
                    today_bars.truncate(left);
                    bars.extend(today_bars);
                }
                Ok(bars)
            }
            BarWindow::Until { end, length } => {
                let end = cmp::min(end, now);
                if end.date() < today {
                    return self
                        .hist
                        .raw_history_bars(instrument, frequency, BarWindow::Until { end, length })
                        .await;
                }
                let mut today_bars = self
                    .live
                    .bars(instrument, frequency, today, None, Some(end.time()))
                    .await?;
                if today_bars.len() > length {
                    today_bars.drain(..today_bars.len() - length);
                }
                let left = length - today_bars.len();
                let mut bars = if left > 0 {
                    self.hist
                        .raw_history_bars(
                            instrument,
                            frequency,
                            BarWindow::Until {
                                end: cmp::min(end, self.previous_close_bound(today)),
                                length: left,
                            },
                        )
                        .await?
                } else {
                    Vec::new()
                };
                bars.extend(today_bars);
                Ok(bars)
            }
        }
    }

    async fn available_data_range(
        &self,
        frequency: Frequency,
    ) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        let (start, _) = self.hist.available_data_range(frequency).await?;
        Ok((start, self.clock.now().date()))
    }
}
