//! Odd-frequency data source: serves bar frequencies the underlying store
//! does not natively hold by fetching base bars and resampling.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::source::{AdjustmentProvider, BarSource};
use crate::timeseries::resample::resample_minute_bars;
use crate::window::BarWindow;
use crate::{Bar, FreqUnit, Frequency, KbarsError};

/// Price adjustment mode for corporate actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdjustType {
    /// Raw exchange prices.
    #[default]
    None,
    /// Forward-adjusted: historical prices rescaled to today's basis.
    Pre,
    /// Backward-adjusted: cumulative factors applied as-is.
    Post,
}

/// Decorator answering count-anchored history requests at any minute
/// multiple, resampling base bars when the inner source cannot serve the
/// frequency natively.
pub struct OddFrequencySource {
    inner: Arc<dyn BarSource>,
    adjustments: Option<Arc<dyn AdjustmentProvider>>,
}

impl OddFrequencySource {
    /// Wrap an inner source without adjustment support.
    #[must_use]
    pub fn new(inner: Arc<dyn BarSource>) -> Self {
        Self {
            inner,
            adjustments: None,
        }
    }

    /// Wrap an inner source with a corporate-action factor provider.
    #[must_use]
    pub fn with_adjustments(
        inner: Arc<dyn BarSource>,
        adjustments: Arc<dyn AdjustmentProvider>,
    ) -> Self {
        Self {
            inner,
            adjustments: Some(adjustments),
        }
    }

    /// The last `count` bars of `frequency` closing at or before `dt`.
    ///
    /// When the frequency is an odd minute multiple, base minute bars are
    /// over-fetched, resampled into right-closed buckets, and the still
    /// forming final bucket is dropped unless `include_current` is set.
    ///
    /// # Errors
    /// Returns [`KbarsError::UnsupportedFrequency`] for hour or day
    /// multiples the inner source cannot serve natively; inner fetch errors
    /// propagate.
    pub async fn history_bars(
        &self,
        instrument: &str,
        count: usize,
        frequency: Frequency,
        dt: NaiveDateTime,
        include_current: bool,
        adjust: AdjustType,
    ) -> Result<Vec<Bar>, KbarsError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut bars = if self.inner.is_base_frequency(frequency) {
            self.inner
                .raw_history_bars(
                    instrument,
                    frequency,
                    BarWindow::Until {
                        end: dt,
                        length: count,
                    },
                )
                .await?
        } else {
            let step = self.resample_step(frequency)?;
            // over-fetch so `count` full buckets survive the trim
            let lower = (count + 1) * usize::try_from(step).unwrap_or(1);
            let base = self
                .inner
                .raw_history_bars(
                    instrument,
                    frequency.base(),
                    BarWindow::Until {
                        end: dt,
                        length: lower,
                    },
                )
                .await?;
            if base.is_empty() {
                return Ok(Vec::new());
            }
            let mut resampled = resample_minute_bars(base, step);
            if !include_current && resampled.last().is_some_and(|bar| bar.datetime != dt) {
                resampled.pop();
            }
            if resampled.len() > count {
                resampled.drain(..resampled.len() - count);
            }
            resampled
        };
        self.adjust_bars(instrument, &mut bars, adjust);
        Ok(bars)
    }

    /// The single bar of `frequency` closing at `dt`, or a zero-volume flat
    /// bar carried forward from the latest earlier close when the exact
    /// timestamp has no data. `None` only when no earlier bar exists at all.
    ///
    /// # Errors
    /// Same failure modes as [`Self::history_bars`].
    pub async fn get_bar(
        &self,
        instrument: &str,
        dt: NaiveDateTime,
        frequency: Frequency,
    ) -> Result<Option<Bar>, KbarsError> {
        let bars = if self.inner.is_base_frequency(frequency) {
            self.inner
                .raw_history_bars(instrument, frequency, BarWindow::Until { end: dt, length: 1 })
                .await?
        } else {
            let step = self.resample_step(frequency)?;
            let base = self
                .inner
                .raw_history_bars(
                    instrument,
                    frequency.base(),
                    BarWindow::Until {
                        end: dt,
                        length: usize::try_from(step).unwrap_or(1),
                    },
                )
                .await?;
            resample_minute_bars(base, step)
        };
        Ok(bars.last().map(|last| {
            if last.datetime == dt {
                *last
            } else {
                Bar::flat(dt, last.close)
            }
        }))
    }

    /// The earliest and latest dates served, delegated to the inner source.
    ///
    /// # Errors
    /// Inner source errors propagate.
    pub async fn available_data_range(
        &self,
        frequency: Frequency,
    ) -> Result<(chrono::NaiveDate, chrono::NaiveDate), KbarsError> {
        self.inner.available_data_range(frequency).await
    }

    fn resample_step(&self, frequency: Frequency) -> Result<i64, KbarsError> {
        match frequency.unit() {
            FreqUnit::Minute => Ok(i64::from(frequency.number())),
            FreqUnit::Hour | FreqUnit::Day => {
                Err(KbarsError::unsupported_frequency(frequency))
            }
        }
    }

    fn adjust_bars(&self, instrument: &str, bars: &mut [Bar], adjust: AdjustType) {
        if matches!(adjust, AdjustType::None) || bars.is_empty() {
            return;
        }
        let Some(provider) = &self.adjustments else {
            return;
        };
        let factors = provider.ex_cum_factors(instrument);
        let Some(&(_, base)) = factors.last() else {
            return;
        };
        for bar in bars {
            let idx = factors.partition_point(|(dt, _)| *dt <= bar.datetime);
            let factor = if idx == 0 { 1.0 } else { factors[idx - 1].1 };
            let ratio = match adjust {
                AdjustType::Pre => factor / base,
                AdjustType::Post => factor,
                AdjustType::None => 1.0,
            };
            // prices only; volume stays in raw units
            bar.open *= ratio;
            bar.high *= ratio;
            bar.low *= ratio;
            bar.close *= ratio;
        }
    }
}
