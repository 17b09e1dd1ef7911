//! Trading-session layout and in-day trading-point enumeration.
//!
//! A session is described by its opening bar close time plus one or more
//! continuous periods (offset and duration in minutes from the open). The
//! A-share layout, with its lunch break, is the canonical example: the
//! morning bars close 09:31 through 11:30 and the afternoon bars close
//! 13:01 through 15:00.
//!
//! A "trading point" is a timestamp at which a bar of a given frequency
//! closes. Buckets are anchored to each period's open, and a period whose
//! span is not a whole multiple of the bar length still closes a final
//! partial bar at the period's last minute.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::{Frequency, KbarsError};

/// One continuous trading period, positioned relative to the session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPeriod {
    /// Minutes from the session open to this period's first bar close.
    pub offset_minutes: u32,
    /// Length of the period in minutes (number of one-minute bar closes).
    pub duration_minutes: u32,
}

impl SessionPeriod {
    fn first_close(&self, open: NaiveTime) -> NaiveTime {
        open + Duration::minutes(i64::from(self.offset_minutes))
    }

    fn last_close(&self, open: NaiveTime) -> NaiveTime {
        self.first_close(open) + Duration::minutes(i64::from(self.duration_minutes) - 1)
    }

    /// The bucket anchor: one minute before the first close, so the first
    /// N-minute bucket closes exactly N minutes into the period.
    fn anchor(&self, open: NaiveTime) -> NaiveTime {
        self.first_close(open) - Duration::minutes(1)
    }
}

/// A full trading day layout for one venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingSession {
    /// Close time of the day's first one-minute bar.
    pub open: NaiveTime,
    /// Continuous periods, ascending and non-overlapping.
    pub periods: Vec<SessionPeriod>,
}

fn secs(t: NaiveTime) -> i64 {
    i64::from(t.num_seconds_from_midnight())
}

impl TradingSession {
    /// Build a session from an open time and its periods.
    #[must_use]
    pub fn new(open: NaiveTime, periods: Vec<SessionPeriod>) -> Self {
        Self { open, periods }
    }

    /// The mainland China A-share session: 09:31..=11:30 and 13:01..=15:00.
    #[must_use]
    pub fn a_stock() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 31, 0).expect("static time"),
            periods: vec![
                SessionPeriod {
                    offset_minutes: 0,
                    duration_minutes: 120,
                },
                SessionPeriod {
                    offset_minutes: 210,
                    duration_minutes: 120,
                },
            ],
        }
    }

    /// All bar-close timestamps for `frequency` on `date`, ascending.
    ///
    /// Buckets restart at each period's anchor, so a 30m frequency on the
    /// A-share session yields 10:00, 10:30, 11:00, 11:30, 13:30, 14:00,
    /// 14:30 and 15:00. A period span that is not a whole multiple of the
    /// bar length closes a final partial bar at the period's last minute.
    ///
    /// Daily frequency yields the single close of the final period.
    ///
    /// # Errors
    /// Returns [`KbarsError::UnsupportedFrequency`] for daily frequencies
    /// with a multiplier other than one.
    pub fn trading_points(
        &self,
        date: NaiveDate,
        frequency: Frequency,
    ) -> Result<BTreeSet<NaiveDateTime>, KbarsError> {
        let mut points = BTreeSet::new();
        let Some(step) = frequency.step_minutes() else {
            if frequency.number() != 1 {
                return Err(KbarsError::unsupported_frequency(frequency));
            }
            if let Some(last) = self.periods.last() {
                points.insert(date.and_time(last.last_close(self.open)));
            }
            return Ok(points);
        };
        let step_s = step * 60;
        for period in &self.periods {
            let anchor = period.anchor(self.open);
            let last = period.last_close(self.open);
            let span = secs(last) - secs(anchor);
            for k in 1..=span / step_s {
                points.insert(date.and_time(anchor + Duration::seconds(k * step_s)));
            }
            if span % step_s != 0 {
                points.insert(date.and_time(last));
            }
        }
        Ok(points)
    }

    /// How many bars of `frequency` close in the half-open time window
    /// `(start, end]` on a trading day.
    ///
    /// Computed algebraically per period; agrees exactly with filtering
    /// [`Self::trading_points`] by the same interval.
    ///
    /// # Errors
    /// Returns [`KbarsError::UnsupportedFrequency`] for daily frequencies.
    pub fn bar_count_in_window(
        &self,
        start: NaiveTime,
        end: NaiveTime,
        frequency: Frequency,
    ) -> Result<usize, KbarsError> {
        let Some(step) = frequency.step_minutes() else {
            return Err(KbarsError::unsupported_frequency(frequency));
        };
        let step_s = step * 60;
        let ws = secs(start);
        let we = secs(end);
        let mut count = 0usize;
        for period in &self.periods {
            let a = secs(period.anchor(self.open));
            let c = secs(period.last_close(self.open));
            let k_full = (c - a) / step_s;
            let k_lo = ((ws - a).div_euclid(step_s) + 1).max(1);
            let k_hi = ((we - a).div_euclid(step_s)).min(k_full);
            if k_hi >= k_lo {
                count += usize::try_from(k_hi - k_lo + 1).unwrap_or_default();
            }
            // trailing partial bucket closing at the period's last minute
            if (c - a) % step_s != 0 && ws < c && c <= we {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Total number of bars of `frequency` in one full trading day.
    ///
    /// # Errors
    /// Returns [`KbarsError::UnsupportedFrequency`] for daily frequencies.
    pub fn bars_per_day(&self, frequency: Frequency) -> Result<usize, KbarsError> {
        let Some(step) = frequency.step_minutes() else {
            return Err(KbarsError::unsupported_frequency(frequency));
        };
        let step_s = step * 60;
        let mut count = 0usize;
        for period in &self.periods {
            let span = secs(period.last_close(self.open)) - secs(period.anchor(self.open));
            count += usize::try_from(span / step_s).unwrap_or_default();
            if span % step_s != 0 {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Total traded minutes in one full day (one-minute bar count).
    #[must_use]
    pub fn minutes_per_day(&self) -> u32 {
        self.periods.iter().map(|p| p.duration_minutes).sum()
    }
}

/// Merge the trading points of several venues on the same date.
///
/// # Errors
/// Propagates the first frequency error from any session.
pub fn union_trading_points(
    sessions: &[TradingSession],
    date: NaiveDate,
    frequency: Frequency,
) -> Result<BTreeSet<NaiveDateTime>, KbarsError> {
    let mut merged = BTreeSet::new();
    for session in sessions {
        merged.extend(session.trading_points(date, frequency)?);
    }
    Ok(merged)
}
