//! Right-closed minute-bar aggregation.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::Bar;

/// The right-closed bucket a timestamp falls into on an N-minute grid
/// anchored at midnight of its own date.
///
/// A timestamp sitting exactly on a grid line belongs to the bucket it
/// closes, not the next one. Day anchoring keeps the partition identical
/// on every date, also for steps that do not divide a whole day.
fn bucket_close(ts: NaiveDateTime, step_secs: i64) -> (NaiveDate, i64) {
    let t = i64::from(ts.time().num_seconds_from_midnight());
    (ts.date(), t + (-t).rem_euclid(step_secs))
}

/// Aggregate one-minute bars into `minutes`-minute bars.
///
/// Buckets are right-closed on a grid anchored at each date's midnight, so
/// equal times of day always group together. Each output bar takes
/// the first open, the max high, the min low, the last close and the summed
/// volume of its constituents, and is stamped with the datetime of its last
/// constituent bar, so a bucket still missing its final minutes carries the
/// timestamp of the data it actually contains.
///
/// Input order does not matter; bars are sorted before aggregation. Inputs
/// that cannot be resampled (`minutes <= 1` or no bars) are returned as-is.
#[must_use]
pub fn resample_minute_bars(mut bars: Vec<Bar>, minutes: i64) -> Vec<Bar> {
    if bars.is_empty() || minutes <= 1 {
        return bars;
    }
    bars.sort_by_key(|bar| bar.datetime);
    let step_secs = minutes * 60;

    let mut out: Vec<Bar> = Vec::with_capacity(bars.len() / usize::try_from(minutes).unwrap_or(1));
    let mut current_close = bucket_close(bars[0].datetime, step_secs);
    let mut acc = bars[0];
    for bar in bars.into_iter().skip(1) {
        let close = bucket_close(bar.datetime, step_secs);
        if close == current_close {
            acc.datetime = bar.datetime;
            acc.high = acc.high.max(bar.high);
            acc.low = acc.low.min(bar.low);
            acc.close = bar.close;
            acc.volume += bar.volume;
        } else {
            out.push(acc);
            current_close = close;
            acc = bar;
        }
    }
    out.push(acc);
    out
}
