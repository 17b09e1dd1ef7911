use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use kbars_core::{Bar, BarSource, BarWindow, Frequency, KbarsError, Middleware};
use kbars_types::CacheConfig;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

/// Identity of a cache entry: one sliding window per instrument/frequency pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    instrument: String,
    frequency: Frequency,
}

/// One contiguous run of cached bars for a single instrument and frequency.
///
/// The buffer always holds a consecutive slice of the underlying series, so
/// coverage checks reduce to binary searches against its two ends. Once the
/// source reports no data past the buffer, the entry is `finished` and stops
/// triggering backfills.
struct CacheEntry {
    bars: Vec<Bar>,
    chunk: usize,
    finished: bool,
}

impl CacheEntry {
    const fn new(chunk: usize) -> Self {
        Self {
            bars: Vec::new(),
            chunk,
            finished: false,
        }
    }

    fn last_datetime(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|bar| bar.datetime)
    }

    fn close(&mut self) {
        self.finished = true;
    }

    /// Extend the buffer forward, keeping at most twice the chunk size. A
    /// short fetch means the source ran out of data, closing the entry.
    fn append(&mut self, bars: Vec<Bar>, requested: usize) {
        if bars.len() < requested {
            self.close();
        }
        self.bars.extend(bars);
        if self.bars.len() > 2 * self.chunk {
            let excess = self.bars.len() - 2 * self.chunk;
            self.bars.drain(..excess);
        }
    }

    /// Serve `window` from the buffer, or `None` when coverage is not
    /// provable.
    ///
    /// The right edge is covered when a cached bar lies at or beyond the end
    /// bound; the left edge when one lies at or before the start bound. A
    /// window touching the buffer's first bar without matching it exactly is
    /// a miss, since earlier bars may exist that were never fetched.
    fn slice(&self, window: &BarWindow) -> Option<Vec<Bar>> {
        let bars = &self.bars;
        match *window {
            BarWindow::Range { start, end } => {
                if !self.covers_right(end) {
                    return None;
                }
                let end_pos = bars.partition_point(|bar| bar.datetime <= end);
                let start_pos = bars.partition_point(|bar| bar.datetime < start);
                if start_pos == 0 && bars.first().map(|bar| bar.datetime) != Some(start) {
                    return None;
                }
                Some(bars[start_pos..end_pos].to_vec())
            }
            BarWindow::Until { end, length } => {
                if !self.covers_right(end) {
                    return None;
                }
                let end_pos = bars.partition_point(|bar| bar.datetime <= end);
                (end_pos >= length).then(|| bars[end_pos - length..end_pos].to_vec())
            }
            BarWindow::Since { start, length } => {
                let start_pos = bars.partition_point(|bar| bar.datetime < start);
                if start_pos == 0 && bars.first().map(|bar| bar.datetime) != Some(start) {
                    return None;
                }
                (start_pos + length <= bars.len())
                    .then(|| bars[start_pos..start_pos + length].to_vec())
            }
        }
    }

    fn covers_right(&self, end: NaiveDateTime) -> bool {
        let beyond = self.bars.partition_point(|bar| bar.datetime <= end);
        beyond < self.bars.len() || self.last_datetime() == Some(end)
    }
}

/// Caching decorator over a [`BarSource`].
///
/// Each (instrument, frequency) pair owns an independent sliding window of
/// bars, backfilled in fixed-size chunks as requests walk forward in time.
/// Entries live in an LRU map sized so total resident bars stay under the
/// configured budget; the least recently used window is evicted whole.
pub struct CachingSource {
    inner: Arc<dyn BarSource>,
    entries: Mutex<LruCache<CacheKey, Arc<Mutex<CacheEntry>>>>,
    chunk: usize,
}

impl CachingSource {
    /// Wrap `inner` with a cache sized from `cfg`.
    #[must_use]
    pub fn new(inner: Arc<dyn BarSource>, cfg: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(cfg.max_entries()).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            entries: Mutex::new(LruCache::new(capacity)),
            chunk: cfg.chunk_size.max(1),
        }
    }

    /// Drop every cached window.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    async fn entry(&self, instrument: &str, frequency: Frequency) -> Arc<Mutex<CacheEntry>> {
        let key = CacheKey {
            instrument: instrument.to_string(),
            frequency,
        };
        let mut map = self.entries.lock().await;
        if let Some(entry) = map.get(&key) {
            return entry.clone();
        }
        let entry = Arc::new(Mutex::new(CacheEntry::new(self.chunk)));
        map.push(key, entry.clone());
        entry
    }

    /// Extend an entry by one chunk toward and past the request's anchor.
    ///
    /// A fresh entry is first warmed with the chunk of history preceding the
    /// anchor, so backward-looking requests near the anchor hit immediately;
    /// a populated entry continues one second past its last cached bar. An
    /// empty forward fetch closes the entry.
    async fn backfill(
        &self,
        instrument: &str,
        frequency: Frequency,
        window: &BarWindow,
        entry: &mut CacheEntry,
    ) -> Result<(), KbarsError> {
        let anchor = window.anchor();
        let from = if let Some(last) = entry.last_datetime() {
            last + Duration::seconds(1)
        } else {
            let warm = self
                .inner
                .raw_history_bars(
                    instrument,
                    frequency,
                    BarWindow::Until {
                        end: anchor - Duration::seconds(1),
                        length: self.chunk,
                    },
                )
                .await?;
            if !warm.is_empty() {
                let fetched = warm.len();
                entry.append(warm, fetched);
            }
            anchor
        };
        let next = self
            .inner
            .raw_history_bars(
                instrument,
                frequency,
                BarWindow::Since {
                    start: from,
                    length: self.chunk,
                },
            )
            .await?;
        if next.is_empty() {
            entry.close();
        } else {
            entry.append(next, self.chunk);
        }
        Ok(())
    }
}

#[async_trait]
impl BarSource for CachingSource {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn raw_history_bars(
        &self,
        instrument: &str,
        frequency: Frequency,
        window: BarWindow,
    ) -> Result<Vec<Bar>, KbarsError> {
        let entry = self.entry(instrument, frequency).await;
        let mut guard = entry.lock().await;
        if let Some(bars) = guard.slice(&window) {
            return Ok(bars);
        }
        if !guard.finished {
            self.backfill(instrument, frequency, &window, &mut guard)
                .await?;
            if let Some(bars) = guard.slice(&window) {
                return Ok(bars);
            }
        }
        debug!(instrument, frequency = %frequency, "cache miss, delegating");
        drop(guard);
        self.inner
            .raw_history_bars(instrument, frequency, window)
            .await
    }

    async fn available_data_range(
        &self,
        frequency: Frequency,
    ) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        self.inner.available_data_range(frequency).await
    }
}

/// Declarative wrapper that installs the cache when building a source stack.
pub struct CacheMiddleware {
    cfg: CacheConfig,
}

impl CacheMiddleware {
    /// Build the middleware from its config.
    #[must_use]
    pub const fn new(cfg: CacheConfig) -> Self {
        Self { cfg }
    }
}

impl Middleware for CacheMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn BarSource>) -> Arc<dyn BarSource> {
        let Self { cfg } = *self;
        if !cfg.enabled {
            return inner;
        }
        Arc::new(CachingSource::new(inner, &cfg))
    }

    fn name(&self) -> &'static str {
        "CachingMiddleware"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "chunk_size": self.cfg.chunk_size,
            "max_resident_bars": self.cfg.max_resident_bars,
            "enabled": self.cfg.enabled,
        })
    }
}
