//! The assembled retrieval stack and its builder.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use kbars_core::{
    AdjustType, AdjustmentProvider, Bar, BarSource, BarWindow, Clock, Frequency,
    IntradayBarSource, KbarsError, OddFrequencySource, RealtimeSource, TradingCalendar,
};
use kbars_middleware::CachingSource;
use kbars_types::CacheConfig;
use tracing::debug;

/// Builder assembling a retrieval stack around a base [`BarSource`].
///
/// Layers are fixed in order: the cache wraps the base source, the
/// history+live merge wraps the cache, and the odd-frequency resampler sits
/// on top answering the public API.
pub struct KbarsBuilder {
    base: Arc<dyn BarSource>,
    cache: Option<CacheConfig>,
    realtime: Option<(Arc<dyn IntradayBarSource>, Arc<dyn Clock>)>,
    calendar: Option<Arc<dyn TradingCalendar>>,
    adjustments: Option<Arc<dyn AdjustmentProvider>>,
}

impl KbarsBuilder {
    fn new(base: Arc<dyn BarSource>) -> Self {
        Self {
            base,
            cache: None,
            realtime: None,
            calendar: None,
            adjustments: None,
        }
    }

    /// Install the sliding-window cache. A config with `enabled: false`
    /// leaves the stack uncached.
    #[must_use]
    pub fn cache(mut self, cfg: CacheConfig) -> Self {
        self.cache = Some(cfg);
        self
    }

    /// Install the history+live merge layer. Requires a trading calendar.
    #[must_use]
    pub fn realtime(mut self, live: Arc<dyn IntradayBarSource>, clock: Arc<dyn Clock>) -> Self {
        self.realtime = Some((live, clock));
        self
    }

    /// Trading calendar used by the merge layer to locate the previous
    /// trading day's close.
    #[must_use]
    pub fn calendar(mut self, calendar: Arc<dyn TradingCalendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Corporate-action factor provider enabling price adjustment.
    #[must_use]
    pub fn adjustments(mut self, adjustments: Arc<dyn AdjustmentProvider>) -> Self {
        self.adjustments = Some(adjustments);
        self
    }

    /// Assemble the stack.
    ///
    /// # Errors
    /// Returns [`KbarsError::InvalidArg`] when the merge layer is requested
    /// without a trading calendar.
    pub fn build(self) -> Result<Kbars, KbarsError> {
        let mut source = self.base;
        let mut cache = None;
        if let Some(cfg) = self.cache
            && cfg.enabled
        {
            debug!(chunk_size = cfg.chunk_size, "installing bar cache");
            let caching = Arc::new(CachingSource::new(source, &cfg));
            cache = Some(caching.clone());
            source = caching;
        }
        if let Some((live, clock)) = self.realtime {
            let calendar = self.calendar.ok_or_else(|| {
                KbarsError::InvalidArg("realtime merge requires a trading calendar".into())
            })?;
            debug!("installing history+live merge layer");
            source = Arc::new(RealtimeSource::new(source, live, calendar, clock));
        }
        let odd = match self.adjustments {
            Some(adjustments) => OddFrequencySource::with_adjustments(source.clone(), adjustments),
            None => OddFrequencySource::new(source.clone()),
        };
        Ok(Kbars { source, odd, cache })
    }
}

/// The assembled bar-retrieval stack.
pub struct Kbars {
    source: Arc<dyn BarSource>,
    odd: OddFrequencySource,
    cache: Option<Arc<CachingSource>>,
}

impl Kbars {
    /// Start building a stack from a base source.
    #[must_use]
    pub fn builder(base: Arc<dyn BarSource>) -> KbarsBuilder {
        KbarsBuilder::new(base)
    }

    /// The last `count` bars of `frequency` closing at or before `dt`.
    ///
    /// # Errors
    /// Propagates source and frequency errors.
    pub async fn history_bars(
        &self,
        instrument: &str,
        count: usize,
        frequency: Frequency,
        dt: NaiveDateTime,
        include_current: bool,
        adjust: AdjustType,
    ) -> Result<Vec<Bar>, KbarsError> {
        self.odd
            .history_bars(instrument, count, frequency, dt, include_current, adjust)
            .await
    }

    /// The single bar of `frequency` at `dt`, with flat-bar synthesis for
    /// non-trading instants.
    ///
    /// # Errors
    /// Propagates source and frequency errors.
    pub async fn get_bar(
        &self,
        instrument: &str,
        dt: NaiveDateTime,
        frequency: Frequency,
    ) -> Result<Option<Bar>, KbarsError> {
        self.odd.get_bar(instrument, dt, frequency).await
    }

    /// Raw window fetch against the assembled stack, below the resampler.
    ///
    /// # Errors
    /// Propagates source errors.
    pub async fn raw_history_bars(
        &self,
        instrument: &str,
        frequency: Frequency,
        window: BarWindow,
    ) -> Result<Vec<Bar>, KbarsError> {
        self.source
            .raw_history_bars(instrument, frequency, window)
            .await
    }

    /// The earliest and latest dates the stack can serve for `frequency`.
    ///
    /// # Errors
    /// Propagates source errors.
    pub async fn available_data_range(
        &self,
        frequency: Frequency,
    ) -> Result<(NaiveDate, NaiveDate), KbarsError> {
        self.odd.available_data_range(frequency).await
    }

    /// Drop every cached window. No-op when the cache is not installed.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
    }
}
