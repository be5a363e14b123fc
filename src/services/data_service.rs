use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::api::{ApiError, QuoteProvider};
use crate::models::{RawSeries, Ticker};

/// Why a ticker's history could not be loaded
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataFetchError {
    #[error("Ticker {0} is unknown to the quote provider")]
    UnknownTicker(Ticker),
    #[error("No price data for {ticker} between {start} and {end}")]
    Empty {
        ticker: Ticker,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Failed to load {ticker}: {source}")]
    Provider {
        ticker: Ticker,
        #[source]
        source: ApiError,
    },
}

/// Half-open date range `[start, end)` requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    /// First day of every series
    pub fn history_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default()
    }

    /// From the fixed history start up to `end`
    pub fn until(end: NaiveDate) -> Self {
        Self {
            start: Self::history_start(),
            end,
        }
    }
}

type Slot = Arc<OnceCell<Arc<RawSeries>>>;

/// Loaded series keyed by ticker, kept until explicitly cleared.
///
/// Each ticker has its own once-cell; the map lock is only held long enough
/// to find or insert a cell, never across a fetch. The fetch window is not
/// part of the key: an entry loaded yesterday is still served today.
#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: Mutex<HashMap<Ticker, Slot>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, ticker: Ticker) -> Slot {
        let mut entries = self.entries.lock().await;
        Arc::clone(entries.entry(ticker).or_default())
    }

    /// Number of tickers with a loaded series
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|slot| slot.initialized()).count()
    }

    /// Loaded tickers with their row counts, in selection order
    pub async fn entries(&self) -> Vec<(Ticker, usize)> {
        let entries = self.entries.lock().await;
        Ticker::ALL
            .iter()
            .filter_map(|t| entries.get(t).and_then(|slot| slot.get()).map(|s| (*t, s.len())))
            .collect()
    }

    /// Drop every entry, returning how many loaded series were held. A fetch
    /// still in flight finishes into a detached cell and is not kept.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let dropped = entries.values().filter(|slot| slot.initialized()).count();
        entries.clear();
        dropped
    }
}

/// Memoizing front of a `QuoteProvider`
pub struct DataLoader<P: QuoteProvider> {
    provider: P,
    cache: Arc<SeriesCache>,
    window: FetchWindow,
}

impl<P: QuoteProvider> DataLoader<P> {
    pub fn new(provider: P, cache: Arc<SeriesCache>, window: FetchWindow) -> Self {
        Self {
            provider,
            cache,
            window,
        }
    }

    pub fn window(&self) -> FetchWindow {
        self.window
    }

    pub fn cache(&self) -> &Arc<SeriesCache> {
        &self.cache
    }

    /// Full daily history of `ticker`. The first call per ticker hits the
    /// provider; later calls return the same `Arc`. Concurrent misses for the
    /// same ticker share one fetch, other tickers are not held up by it.
    /// Failures are not cached.
    pub async fn load(&self, ticker: Ticker) -> Result<Arc<RawSeries>, DataFetchError> {
        let slot = self.cache.slot(ticker).await;
        if let Some(series) = slot.get() {
            debug!("Cache hit for {} ({} rows)", ticker, series.len());
            return Ok(Arc::clone(series));
        }

        let series = slot.get_or_try_init(|| self.fetch(ticker)).await?;
        Ok(Arc::clone(series))
    }

    async fn fetch(&self, ticker: Ticker) -> Result<Arc<RawSeries>, DataFetchError> {
        let FetchWindow { start, end } = self.window;
        info!("Loading {} from {} to {}", ticker, start, end);

        let series = self
            .provider
            .fetch_daily_bars(ticker, start, end)
            .await
            .map_err(|e| {
                warn!("Quote provider failed for {}: {}", ticker, e);
                match e {
                    ApiError::NotFound(_) => DataFetchError::UnknownTicker(ticker),
                    ApiError::NoData => DataFetchError::Empty { ticker, start, end },
                    source => DataFetchError::Provider { ticker, source },
                }
            })?;

        if series.is_empty() {
            return Err(DataFetchError::Empty { ticker, start, end });
        }

        info!(
            "Loaded {} rows for {} ({:?} .. {:?})",
            series.len(),
            ticker,
            series.first_date(),
            series.last_date()
        );

        Ok(Arc::new(series))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::TimeSeriesRow;
    use chrono::Duration;
    use serenity::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    /// In-memory provider producing `rows` consecutive weekday bars per ticker
    pub(crate) struct StubProvider {
        pub rows: usize,
        pub calls: AtomicUsize,
        pub fail_with: Option<ApiError>,
        /// Requests for this ticker never complete
        pub hang_on: Option<Ticker>,
    }

    impl StubProvider {
        pub(crate) fn with_rows(rows: usize) -> Self {
            Self {
                rows,
                calls: AtomicUsize::new(0),
                fail_with: None,
                hang_on: None,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn weekday_series(ticker: Ticker, start: NaiveDate, rows: usize) -> RawSeries {
        use chrono::{Datelike, Weekday};

        let mut out = Vec::with_capacity(rows);
        let mut date = start;
        let mut i = 0usize;
        while out.len() < rows {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let close = 100.0 + 0.05 * i as f64 + (i as f64 / 7.0).sin();
                out.push(TimeSeriesRow {
                    date,
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000 + i as u64,
                });
                i += 1;
            }
            date += Duration::days(1);
        }
        RawSeries::new(ticker, out)
    }

    #[async_trait]
    impl QuoteProvider for StubProvider {
        async fn fetch_daily_bars(
            &self,
            ticker: Ticker,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<RawSeries, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang_on == Some(ticker) {
                std::future::pending::<()>().await;
            }
            tokio::task::yield_now().await;
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(weekday_series(ticker, start, self.rows)),
            }
        }
    }

    pub(crate) fn window() -> FetchWindow {
        FetchWindow::until(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
    }

    pub(crate) fn stub_loader(provider: StubProvider) -> DataLoader<StubProvider> {
        DataLoader::new(provider, Arc::new(SeriesCache::new()), window())
    }

    #[tokio::test]
    async fn test_load_is_memoized_per_ticker() {
        let loader = stub_loader(StubProvider::with_rows(50));

        let first = loader.load(Ticker::Aapl).await.unwrap();
        let second = loader.load(Ticker::Aapl).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(loader.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let loader = stub_loader(StubProvider::with_rows(50));

        let (a, b) = tokio::join!(loader.load(Ticker::Aapl), loader.load(Ticker::Aapl));

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(loader.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_stalled_fetch_does_not_block_other_tickers() {
        let mut provider = StubProvider::with_rows(20);
        provider.hang_on = Some(Ticker::Goog);
        let loader = Arc::new(stub_loader(provider));
        loader.load(Ticker::Aapl).await.unwrap();

        let stalled = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load(Ticker::Goog).await })
        };
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert_eq!(loader.provider.calls(), 2);

        let wait = StdDuration::from_secs(2);
        assert!(timeout(wait, loader.load(Ticker::Aapl)).await.is_ok());
        assert!(timeout(wait, loader.load(Ticker::Msft)).await.is_ok());
        assert_eq!(timeout(wait, loader.cache().len()).await, Ok(2));
        assert_eq!(timeout(wait, loader.cache().clear()).await, Ok(2));

        assert!(!stalled.is_finished());
        stalled.abort();
    }

    #[tokio::test]
    async fn test_switching_ticker_is_a_cache_miss() {
        let loader = stub_loader(StubProvider::with_rows(20));

        let aapl = loader.load(Ticker::Aapl).await.unwrap();
        let goog = loader.load(Ticker::Goog).await.unwrap();

        assert_eq!(aapl.ticker, Ticker::Aapl);
        assert_eq!(goog.ticker, Ticker::Goog);
        assert_eq!(loader.provider.calls(), 2);
        assert_eq!(loader.cache().len().await, 2);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let cache = Arc::new(SeriesCache::new());
        let loader = DataLoader::new(StubProvider::with_rows(20), Arc::clone(&cache), window());

        loader.load(Ticker::Msft).await.unwrap();
        assert_eq!(cache.entries().await, vec![(Ticker::Msft, 20)]);
        assert_eq!(cache.clear().await, 1);
        assert!(cache.entries().await.is_empty());

        loader.load(Ticker::Msft).await.unwrap();
        assert_eq!(loader.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_loaded_dates_strictly_increase() {
        let loader = stub_loader(StubProvider::with_rows(300));

        for ticker in Ticker::ALL {
            let series = loader.load(ticker).await.unwrap();
            assert!(series.rows.windows(2).all(|w| w[1].date > w[0].date));
        }
    }

    #[tokio::test]
    async fn test_provider_errors_are_not_cached() {
        let mut provider = StubProvider::with_rows(10);
        provider.fail_with = Some(ApiError::NotFound("No data found".to_string()));
        let loader = stub_loader(provider);

        let err = loader.load(Ticker::Sbkff).await.unwrap_err();
        assert_eq!(err, DataFetchError::UnknownTicker(Ticker::Sbkff));
        assert!(loader.load(Ticker::Sbkff).await.is_err());
        assert_eq!(loader.provider.calls(), 2);
        assert_eq!(loader.cache().len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_window_is_an_error() {
        let loader = stub_loader(StubProvider::with_rows(0));
        assert!(matches!(
            loader.load(Ticker::Hdb).await,
            Err(DataFetchError::Empty { .. })
        ));
    }

    #[test]
    fn test_window_starts_in_2010() {
        let w = window();
        assert_eq!(w.start, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert!(w.end > w.start);
    }
}
