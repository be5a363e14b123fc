//! Upstream market data

use chrono::NaiveDate;
use serenity::async_trait;

use crate::models::{RawSeries, Ticker};

pub mod yahoo;

pub use yahoo::{ApiError, YahooClient};

/// Source of daily bars for one ticker over `[start, end)`
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_daily_bars(
        &self,
        ticker: Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, ApiError>;
}
