use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::Client as HttpClient;
use serenity::async_trait;
use tracing::{debug, warn};

use super::models::{ApiError, ChartResponse};
use crate::api::QuoteProvider;
use crate::models::{RawSeries, Ticker, TimeSeriesRow};

/// Yahoo Finance chart API client for daily price history
pub struct YahooClient {
    http_client: HttpClient,
    base_url: String,
}

impl YahooClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://query1.finance.yahoo.com/v8/finance/chart";
    const USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

    /// Create a new client; `base_url` points at the chart endpoint
    pub fn with_base_url(base_url: String) -> Result<Self, ApiError> {
        // No request timeout: a stalled provider stalls the command
        let http_client = HttpClient::builder()
            .user_agent(Self::USER_AGENT)
            .build()
            .map_err(|e| ApiError::RequestError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, symbol: &str) -> String {
        format!("{}/{}", self.base_url, symbol.replace('^', "%5E"))
    }

    /// Midnight UTC of `date` as unix seconds
    fn unix_seconds(date: NaiveDate) -> i64 {
        date.and_time(NaiveTime::MIN).and_utc().timestamp()
    }

    /// Parse error response based on HTTP status code
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let body_text = response.text().await.unwrap_or_default();

        // The chart endpoint usually explains itself in the body
        let description = serde_json::from_str::<ChartResponse>(&body_text)
            .ok()
            .and_then(|r| r.chart.error)
            .map(|e| e.description)
            .unwrap_or(body_text);

        match status_code {
            404 => ApiError::NotFound(description),
            429 => {
                warn!("Rate limited by quote provider: {}", description);
                ApiError::RateLimited(description)
            }
            500..=599 => {
                warn!("Server error {}: {}", status_code, description);
                ApiError::ServerError(status_code, description)
            }
            _ => ApiError::HttpError(status_code, description),
        }
    }

    /// Turn a chart body into a series: incomplete bars are skipped, bar
    /// timestamps become exchange-local dates, and a repeated date keeps its
    /// last bar.
    pub fn parse_chart(ticker: Ticker, body: &str) -> Result<RawSeries, ApiError> {
        let response: ChartResponse = serde_json::from_str(body).map_err(|e| {
            ApiError::DeserializationError(format!("Failed to parse response: {}", e))
        })?;

        if let Some(error) = response.chart.error {
            return Err(if error.code.eq_ignore_ascii_case("Not Found") {
                ApiError::NotFound(error.description)
            } else {
                ApiError::ProviderError {
                    code: error.code,
                    description: error.description,
                }
            });
        }

        let result = response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or(ApiError::NoData)?;

        let gmtoffset = result.meta.as_ref().map(|m| m.gmtoffset).unwrap_or(0);
        if let Some(meta) = &result.meta {
            debug!(
                "Chart for {} ({}) in {} ({} bars)",
                meta.symbol.as_deref().unwrap_or(ticker.symbol()),
                meta.currency.as_deref().unwrap_or("?"),
                meta.exchange_timezone_name.as_deref().unwrap_or("UTC"),
                result.timestamp.len()
            );
        }

        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let mut rows: Vec<TimeSeriesRow> = Vec::with_capacity(result.timestamp.len());

        for (i, &ts) in result.timestamp.iter().enumerate() {
            let field = |column: &[Option<f64>]| column.get(i).copied().flatten();
            let bar = (
                field(&quote.open),
                field(&quote.high),
                field(&quote.low),
                field(&quote.close),
                quote.volume.get(i).copied().flatten(),
            );
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = bar else {
                continue;
            };
            let Some(local) = DateTime::from_timestamp(ts + gmtoffset, 0) else {
                continue;
            };

            rows.push(TimeSeriesRow {
                date: local.date_naive(),
                open,
                high,
                low,
                close,
                volume,
            });
        }

        rows.sort_by_key(|r| r.date);
        let mut unique: Vec<TimeSeriesRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match unique.last_mut() {
                Some(last) if last.date == row.date => *last = row,
                _ => unique.push(row),
            }
        }

        if unique.is_empty() {
            return Err(ApiError::NoData);
        }

        Ok(RawSeries::new(ticker, unique))
    }
}

#[async_trait]
impl QuoteProvider for YahooClient {
    /// GET /{symbol}?period1=..&period2=..&interval=1d
    ///
    /// `end` is exclusive.
    async fn fetch_daily_bars(
        &self,
        ticker: Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, ApiError> {
        let url = self.build_url(ticker.symbol());
        let period1 = Self::unix_seconds(start).to_string();
        let period2 = Self::unix_seconds(end).to_string();

        debug!("GET {} period1={} period2={}", url, period1, period2);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
            ])
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::RequestError(format!("Failed to read response: {}", e)))?;

        Self::parse_chart(ticker, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","currency":"USD","exchangeTimezoneName":"America/New_York","gmtoffset":-14400},"timestamp":[1704205800,1704292200,1704378600],"indicators":{"quote":[{"open":[187.15,184.22,182.15],"high":[188.44,185.88,183.09],"low":[183.89,183.43,180.88],"close":[185.64,184.25,181.91],"volume":[82488700,58414500,71983600]}]}}],"error":null}}"#;

    #[test]
    fn test_parse_chart_valid() {
        let series = YahooClient::parse_chart(Ticker::Aapl, VALID).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.rows[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.rows[2].close, 181.91);
        assert_eq!(series.rows[1].volume, 58_414_500);
    }

    #[test]
    fn test_parse_chart_skips_incomplete_bars() {
        let json = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"timestamp":[1704240000,1704326400,1704412800],"indicators":{"quote":[{"open":[1.0,null,3.0],"high":[1.0,2.0,3.0],"low":[1.0,2.0,3.0],"close":[1.0,2.0,3.0],"volume":[10,20,30]}]}}],"error":null}}"#;
        let series = YahooClient::parse_chart(Ticker::Msft, json).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.rows[1].close, 3.0);
    }

    #[test]
    fn test_parse_chart_sorts_and_dedups_dates() {
        // Second and third bars fall on the same UTC day; last one wins
        let json = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"timestamp":[1704326400,1704240000,1704326460],"indicators":{"quote":[{"open":[2.0,1.0,2.5],"high":[2.0,1.0,2.5],"low":[2.0,1.0,2.5],"close":[2.0,1.0,2.5],"volume":[20,10,25]}]}}],"error":null}}"#;
        let series = YahooClient::parse_chart(Ticker::Hdb, json).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.rows.windows(2).all(|w| w[1].date > w[0].date));
        assert_eq!(series.rows[1].close, 2.5);
    }

    #[test]
    fn test_parse_chart_not_found() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found",
            "description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            YahooClient::parse_chart(Ticker::Sbkff, json),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_chart_empty_window() {
        let json =
            r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert_eq!(YahooClient::parse_chart(Ticker::Goog, json), Err(ApiError::NoData));
    }

    #[test]
    fn test_parse_chart_invalid_json() {
        assert!(matches!(
            YahooClient::parse_chart(Ticker::Goog, "not json"),
            Err(ApiError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_build_url_encodes_index_symbols() {
        let client = YahooClient::with_base_url("http://localhost/chart/".to_string()).unwrap();
        assert_eq!(client.build_url("^BSESN"), "http://localhost/chart/%5EBSESN");
        assert_eq!(client.build_url("AAPL"), "http://localhost/chart/AAPL");
    }

    #[test]
    fn test_unix_seconds_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        assert_eq!(YahooClient::unix_seconds(date), 1_262_304_000);
    }
}
