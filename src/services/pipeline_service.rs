use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::forecast_service;
use crate::forecast::ModelFitError;
use crate::models::{ForecastView, HorizonYears, Inputs, RawSeries, RawView, RenderModel};

/// One re-run on an already loaded series: slice the raw view, fit and
/// predict. `today` is the live calendar date for the future-only window.
/// CPU bound; callers on the async runtime run it under `spawn_blocking`.
pub fn render(inputs: &Inputs, series: Arc<RawSeries>, today: NaiveDate) -> RenderModel {
    info!(
        "Rendering {} ({} year(s), rows {:?})",
        inputs.ticker,
        inputs.horizon.years(),
        inputs.display_rows
    );

    let forecast = forecast_view(&series, inputs.horizon, today);
    if let Err(e) = &forecast {
        warn!("Forecast for {} failed: {}", inputs.ticker, e);
    }

    let raw = RawView {
        display_rows: inputs.display_rows.resolve(series.len()),
        series,
    };

    RenderModel { raw, forecast }
}

/// Forecast stage on its own; the series is only borrowed
pub fn forecast_view(
    series: &RawSeries,
    horizon: HorizonYears,
    today: NaiveDate,
) -> Result<ForecastView, ModelFitError> {
    let horizon_days = horizon.days();
    let (model, forecast) = forecast_service::fit_and_predict(series, horizon_days)?;

    let history_end = series.last_date().ok_or(ModelFitError::InsufficientData {
        required: 2,
        actual: 0,
    })?;
    let future = forecast_service::future_from(&model, today, horizon_days);
    let components = model.component_profiles(&forecast);
    let actual = series.rows.iter().map(|r| (r.date, r.close)).collect();

    Ok(ForecastView {
        ticker: series.ticker,
        horizon_days,
        history_end,
        forecast,
        actual,
        components,
        future,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DisplayRows, Ticker};
    use crate::api::QuoteProvider;
    use crate::services::data_service::tests::{stub_loader, weekday_series, StubProvider};
    use crate::services::data_service::{DataFetchError, DataLoader};
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    /// Load through the cache, then render, as the forecast command does
    async fn run<P: QuoteProvider>(
        inputs: &Inputs,
        loader: &DataLoader<P>,
        today: NaiveDate,
    ) -> Result<RenderModel, DataFetchError> {
        let series = loader.load(inputs.ticker).await?;
        Ok(render(inputs, series, today))
    }

    #[tokio::test]
    async fn test_aapl_one_year_scenario() {
        let loader = stub_loader(StubProvider::with_rows(400));
        let inputs = Inputs::new(Ticker::Aapl);

        let model = run(&inputs, &loader, today()).await.unwrap();
        let forecast = model.forecast.unwrap();

        assert_eq!(model.raw.total_rows(), 400);
        assert_eq!(model.raw.rows().len(), 400);
        assert_eq!(forecast.forecast.len(), 400 + 365);
        assert_eq!(forecast.predicted().len(), 365);
        assert_eq!(forecast.tail().len(), ForecastView::TAIL_ROWS);
        assert_eq!(
            forecast.future.title(),
            format!("{} .. {}", today(), today() + Duration::days(365))
        );
        assert_eq!(forecast.actual.len(), 400);
    }

    #[tokio::test]
    async fn test_display_rows_never_exceed_series() {
        let loader = stub_loader(StubProvider::with_rows(3));
        let inputs = Inputs {
            display_rows: DisplayRows::Last(DisplayRows::MIN),
            ..Inputs::new(Ticker::Sbkff)
        };

        let model = run(&inputs, &loader, today()).await.unwrap();
        assert_eq!(model.raw.rows().len(), 3);
    }

    #[tokio::test]
    async fn test_display_rows_takes_trailing_rows() {
        let loader = stub_loader(StubProvider::with_rows(120));
        let inputs = Inputs {
            display_rows: DisplayRows::Last(50),
            ..Inputs::new(Ticker::Msft)
        };

        let model = run(&inputs, &loader, today()).await.unwrap();
        let rows = model.raw.rows();
        assert_eq!(rows.len(), 50);
        assert_eq!(rows.last(), model.raw.series.rows.last());
    }

    #[tokio::test]
    async fn test_model_failure_keeps_raw_stage() {
        let loader = stub_loader(StubProvider::with_rows(1));
        let model = run(&Inputs::new(Ticker::Hdb), &loader, today()).await.unwrap();

        assert_eq!(model.raw.rows().len(), 1);
        assert!(matches!(model.forecast, Err(ModelFitError::InsufficientData { .. })));
    }

    #[tokio::test]
    async fn test_switching_ticker_reruns_everything() {
        let loader = stub_loader(StubProvider::with_rows(100));

        let aapl = run(&Inputs::new(Ticker::Aapl), &loader, today()).await.unwrap();
        let goog = run(&Inputs::new(Ticker::Goog), &loader, today()).await.unwrap();

        assert_eq!(aapl.raw.ticker(), Ticker::Aapl);
        assert_eq!(goog.raw.ticker(), Ticker::Goog);
        assert_eq!(goog.forecast.unwrap().ticker, Ticker::Goog);
        assert_eq!(loader.cache().len().await, 2);
    }

    #[tokio::test]
    async fn test_render_uses_the_given_series_off_the_runtime() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let series = Arc::new(weekday_series(Ticker::Goog, start, 200));
        let inputs = Inputs::new(Ticker::Goog);

        let shared = Arc::clone(&series);
        let model = tokio::task::spawn_blocking(move || render(&inputs, shared, today()))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&model.raw.series, &series));
        assert_eq!(model.forecast.unwrap().forecast.len(), 200 + 365);
    }
}
