use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::forecast::{AdditiveModel, ModelConfig, ModelFitError};
use crate::models::{ForecastSequence, FutureWindow, RawSeries, TrainingFrame};

/// Fit on the close column and predict history plus `horizon_days` calendar
/// days past the last observation. The model is returned for further
/// predictions; it is never cached.
pub fn fit_and_predict(
    series: &RawSeries,
    horizon_days: usize,
) -> Result<(AdditiveModel, ForecastSequence), ModelFitError> {
    let frame = TrainingFrame::from_series(series);
    let model = AdditiveModel::fit(&frame, ModelConfig::default())?;

    let dates = model.make_future_dates(horizon_days);
    let forecast = model.predict(&dates);

    info!(
        "Forecast for {}: {} history rows + {} days = {} rows (yearly: {}, weekly: {})",
        series.ticker,
        model.history_len(),
        horizon_days,
        forecast.len(),
        model.has_yearly(),
        model.has_weekly()
    );

    Ok((model, forecast))
}

/// `horizon_days` predictions starting at `today`, which may lie after the
/// last training date
pub fn future_from(model: &AdditiveModel, today: NaiveDate, horizon_days: usize) -> FutureWindow {
    let dates: Vec<NaiveDate> = (0..horizon_days as i64)
        .map(|i| today + Duration::days(i))
        .collect();

    FutureWindow {
        start: today,
        end: today + Duration::days(horizon_days as i64),
        rows: model.predict(&dates).rows,
    }
}
