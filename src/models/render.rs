//! Everything one pipeline run hands to the presentation layer

use std::sync::Arc;

use chrono::NaiveDate;

use super::forecast::{ComponentProfiles, ForecastRow, ForecastSequence, FutureWindow};
use super::inputs::Ticker;
use super::series::{RawSeries, TimeSeriesRow};
use crate::forecast::ModelFitError;

/// Trailing window of the raw series
#[derive(Debug, Clone)]
pub struct RawView {
    pub series: Arc<RawSeries>,
    pub display_rows: usize,
}

impl RawView {
    pub fn ticker(&self) -> Ticker {
        self.series.ticker
    }

    pub fn total_rows(&self) -> usize {
        self.series.len()
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        self.series.tail(self.display_rows)
    }
}

/// Forecast stage output
#[derive(Debug, Clone)]
pub struct ForecastView {
    pub ticker: Ticker,
    pub horizon_days: usize,
    pub history_end: NaiveDate,
    pub forecast: ForecastSequence,
    /// Observed closes the model was fit on
    pub actual: Vec<(NaiveDate, f64)>,
    pub components: ComponentProfiles,
    pub future: FutureWindow,
}

impl ForecastView {
    pub const TAIL_ROWS: usize = 5;

    pub fn tail(&self) -> &[ForecastRow] {
        self.forecast.tail(Self::TAIL_ROWS)
    }

    /// Predictions past the last observed date
    pub fn predicted(&self) -> &[ForecastRow] {
        self.forecast.after(self.history_end)
    }
}

/// Result of one full pipeline run. The raw stage is always present; the
/// forecast stage may have failed independently.
#[derive(Debug)]
pub struct RenderModel {
    pub raw: RawView,
    pub forecast: Result<ForecastView, ModelFitError>,
}
