use std::f64::consts::PI;
use std::ops::Range;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use super::linalg::{z_score, NormalEquations};
use super::ModelFitError;
use crate::models::{ComponentProfiles, ForecastRow, ForecastSequence, TrainingFrame};

const YEAR_PERIOD_DAYS: f64 = 365.25;
const WEEK_PERIOD_DAYS: f64 = 7.0;
/// num_days_from_ce() of 1970-01-01
const CE_TO_UNIX_EPOCH_DAYS: i32 = 719_163;
/// 2017-01-01, a Sunday, in days since the unix epoch
const REFERENCE_SUNDAY: f64 = 17_167.0;
const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

const MIN_ROWS: usize = 2;
/// Prior scale for the base offset and growth rate
const TREND_PRIOR_SCALE: f64 = 5.0;
const INITIAL_NOISE_VARIANCE: f64 = 1e-2;
const MIN_NOISE_VARIANCE: f64 = 1e-6;

/// Model hyper-parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub n_changepoints: usize,
    /// Share of the history eligible for changepoints
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub yearly_order: usize,
    pub weekly_order: usize,
    pub interval_width: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_order: 10,
            weekly_order: 3,
            interval_width: 0.8,
        }
    }
}

/// A fitted additive model. Coefficients live in scaled space: time runs from
/// 0 at the first training date to 1 at the last, values are divided by the
/// largest absolute training value.
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    config: ModelConfig,
    start: NaiveDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    yearly_order: usize,
    weekly_order: usize,
    beta: Vec<f64>,
    sigma_obs: f64,
    history: Vec<NaiveDate>,
}

impl AdditiveModel {
    pub fn fit(frame: &TrainingFrame, config: ModelConfig) -> Result<Self, ModelFitError> {
        validate(frame)?;

        let points = &frame.points;
        let n = points.len();
        let start = points[0].ds;
        let span_days = (points[n - 1].ds - start).num_days() as f64;

        let y_scale = match points.iter().map(|p| p.y.abs()).fold(0.0, f64::max) {
            max if max > 0.0 => max,
            _ => 1.0,
        };

        let t: Vec<f64> = points
            .iter()
            .map(|p| (p.ds - start).num_days() as f64 / span_days)
            .collect();
        let changepoints = place_changepoints(&t, &config);

        let yearly_order = if span_days >= 2.0 * 365.0 { config.yearly_order } else { 0 };
        let weekly_order = if span_days >= 2.0 * WEEK_PERIOD_DAYS {
            config.weekly_order
        } else {
            0
        };

        let mut model = Self {
            config,
            start,
            span_days,
            y_scale,
            changepoints,
            yearly_order,
            weekly_order,
            beta: Vec::new(),
            sigma_obs: 0.0,
            history: points.iter().map(|p| p.ds).collect(),
        };

        let width = model.n_features();
        let mut equations = NormalEquations::new(width);
        let mut row = Vec::with_capacity(width);
        for point in points {
            model.features_into(point.ds, &mut row);
            equations.add_observation(&row, point.y / y_scale);
        }

        // First pass with a nominal noise level, second with the estimated one
        let mut sigma2 = INITIAL_NOISE_VARIANCE;
        for _ in 0..2 {
            let penalty = model.penalty(sigma2);
            model.beta = equations.solve_ridge(&penalty).ok_or(ModelFitError::Singular)?;

            let rss: f64 = points
                .iter()
                .map(|point| {
                    model.features_into(point.ds, &mut row);
                    let residual = point.y / y_scale - dot(&model.beta, &row);
                    residual * residual
                })
                .sum();
            sigma2 = (rss / n as f64).max(MIN_NOISE_VARIANCE);
        }
        model.sigma_obs = sigma2.sqrt();

        debug!(
            "Fitted additive model on {} rows: {} changepoints, \
             yearly order {}, weekly order {}, sigma {:.6}",
            n,
            model.changepoints.len(),
            model.yearly_order,
            model.weekly_order,
            model.sigma_obs
        );

        Ok(model)
    }

    /// Training dates followed by `horizon_days` consecutive calendar days
    pub fn make_future_dates(&self, horizon_days: usize) -> Vec<NaiveDate> {
        let mut dates = self.history.clone();
        if let Some(&last) = self.history.last() {
            dates.extend((1..=horizon_days as i64).map(|i| last + Duration::days(i)));
        }
        dates
    }

    pub fn predict(&self, dates: &[NaiveDate]) -> ForecastSequence {
        let z = z_score(self.config.interval_width);
        let mut row = Vec::with_capacity(self.n_features());

        let rows = dates
            .iter()
            .map(|&ds| {
                self.features_into(ds, &mut row);
                let trend = partial_dot(&self.beta, &row, self.trend_columns());
                let yearly = partial_dot(&self.beta, &row, self.yearly_columns());
                let weekly = partial_dot(&self.beta, &row, self.weekly_columns());
                let yhat = trend + yearly + weekly;

                let t = self.scaled_time(ds);
                let sigma = (self.sigma_obs.powi(2) + self.trend_sigma(t).powi(2)).sqrt();

                ForecastRow {
                    ds,
                    yhat: yhat * self.y_scale,
                    yhat_lower: (yhat - z * sigma) * self.y_scale,
                    yhat_upper: (yhat + z * sigma) * self.y_scale,
                    trend: trend * self.y_scale,
                    yearly: yearly * self.y_scale,
                    weekly: weekly * self.y_scale,
                }
            })
            .collect();

        ForecastSequence { rows }
    }

    pub fn component_profiles(&self, forecast: &ForecastSequence) -> ComponentProfiles {
        let trend = forecast.rows.iter().map(|r| (r.ds, r.trend)).collect();

        let weekly = (self.weekly_order > 0).then(|| {
            WEEKDAY_NAMES
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let effect = self.seasonal_effect(
                        REFERENCE_SUNDAY + i as f64,
                        WEEK_PERIOD_DAYS,
                        self.weekly_order,
                        self.weekly_columns(),
                    );
                    (name.to_string(), effect)
                })
                .collect()
        });

        let yearly = (self.yearly_order > 0).then(|| {
            (1..=365u32)
                .map(|day| {
                    let effect = self.seasonal_effect(
                        REFERENCE_SUNDAY + (day - 1) as f64,
                        YEAR_PERIOD_DAYS,
                        self.yearly_order,
                        self.yearly_columns(),
                    );
                    (day, effect)
                })
                .collect()
        });

        ComponentProfiles {
            trend,
            weekly,
            yearly,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn has_yearly(&self) -> bool {
        self.yearly_order > 0
    }

    pub fn has_weekly(&self) -> bool {
        self.weekly_order > 0
    }

    fn n_features(&self) -> usize {
        2 + self.changepoints.len() + 2 * self.yearly_order + 2 * self.weekly_order
    }

    fn trend_columns(&self) -> Range<usize> {
        0..2 + self.changepoints.len()
    }

    fn yearly_columns(&self) -> Range<usize> {
        let start = self.trend_columns().end;
        start..start + 2 * self.yearly_order
    }

    fn weekly_columns(&self) -> Range<usize> {
        let start = self.yearly_columns().end;
        start..start + 2 * self.weekly_order
    }

    fn scaled_time(&self, ds: NaiveDate) -> f64 {
        (ds - self.start).num_days() as f64 / self.span_days
    }

    fn features_into(&self, ds: NaiveDate, out: &mut Vec<f64>) {
        let t = self.scaled_time(ds);
        out.clear();
        out.push(1.0);
        out.push(t);
        out.extend(self.changepoints.iter().map(|&s| (t - s).max(0.0)));

        let x = days_since_epoch(ds);
        fourier_into(x, YEAR_PERIOD_DAYS, self.yearly_order, out);
        fourier_into(x, WEEK_PERIOD_DAYS, self.weekly_order, out);
    }

    fn penalty(&self, sigma2: f64) -> Vec<f64> {
        let trend = sigma2 / TREND_PRIOR_SCALE.powi(2);
        let delta = sigma2 / self.config.changepoint_prior_scale.powi(2);
        let seasonal = sigma2 / self.config.seasonality_prior_scale.powi(2);

        let mut penalty = vec![trend, trend];
        penalty.extend(std::iter::repeat(delta).take(self.changepoints.len()));
        penalty.extend(
            std::iter::repeat(seasonal).take(2 * self.yearly_order + 2 * self.weekly_order),
        );
        penalty
    }

    /// Spread of the trend past the end of history, assuming future rate
    /// changes arrive as often and as large as the fitted ones
    fn trend_sigma(&self, t: f64) -> f64 {
        if t <= 1.0 || self.changepoints.is_empty() {
            return 0.0;
        }
        let deltas = &self.beta[2..2 + self.changepoints.len()];
        let mean_abs_delta = deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64;
        let rate = self.changepoints.len() as f64;
        let h = t - 1.0;
        mean_abs_delta * (2.0 * rate * h.powi(3) / 3.0).sqrt()
    }

    fn seasonal_effect(&self, x: f64, period: f64, order: usize, columns: Range<usize>) -> f64 {
        let mut terms = Vec::with_capacity(2 * order);
        fourier_into(x, period, order, &mut terms);
        terms
            .iter()
            .zip(&self.beta[columns])
            .map(|(f, b)| f * b)
            .sum::<f64>()
            * self.y_scale
    }
}

fn validate(frame: &TrainingFrame) -> Result<(), ModelFitError> {
    let points = &frame.points;
    if points.len() < MIN_ROWS {
        return Err(ModelFitError::InsufficientData {
            required: MIN_ROWS,
            actual: points.len(),
        });
    }
    if let Some(bad) = points.iter().find(|p| !p.y.is_finite()) {
        return Err(ModelFitError::NonFinite(bad.ds));
    }
    for pair in points.windows(2) {
        if pair[1].ds == pair[0].ds {
            return Err(ModelFitError::DuplicateDate(pair[1].ds));
        }
        if pair[1].ds < pair[0].ds {
            return Err(ModelFitError::UnsortedDates(pair[1].ds));
        }
    }
    Ok(())
}

/// Changepoints at evenly spaced observations within the first
/// `changepoint_range` of the history
fn place_changepoints(t: &[f64], config: &ModelConfig) -> Vec<f64> {
    let hist_size = (t.len() as f64 * config.changepoint_range).floor() as usize;
    let count = config.n_changepoints.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let step = (hist_size - 1) as f64 / count as f64;
    let mut points: Vec<f64> = (1..=count)
        .map(|i| t[(i as f64 * step).round() as usize])
        .collect();
    points.dedup();
    points
}

fn days_since_epoch(ds: NaiveDate) -> f64 {
    (ds.num_days_from_ce() - CE_TO_UNIX_EPOCH_DAYS) as f64
}

fn fourier_into(x: f64, period: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * x / period;
        out.push(angle.sin());
        out.push(angle.cos());
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn partial_dot(beta: &[f64], row: &[f64], columns: Range<usize>) -> f64 {
    dot(&beta[columns.clone()], &row[columns])
}
