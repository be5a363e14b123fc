use std::fs;
use std::ops::Range;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{ForecastRow, ForecastView, RawView};

/// Chart rendering failures
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Not enough data to draw a chart ({0} point(s), need at least 2)")]
    NotEnoughData(usize),
    #[error("Failed to draw chart: {0}")]
    Draw(String),
    #[error("Failed to read chart file: {0}")]
    Io(#[from] std::io::Error),
}

fn draw_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Draw(e.to_string())
}

fn to_datetime(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Value range with 10% padding on both sides
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = (max - min).max(1e-8); // Avoid a zero-height axis
    let padding = span * 0.1;
    (min - padding)..(max + padding)
}

/// Half the configured height per panel
fn stacked_height(height: u32, panels: usize) -> u32 {
    height.saturating_mul(panels as u32) / 2
}

/// Run a renderer on the blocking pool so the gateway tasks keep running
pub async fn render_blocking<F>(render: F) -> Result<Vec<u8>, ChartError>
where
    F: FnOnce() -> Result<Vec<u8>, ChartError> + Send + 'static,
{
    tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| ChartError::Draw(format!("Render task failed: {}", e)))?
}

/// Draw onto a temporary bitmap and return the PNG bytes
fn render_png<F>(kind: &str, width: u32, height: u32, draw: F) -> Result<Vec<u8>, ChartError>
where
    F: FnOnce(&DrawingArea<BitMapBackend, Shift>) -> Result<(), ChartError>,
{
    let temp_file = std::env::temp_dir()
        .join(format!("stock_forecast_{}_{}.png", kind, Uuid::new_v4()));

    let drawn = {
        let root = BitMapBackend::new(&temp_file, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        draw(&root).and_then(|_| root.present().map_err(draw_err))
    };

    let image_data = drawn.and_then(|_| fs::read(&temp_file).map_err(ChartError::from));
    let _ = fs::remove_file(&temp_file);

    let image_data = image_data?;
    debug!("Rendered {} chart: {} bytes", kind, image_data.len());
    Ok(image_data)
}

/// Open and close over the displayed window
pub fn render_raw_chart(view: &RawView, width: u32, height: u32) -> Result<Vec<u8>, ChartError> {
    let rows = view.rows();
    if rows.len() < 2 {
        return Err(ChartError::NotEnoughData(rows.len()));
    }

    render_png("raw", width, height, |root| {
        let x_range = to_datetime(rows[0].date)..to_datetime(rows[rows.len() - 1].date);
        let y_range = padded_range(rows.iter().flat_map(|r| [r.open, r.close]));

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("{} Time Series Data", view.ticker()),
                ("sans-serif", 30.0).into_font(),
            )
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Price")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(LineSeries::new(
                rows.iter().map(|r| (to_datetime(r.date), r.open)),
                &BLUE,
            ))
            .map_err(draw_err)?
            .label("stock_open")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart
            .draw_series(LineSeries::new(
                rows.iter().map(|r| (to_datetime(r.date), r.close)),
                &RED,
            ))
            .map_err(draw_err)?
            .label("stock_close")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;

        Ok(())
    })
}

fn band(rows: &[ForecastRow]) -> Vec<(DateTime<Utc>, f64)> {
    rows.iter()
        .map(|r| (to_datetime(r.ds), r.yhat_upper))
        .chain(rows.iter().rev().map(|r| (to_datetime(r.ds), r.yhat_lower)))
        .collect()
}

/// Fitted line with interval band, actual closes and the predicted tail
pub fn render_forecast_chart(
    view: &ForecastView,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ChartError> {
    let rows = &view.forecast.rows;
    if rows.len() < 2 {
        return Err(ChartError::NotEnoughData(rows.len()));
    }
    let history = &rows[..rows.len() - view.predicted().len()];
    let predicted = view.predicted();

    render_png("forecast", width, height, |root| {
        let x_range = to_datetime(rows[0].ds)..to_datetime(rows[rows.len() - 1].ds);
        let y_range = padded_range(
            rows.iter()
                .flat_map(|r| [r.yhat_lower, r.yhat_upper])
                .chain(view.actual.iter().map(|(_, y)| *y)),
        );

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("{} Forecast Data", view.ticker),
                ("sans-serif", 30.0).into_font(),
            )
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Close")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(std::iter::once(Polygon::new(band(rows), BLUE.mix(0.15).filled())))
            .map_err(draw_err)?
            .label("interval")
            .legend(|(x, y)| {
                Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.15).filled())
            });

        chart
            .draw_series(
                view.actual
                    .iter()
                    .map(|(d, y)| Circle::new((to_datetime(*d), *y), 2, BLACK.filled())),
            )
            .map_err(draw_err)?
            .label("actual")
            .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));

        chart
            .draw_series(LineSeries::new(
                history.iter().map(|r| (to_datetime(r.ds), r.yhat)),
                &BLUE,
            ))
            .map_err(draw_err)?
            .label("fitted")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart
            .draw_series(LineSeries::new(
                predicted.iter().map(|r| (to_datetime(r.ds), r.yhat)),
                &RED,
            ))
            .map_err(draw_err)?
            .label("predicted")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;

        Ok(())
    })
}

/// Trend, weekly and yearly panels stacked vertically
pub fn render_components_chart(
    view: &ForecastView,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ChartError> {
    let components = &view.components;
    if components.trend.len() < 2 {
        return Err(ChartError::NotEnoughData(components.trend.len()));
    }
    let panels =
        1 + components.weekly.is_some() as usize + components.yearly.is_some() as usize;

    render_png("components", width, stacked_height(height, panels), |root| {
        let areas = root.split_evenly((panels, 1));
        let mut areas = areas.iter();

        if let Some(area) = areas.next() {
            let trend = &components.trend;
            let mut chart = ChartBuilder::on(area)
                .caption("trend", ("sans-serif", 22.0).into_font())
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(60)
                .build_cartesian_2d(
                    to_datetime(trend[0].0)..to_datetime(trend[trend.len() - 1].0),
                    padded_range(trend.iter().map(|(_, v)| *v)),
                )
                .map_err(draw_err)?;
            chart.configure_mesh().draw().map_err(draw_err)?;
            chart
                .draw_series(LineSeries::new(
                    trend.iter().map(|(d, v)| (to_datetime(*d), *v)),
                    &BLUE,
                ))
                .map_err(draw_err)?;
        }

        if let (Some(weekly), Some(area)) = (&components.weekly, areas.next()) {
            let mut chart = ChartBuilder::on(area)
                .caption("weekly", ("sans-serif", 22.0).into_font())
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(60)
                .build_cartesian_2d(0i32..6i32, padded_range(weekly.iter().map(|(_, v)| *v)))
                .map_err(draw_err)?;
            chart
                .configure_mesh()
                .x_labels(7)
                .x_label_formatter(&|day| {
                    weekly
                        .get(*day as usize)
                        .map(|(name, _)| name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(draw_err)?;
            chart
                .draw_series(LineSeries::new(
                    weekly.iter().enumerate().map(|(i, (_, v))| (i as i32, *v)),
                    &BLUE,
                ))
                .map_err(draw_err)?;
        }

        if let (Some(yearly), Some(area)) = (&components.yearly, areas.next()) {
            let mut chart = ChartBuilder::on(area)
                .caption("yearly", ("sans-serif", 22.0).into_font())
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(60)
                .build_cartesian_2d(1i32..365i32, padded_range(yearly.iter().map(|(_, v)| *v)))
                .map_err(draw_err)?;
            chart
                .configure_mesh()
                .x_labels(12)
                .x_label_formatter(&|day| {
                    NaiveDate::from_yo_opt(2017, *day as u32)
                        .map(|d| d.format("%B %-d").to_string())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(draw_err)?;
            chart
                .draw_series(LineSeries::new(
                    yearly.iter().map(|(day, v)| (*day as i32, *v)),
                    &BLUE,
                ))
                .map_err(draw_err)?;
        }

        Ok(())
    })
}

/// Prediction from the live date onward, titled with its literal range
pub fn render_future_chart(
    view: &ForecastView,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ChartError> {
    let future = &view.future;
    let rows = &future.rows;
    if rows.len() < 2 {
        return Err(ChartError::NotEnoughData(rows.len()));
    }

    render_png("future", width, height, |root| {
        let x_range = to_datetime(future.start)..to_datetime(future.end);
        let y_range = padded_range(rows.iter().flat_map(|r| [r.yhat_lower, r.yhat_upper]));

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("{} {}", view.ticker, future.title()),
                ("sans-serif", 30.0).into_font(),
            )
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc("Predicted close")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(std::iter::once(Polygon::new(band(rows), RED.mix(0.15).filled())))
            .map_err(draw_err)?;

        chart
            .draw_series(LineSeries::new(rows.iter().map(|r| (to_datetime(r.ds), r.yhat)), &RED))
            .map_err(draw_err)?
            .label("predicted")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawSeries, Ticker, TimeSeriesRow};
    use std::sync::Arc;

    #[test]
    fn test_padded_range() {
        let range = padded_range([10.0, 20.0].into_iter());
        assert!((range.start - 9.0).abs() < 1e-9);
        assert!((range.end - 21.0).abs() < 1e-9);

        // Flat series still gets a non-empty axis
        let flat = padded_range([5.0, 5.0].into_iter());
        assert!(flat.end > flat.start);

        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
    }

    #[test]
    fn test_stacked_height_saturates() {
        assert_eq!(stacked_height(768, 3), 1152);
        assert_eq!(stacked_height(768, 1), 384);
        assert_eq!(stacked_height(u32::MAX, 3), u32::MAX / 2);
    }

    #[tokio::test]
    async fn test_render_blocking_passes_result_through() {
        let ok = render_blocking(|| Ok(vec![1, 2, 3])).await.unwrap();
        assert_eq!(ok, vec![1, 2, 3]);

        let err = render_blocking(|| Err(ChartError::NotEnoughData(1))).await;
        assert!(matches!(err, Err(ChartError::NotEnoughData(1))));
    }

    #[test]
    fn test_raw_chart_needs_two_points() {
        let row = TimeSeriesRow {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1,
        };
        let view = RawView {
            series: Arc::new(RawSeries::new(Ticker::Sbkff, vec![row])),
            display_rows: 10,
        };
        assert!(matches!(
            render_raw_chart(&view, 640, 480),
            Err(ChartError::NotEnoughData(1))
        ));
    }

    #[test]
    fn test_band_wraps_around() {
        let row = |day: u32, lo: f64, hi: f64| ForecastRow {
            ds: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            yhat: (lo + hi) / 2.0,
            yhat_lower: lo,
            yhat_upper: hi,
            trend: 0.0,
            yearly: 0.0,
            weekly: 0.0,
        };
        let rows = vec![row(1, 1.0, 3.0), row(2, 2.0, 4.0)];
        let polygon = band(&rows);

        assert_eq!(polygon.len(), 4);
        assert_eq!(polygon[0].1, 3.0);
        assert_eq!(polygon[1].1, 4.0);
        assert_eq!(polygon[2].1, 2.0);
        assert_eq!(polygon[3].1, 1.0);
    }
}
