//! Daily price series models

use chrono::NaiveDate;

use super::inputs::Ticker;

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Full daily history for one ticker, ascending by date with unique dates
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub ticker: Ticker,
    pub rows: Vec<TimeSeriesRow>,
}

impl RawSeries {
    pub fn new(ticker: Ticker, rows: Vec<TimeSeriesRow>) -> Self {
        Self { ticker, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    /// The trailing `count` rows, or the whole series when it is shorter
    pub fn tail(&self, count: usize) -> &[TimeSeriesRow] {
        let start = self.rows.len().saturating_sub(count);
        &self.rows[start..]
    }
}

/// A single (date, value) training observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingPoint {
    pub ds: NaiveDate,
    pub y: f64,
}

/// Model input: the series projected onto (date, close)
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFrame {
    pub points: Vec<TrainingPoint>,
}

impl TrainingFrame {
    pub fn from_series(series: &RawSeries) -> Self {
        let points = series
            .rows
            .iter()
            .map(|row| TrainingPoint {
                ds: row.date,
                y: row.close,
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, close: f64) -> TimeSeriesRow {
        TimeSeriesRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn test_tail_returns_at_most_len_rows() {
        let series = RawSeries::new(Ticker::Aapl, vec![row(2, 10.0), row(3, 11.0), row(4, 12.0)]);

        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(2)[0].close, 11.0);
        // Slider minimum on a thin series
        assert_eq!(series.tail(10).len(), 3);
        assert!(series.tail(0).is_empty());
    }

    #[test]
    fn test_training_frame_projects_close() {
        let series = RawSeries::new(Ticker::Goog, vec![row(2, 10.0), row(3, 11.5)]);
        let frame = TrainingFrame::from_series(&series);

        assert_eq!(frame.len(), series.len());
        assert_eq!(frame.points[1].ds, series.rows[1].date);
        assert_eq!(frame.points[1].y, 11.5);
    }
}
