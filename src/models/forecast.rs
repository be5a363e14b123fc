//! Forecast output models

use chrono::NaiveDate;

/// One predicted date, with its additive decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub yearly: f64,
    pub weekly: f64,
}

/// Ascending forecast covering the history plus the future horizon
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastSequence {
    pub rows: Vec<ForecastRow>,
}

impl ForecastSequence {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn tail(&self, count: usize) -> &[ForecastRow] {
        let start = self.rows.len().saturating_sub(count);
        &self.rows[start..]
    }

    /// Rows strictly after `date`
    pub fn after(&self, date: NaiveDate) -> &[ForecastRow] {
        let start = self.rows.partition_point(|r| r.ds <= date);
        &self.rows[start..]
    }
}

/// Seasonal shapes for the components chart
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComponentProfiles {
    /// (date, trend) over the whole forecast range
    pub trend: Vec<(NaiveDate, f64)>,
    /// Sunday through Saturday, absent when weekly seasonality is off
    pub weekly: Option<Vec<(String, f64)>>,
    /// (day of year, effect), absent when yearly seasonality is off
    pub yearly: Option<Vec<(u32, f64)>>,
}

/// Future-only prediction starting at the live calendar date
#[derive(Debug, Clone, PartialEq)]
pub struct FutureWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: Vec<ForecastRow>,
}

impl FutureWindow {
    pub fn title(&self) -> String {
        format!("{} .. {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}
