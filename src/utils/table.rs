use crate::models::{ForecastRow, TimeSeriesRow};

/// A simple text-based table for Discord messages using code blocks
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl Table {
    /// Create a new table with the given headers
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths = headers.iter().map(|h| h.len()).collect();
        let headers = headers.iter().map(|h| h.to_string()).collect();
        Table {
            headers,
            rows: Vec::new(),
            col_widths,
        }
    }

    /// Add a row; cells past the header count are dropped
    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, col) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(col.len());
            }
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header line, separator line, then one line per row, without fences
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.render_row(&self.headers));
        lines.push(self.render_separator());
        lines.extend(self.rows.iter().map(|row| self.render_row(row)));
        lines
    }

    /// Render the whole table as a code block
    pub fn render(&self) -> String {
        format!("```\n{}\n```", self.lines().join("\n"))
    }

    /// Numbers are right-aligned, everything else left-aligned
    fn render_row(&self, row: &[String]) -> String {
        let cells: Vec<String> = row
            .iter()
            .zip(&self.col_widths)
            .map(|(col, &width)| {
                if col.parse::<f64>().is_ok() {
                    format!("{:>width$}", col, width = width)
                } else {
                    format!("{:<width$}", col, width = width)
                }
            })
            .collect();
        cells.join(" | ")
    }

    fn render_separator(&self) -> String {
        self.col_widths
            .iter()
            .map(|&width| "-".repeat(width))
            .collect::<Vec<_>>()
            .join("-+-")
    }
}

/// Date, OHLC and volume of raw bars
pub fn raw_table(rows: &[TimeSeriesRow]) -> Table {
    let mut table = Table::new(vec!["Date", "Open", "High", "Low", "Close", "Volume"]);
    for row in rows {
        table.add_row(vec![
            row.date.to_string(),
            format!("{:.2}", row.open),
            format!("{:.2}", row.high),
            format!("{:.2}", row.low),
            format!("{:.2}", row.close),
            row.volume.to_string(),
        ]);
    }
    table
}

/// Forecast rows restricted to the point estimate and its interval
pub fn forecast_table(rows: &[ForecastRow]) -> Table {
    let mut table = Table::new(vec!["Date", "yhat", "yhat_lower", "yhat_upper"]);
    for row in rows {
        table.add_row(vec![
            row.ds.to_string(),
            format!("{:.2}", row.yhat),
            format!("{:.2}", row.yhat_lower),
            format!("{:.2}", row.yhat_upper),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_basic_table() {
        let mut table = Table::new(vec!["Date", "Close"]);
        table.add_row(vec!["2024-01-02".to_string(), "185.64".to_string()]);
        table.add_row(vec!["2024-01-03".to_string(), "9.10".to_string()]);

        let rendered = table.render();
        assert!(rendered.starts_with("```\n"));
        assert!(rendered.ends_with("\n```"));
        assert!(rendered.contains("Date       | Close"));
        assert!(rendered.contains("2024-01-03 |   9.10"));
        assert_eq!(table.lines().len(), 4);
    }

    #[test]
    fn test_raw_table_columns() {
        let rows = vec![TimeSeriesRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 187.15,
            high: 188.44,
            low: 183.89,
            close: 185.64,
            volume: 82_488_700,
        }];
        let table = raw_table(&rows);

        assert_eq!(table.len(), 1);
        let lines = table.lines();
        assert!(lines[0].starts_with("Date"));
        assert!(lines[2].contains("185.64"));
        assert!(lines[2].ends_with("82488700"));
    }

    #[test]
    fn test_forecast_table_columns() {
        let rows = vec![ForecastRow {
            ds: NaiveDate::from_ymd_opt(2027, 10, 18).unwrap(),
            yhat: 201.5,
            yhat_lower: 190.25,
            yhat_upper: 212.75,
            trend: 199.0,
            yearly: 1.5,
            weekly: 1.0,
        }];
        let lines = forecast_table(&rows).lines();

        assert_eq!(lines[0], "Date       | yhat   | yhat_lower | yhat_upper");
        assert!(!lines[0].contains("trend"));
        assert_eq!(lines[2], "2027-10-18 | 201.50 |     190.25 |     212.75");
    }
}
