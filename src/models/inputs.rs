//! Pipeline inputs: the selectable tickers and the two sliders

use std::fmt;

use thiserror::Error;

/// Rejected chat argument (the chat host has no bounded widgets)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Unknown ticker '{0}'. Available: {list}", list = Ticker::symbols().join(", "))]
    UnknownTicker(String),
    #[error(
        "Years of prediction must be between {min} and {max}, got '{0}'",
        min = HorizonYears::MIN,
        max = HorizonYears::MAX
    )]
    HorizonOutOfRange(String),
    #[error(
        "Rows to display must be a multiple of {step} and at least {min}, got '{0}'",
        step = DisplayRows::STEP,
        min = DisplayRows::MIN
    )]
    RowsOutOfRange(String),
}

/// Closed set of tickers offered for prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ticker {
    Aapl,
    Goog,
    Msft,
    Sbkff,
    Bsesn,
    Hdb,
}

impl Ticker {
    pub const ALL: [Ticker; 6] = [
        Ticker::Aapl,
        Ticker::Goog,
        Ticker::Msft,
        Ticker::Sbkff,
        Ticker::Bsesn,
        Ticker::Hdb,
    ];

    /// Symbol as understood by the quote provider
    pub fn symbol(&self) -> &'static str {
        match self {
            Ticker::Aapl => "AAPL",
            Ticker::Goog => "GOOG",
            Ticker::Msft => "MSFT",
            Ticker::Sbkff => "SBKFF",
            Ticker::Bsesn => "^BSESN",
            Ticker::Hdb => "HDB",
        }
    }

    pub fn symbols() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.symbol()).collect()
    }

    /// Case-insensitive; the index symbol may be given without its caret
    pub fn parse(input: &str) -> Result<Ticker, InputError> {
        let wanted = input.trim().trim_start_matches('^').to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.symbol().trim_start_matches('^') == wanted)
            .ok_or_else(|| InputError::UnknownTicker(input.to_string()))
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Forecast horizon in years, 1 through 5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonYears(u32);

impl HorizonYears {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 5;
    pub const DAYS_PER_YEAR: usize = 365;

    pub fn new(years: u32) -> Result<Self, InputError> {
        if (Self::MIN..=Self::MAX).contains(&years) {
            Ok(Self(years))
        } else {
            Err(InputError::HorizonOutOfRange(years.to_string()))
        }
    }

    pub fn parse(input: &str) -> Result<Self, InputError> {
        let years = input
            .trim()
            .parse::<u32>()
            .map_err(|_| InputError::HorizonOutOfRange(input.to_string()))?;
        Self::new(years)
    }

    pub fn years(&self) -> u32 {
        self.0
    }

    pub fn days(&self) -> usize {
        self.0 as usize * Self::DAYS_PER_YEAR
    }
}

impl Default for HorizonYears {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

/// How many trailing raw rows to show. `All` is the slider's default position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRows {
    #[default]
    All,
    Last(usize),
}

impl DisplayRows {
    pub const MIN: usize = 10;
    pub const STEP: usize = 10;

    pub fn parse(input: &str) -> Result<Self, InputError> {
        if input.eq_ignore_ascii_case("all") {
            return Ok(DisplayRows::All);
        }
        let rows = input
            .trim()
            .parse::<usize>()
            .map_err(|_| InputError::RowsOutOfRange(input.to_string()))?;
        if rows < Self::MIN || rows % Self::STEP != 0 {
            return Err(InputError::RowsOutOfRange(input.to_string()));
        }
        Ok(DisplayRows::Last(rows))
    }

    /// Row count for a series of `total` rows, never more than `total`
    pub fn resolve(&self, total: usize) -> usize {
        match self {
            DisplayRows::All => total,
            DisplayRows::Last(rows) => (*rows).min(total),
        }
    }
}

/// Everything one pipeline run depends on besides the clock and the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inputs {
    pub ticker: Ticker,
    pub horizon: HorizonYears,
    pub display_rows: DisplayRows,
}

impl Inputs {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            horizon: HorizonYears::default(),
            display_rows: DisplayRows::default(),
        }
    }

    /// `<TICKER> [years] [rows]` as typed after the command name
    pub fn from_args(args: &[&str]) -> Result<Self, InputError> {
        let ticker = Ticker::parse(args.first().copied().unwrap_or_default())?;
        let horizon = match args.get(1) {
            Some(arg) => HorizonYears::parse(arg)?,
            None => HorizonYears::default(),
        };
        let display_rows = match args.get(2) {
            Some(arg) => DisplayRows::parse(arg)?,
            None => DisplayRows::default(),
        };
        Ok(Self {
            ticker,
            horizon,
            display_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_parse_is_closed() {
        assert_eq!(Ticker::parse("aapl"), Ok(Ticker::Aapl));
        assert_eq!(Ticker::parse("^BSESN"), Ok(Ticker::Bsesn));
        assert_eq!(Ticker::parse("bsesn"), Ok(Ticker::Bsesn));
        assert!(matches!(Ticker::parse("TSLA"), Err(InputError::UnknownTicker(_))));
        assert_eq!(Ticker::symbols().len(), 6);
    }

    #[test]
    fn test_horizon_bounds() {
        assert_eq!(HorizonYears::parse("1").unwrap().days(), 365);
        assert_eq!(HorizonYears::parse("5").unwrap().days(), 1825);
        assert!(HorizonYears::parse("0").is_err());
        assert!(HorizonYears::parse("6").is_err());
        assert!(HorizonYears::parse("two").is_err());
        assert_eq!(HorizonYears::default().years(), 1);
    }

    #[test]
    fn test_display_rows_domain() {
        assert_eq!(DisplayRows::parse("10"), Ok(DisplayRows::Last(10)));
        assert_eq!(DisplayRows::parse("all"), Ok(DisplayRows::All));
        assert!(DisplayRows::parse("5").is_err());
        assert!(DisplayRows::parse("25").is_err());

        assert_eq!(DisplayRows::Last(10).resolve(3), 3);
        assert_eq!(DisplayRows::Last(20).resolve(100), 20);
        assert_eq!(DisplayRows::All.resolve(42), 42);
    }

    #[test]
    fn test_unknown_ticker_message_lists_choices() {
        let msg = InputError::UnknownTicker("X".to_string()).to_string();
        assert!(msg.contains("AAPL"));
        assert!(msg.contains("^BSESN"));
    }

    #[test]
    fn test_inputs_from_args() {
        let inputs = Inputs::from_args(&["goog", "3", "50"]).unwrap();
        assert_eq!(inputs.ticker, Ticker::Goog);
        assert_eq!(inputs.horizon.years(), 3);
        assert_eq!(inputs.display_rows, DisplayRows::Last(50));

        assert_eq!(Inputs::from_args(&["MSFT"]).unwrap(), Inputs::new(Ticker::Msft));
        assert!(matches!(Inputs::from_args(&[]), Err(InputError::UnknownTicker(_))));
        assert!(matches!(
            Inputs::from_args(&["AAPL", "9"]),
            Err(InputError::HorizonOutOfRange(_))
        ));
    }
}
