//! Data models for the forecast pipeline
//!
//! Inputs, price series, forecasts and the render model each command draws from.

pub mod inputs;
pub mod series;
pub mod forecast;
pub mod render;

// Re-export commonly used types for convenience
pub use inputs::{DisplayRows, HorizonYears, InputError, Inputs, Ticker};
pub use series::{RawSeries, TimeSeriesRow, TrainingFrame, TrainingPoint};
pub use forecast::{ComponentProfiles, ForecastRow, ForecastSequence, FutureWindow};
pub use render::{ForecastView, RawView, RenderModel};
