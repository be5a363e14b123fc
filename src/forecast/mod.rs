//! Additive time-series model: piecewise-linear trend plus Fourier seasonality.
//!
//! `AdditiveModel::fit` takes a `TrainingFrame` of (date, value) pairs and
//! `predict` evaluates the fitted model on any set of calendar dates.

pub mod linalg;
pub mod model;

use chrono::NaiveDate;
use thiserror::Error;

pub use model::{AdditiveModel, ModelConfig};

/// Why a model could not be fit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelFitError {
    #[error("Dataframe has less than {required} non-null rows ({actual} given)")]
    InsufficientData { required: usize, actual: usize },
    #[error("Non-finite value on {0}")]
    NonFinite(NaiveDate),
    #[error("Duplicate date {0} in training data")]
    DuplicateDate(NaiveDate),
    #[error("Training dates are not sorted (at {0})")]
    UnsortedDates(NaiveDate),
    #[error("Model is singular and cannot be estimated")]
    Singular,
}
