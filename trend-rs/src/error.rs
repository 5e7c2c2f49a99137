//! Error taxonomy for trend estimation.
//!
//! Library functions return [`crate::Result`] (an `anyhow::Result`); the typed
//! failures below are raised inside it so callers can classify them with
//! `err.downcast_ref::<TrendError>()`.

use thiserror::Error;

/// Failures raised while estimating a trend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrendError {
    /// The input table has the wrong shape: a missing column, mismatched
    /// lengths, an index that cannot yield a month, or no rows at all.
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// The predictive model failed to load or to respond.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// A reduction had nothing to reduce (empty predictions, no monthly
    /// groups) or is undefined for the given input.
    #[error("Empty result: {0}")]
    EmptyResult(String),
}

impl TrendError {
    pub fn missing_column(name: &str) -> Self {
        TrendError::InputShape(format!("missing column '{}'", name))
    }
}

/// Classify an `anyhow::Error` produced by this crate.
pub fn classify(err: &anyhow::Error) -> Option<&TrendError> {
    err.downcast_ref::<TrendError>()
}
