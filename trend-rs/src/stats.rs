//! Summary statistics used by the estimator.
//!
//! Both reductions refuse empty input instead of returning NaN.

use crate::error::TrendError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Denominator convention for the standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdConvention {
    /// Divide by `n`.
    #[default]
    Population,
    /// Divide by `n - 1` (Bessel's correction).
    Sample,
}

impl StdConvention {
    /// Degrees of freedom subtracted from `n`.
    pub fn ddof(&self) -> usize {
        match self {
            StdConvention::Population => 0,
            StdConvention::Sample => 1,
        }
    }
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(TrendError::EmptyResult("mean of an empty sequence".to_string()).into());
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation under the given convention.
pub fn std_dev(values: &[f64], convention: StdConvention) -> Result<f64> {
    let n = values.len();
    let ddof = convention.ddof();
    if n <= ddof {
        return Err(TrendError::EmptyResult(format!(
            "standard deviation needs more than {} value(s), got {}",
            ddof, n
        ))
        .into());
    }

    let mu = mean(values)?;
    let sum_sq: f64 = values.iter().map(|x| (x - mu).powi(2)).sum();
    Ok((sum_sq / (n - ddof) as f64).sqrt())
}
