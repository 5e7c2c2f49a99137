//! Confidence scores over a batch of predictions.

use crate::error::TrendError;
use crate::stats::{mean, std_dev, StdConvention};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Turns a prediction batch into a single confidence scalar.
pub trait ConfidenceCalculator: Send + Sync {
    fn calculate(&self, predictions: &[f64]) -> Result<f64>;
}

/// `1 / (1 + σ)` where σ is the population standard deviation of the batch.
///
/// 1.0 when every prediction agrees, approaching 0 as they spread out.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispersionConfidence;

impl ConfidenceCalculator for DispersionConfidence {
    fn calculate(&self, predictions: &[f64]) -> Result<f64> {
        let sigma = std_dev(predictions, StdConvention::Population)?;
        Ok(1.0 / (1.0 + sigma))
    }
}

/// Fraction of predictions on the same side of `threshold` as the batch mean.
///
/// Meant for classifier probabilities, where 0.5 separates the two classes.
#[derive(Debug, Clone, Copy)]
pub struct AgreementConfidence {
    pub threshold: f64,
}

impl Default for AgreementConfidence {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl ConfidenceCalculator for AgreementConfidence {
    fn calculate(&self, predictions: &[f64]) -> Result<f64> {
        let mu = mean(predictions)?;
        let above = mu >= self.threshold;
        let agreeing = predictions
            .iter()
            .filter(|&&p| (p >= self.threshold) == above)
            .count();
        Ok(agreeing as f64 / predictions.len() as f64)
    }
}

/// Confidence method selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ConfidenceMethod {
    #[default]
    Dispersion,
    Agreement {
        #[serde(default = "default_agreement_threshold")]
        threshold: f64,
    },
}

fn default_agreement_threshold() -> f64 {
    0.5
}

impl ConfidenceMethod {
    /// Build the calculator this method names.
    pub fn build(&self) -> Box<dyn ConfidenceCalculator> {
        match *self {
            ConfidenceMethod::Dispersion => Box::new(DispersionConfidence),
            ConfidenceMethod::Agreement { threshold } => {
                if !(0.0..=1.0).contains(&threshold) {
                    log::warn!("Agreement threshold {} is outside [0, 1]", threshold);
                }
                Box::new(AgreementConfidence { threshold })
            }
        }
    }
}

/// Reject empty batches with a uniform message.
pub(crate) fn require_predictions(predictions: &[f64]) -> Result<()> {
    if predictions.is_empty() {
        return Err(TrendError::EmptyResult("model returned no predictions".to_string()).into());
    }
    Ok(())
}
