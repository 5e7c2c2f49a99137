//! Trend estimation over time-indexed tables.
//!
//! A pre-trained classifier scores seasonal, normalized features built from a
//! historical table; the predictions are reduced to a trend and a confidence,
//! and the table's monthly means give an independent seasonal factor.

pub mod confidence;
pub mod config;
pub mod error;
pub mod estimator;
pub mod features;
pub mod history;
pub mod model;
pub mod seasonality;
pub mod stats;

pub use confidence::{AgreementConfidence, ConfidenceCalculator, ConfidenceMethod, DispersionConfidence};
pub use config::EstimatorConfig;
pub use error::TrendError;
pub use estimator::{PredictionResult, TrendEstimator};
pub use features::{FeatureMatrix, FeatureOptions, FeatureProcessor, SeasonalFeatureProcessor};
pub use history::HistoricalTable;
pub use model::{ModelConfig, OnnxModel, TrendModel};
pub use stats::StdConvention;

/// Library-wide error type.
pub type Result<T> = anyhow::Result<T>;
