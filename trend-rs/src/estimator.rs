//! Trend estimation.
//!
//! [`TrendEstimator`] runs feature processing, awaits the model, and
//! aggregates the predictions into a [`PredictionResult`]. The seasonal factor
//! is computed from the raw table on its own path and does not see the
//! feature selection.

use crate::confidence::{require_predictions, ConfidenceCalculator, DispersionConfidence};
use crate::config::EstimatorConfig;
use crate::error::TrendError;
use crate::features::{FeatureOptions, FeatureProcessor, SeasonalFeatureProcessor};
use crate::history::{HistoricalTable, VALUE_COLUMN};
use crate::model::{OnnxModel, TrendModel};
use crate::seasonality;
use crate::stats::{mean, StdConvention};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of one estimation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Mean of the raw model predictions
    pub trend: f64,

    /// Certainty derived from the prediction batch
    pub confidence: f64,

    /// Standard deviation of monthly means of `value`
    pub seasonal_factor: f64,
}

impl PredictionResult {
    /// The result as a `name -> value` mapping.
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("trend".to_string(), self.trend),
            ("confidence".to_string(), self.confidence),
            ("seasonal_factor".to_string(), self.seasonal_factor),
        ])
    }
}

/// Estimates trend, confidence and seasonality from historical records.
pub struct TrendEstimator {
    model: Arc<dyn TrendModel>,
    feature_processor: Box<dyn FeatureProcessor>,
    confidence: Box<dyn ConfidenceCalculator>,
    options: FeatureOptions,
    std_convention: StdConvention,
}

impl TrendEstimator {
    /// Create an estimator around `model` with the default collaborators.
    pub fn new(model: Arc<dyn TrendModel>) -> Self {
        Self {
            model,
            feature_processor: Box::new(SeasonalFeatureProcessor),
            confidence: Box::new(DispersionConfidence),
            options: FeatureOptions::default(),
            std_convention: StdConvention::default(),
        }
    }

    /// Load the ONNX model named in `config` and apply the rest of it.
    pub fn from_config(config: &EstimatorConfig) -> Result<Self> {
        let path = config.model_path.as_ref().ok_or_else(|| {
            TrendError::ModelUnavailable("no model_path configured".to_string())
        })?;
        let model = OnnxModel::load(path, &config.model)?;
        Ok(Self::new(Arc::new(model)).with_config(config))
    }

    /// Apply feature options, denominator and confidence method from `config`.
    pub fn with_config(mut self, config: &EstimatorConfig) -> Self {
        self.options = config.features;
        self.std_convention = config.std_convention;
        self.confidence = config.confidence.build();
        self
    }

    pub fn with_feature_processor(mut self, processor: Box<dyn FeatureProcessor>) -> Self {
        self.feature_processor = processor;
        self
    }

    pub fn with_confidence(mut self, confidence: Box<dyn ConfidenceCalculator>) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_feature_options(mut self, options: FeatureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_std_convention(mut self, convention: StdConvention) -> Self {
        self.std_convention = convention;
        self
    }

    /// Estimate the trend of `table`.
    ///
    /// # Arguments
    /// * `table` - Historical records with a `value` column
    /// * `features` - Columns forwarded to feature processing (empty = all)
    ///
    /// # Errors
    /// Input-shape errors for an empty table or missing columns (checked
    /// before the model runs), model-unavailable errors from the model, and an
    /// empty-result error when the model returns no finite predictions.
    /// Non-finite predictions among finite ones are dropped with a warning.
    pub async fn predict_trend(
        &self,
        table: &HistoricalTable,
        features: &[String],
    ) -> Result<PredictionResult> {
        // Fail on a missing `value` column before paying for inference
        table.column(VALUE_COLUMN)?;

        let processed = self
            .feature_processor
            .process(table, features, &self.options)?;

        log::debug!(
            "Submitting {}x{} features to model '{}'",
            processed.num_rows(),
            processed.num_features(),
            self.model.name()
        );
        let predictions = finite_predictions(self.model.predict(&processed).await?)?;

        let trend = mean(&predictions)?;
        let confidence = self.confidence.calculate(&predictions)?;
        let seasonal_factor = self.extract_seasonality(table)?;

        log::debug!(
            "Trend {:.4} (confidence {:.4}, seasonal factor {:.4}) from {} predictions",
            trend,
            confidence,
            seasonal_factor,
            predictions.len()
        );

        Ok(PredictionResult {
            trend,
            confidence,
            seasonal_factor,
        })
    }

    /// Seasonal factor of `table` under this estimator's denominator.
    pub fn extract_seasonality(&self, table: &HistoricalTable) -> Result<f64> {
        seasonality::extract_seasonality(table, self.std_convention)
    }
}

/// Drop NaN and infinite predictions; fail if none are left.
fn finite_predictions(predictions: Vec<f64>) -> Result<Vec<f64>> {
    require_predictions(&predictions)?;

    let total = predictions.len();
    let finite: Vec<f64> = predictions.into_iter().filter(|p| p.is_finite()).collect();
    if finite.is_empty() {
        return Err(TrendError::EmptyResult(format!(
            "all {} model predictions are non-finite",
            total
        ))
        .into());
    }
    if finite.len() < total {
        log::warn!(
            "Dropped {} non-finite predictions out of {}",
            total - finite.len(),
            total
        );
    }
    Ok(finite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::AgreementConfidence;
    use crate::error::classify;
    use crate::features::FeatureMatrix;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use ndarray::Array2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedModel(Vec<f64>);

    /// Counts calls so tests can check whether inference ran.
    #[derive(Default)]
    struct CountingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TrendModel for CountingModel {
        async fn predict(&self, _features: &FeatureMatrix) -> Result<Vec<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    /// Records what the estimator hands to feature processing.
    #[derive(Default)]
    struct RecordingProcessor {
        seen: Mutex<Vec<(Vec<String>, FeatureOptions)>>,
    }

    impl FeatureProcessor for RecordingProcessor {
        fn process(
            &self,
            table: &HistoricalTable,
            features: &[String],
            options: &FeatureOptions,
        ) -> Result<FeatureMatrix> {
            self.seen.lock().unwrap().push((features.to_vec(), *options));
            Ok(FeatureMatrix {
                names: vec!["ones".to_string()],
                values: Array2::ones((table.len(), 1)),
            })
        }
    }

    /// Lets a test keep a handle on a processor owned by the estimator.
    struct SharedProcessor(Arc<RecordingProcessor>);

    impl FeatureProcessor for SharedProcessor {
        fn process(
            &self,
            table: &HistoricalTable,
            features: &[String],
            options: &FeatureOptions,
        ) -> Result<FeatureMatrix> {
            self.0.process(table, features, options)
        }
    }

    #[async_trait]
    impl TrendModel for FixedModel {
        async fn predict(&self, _features: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn monthly_table() -> HistoricalTable {
        HistoricalTable::from_records((1..=12).map(|m| (ts(2024, m, 1), m as f64)))
    }

    #[tokio::test]
    async fn test_predict_trend_basic() {
        let estimator = TrendEstimator::new(Arc::new(FixedModel(vec![0.2, 0.4, 0.6])));
        let result = estimator.predict_trend(&monthly_table(), &[]).await.unwrap();

        assert!((result.trend - 0.4).abs() < 1e-12);
        assert!((result.seasonal_factor - 3.452).abs() < 1e-3);
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    }

    #[tokio::test]
    async fn test_empty_predictions() {
        let estimator = TrendEstimator::new(Arc::new(FixedModel(vec![])));
        let err = estimator.predict_trend(&monthly_table(), &[]).await.unwrap_err();
        assert!(matches!(classify(&err), Some(TrendError::EmptyResult(_))));
    }

    #[tokio::test]
    async fn test_empty_table() {
        let estimator = TrendEstimator::new(Arc::new(FixedModel(vec![1.0])));
        let err = estimator
            .predict_trend(&HistoricalTable::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(classify(&err), Some(TrendError::InputShape(_))));
    }

    #[tokio::test]
    async fn test_custom_confidence_and_convention() {
        let estimator = TrendEstimator::new(Arc::new(FixedModel(vec![0.9, 0.8, 0.7, 0.0])))
            .with_confidence(Box::new(AgreementConfidence::default()))
            .with_std_convention(StdConvention::Sample);
        let result = estimator.predict_trend(&monthly_table(), &[]).await.unwrap();

        assert!((result.confidence - 0.75).abs() < 1e-12);
        // sample std of 1..=12 = sqrt(13)
        assert!((result.seasonal_factor - 13.0_f64.sqrt()).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_missing_value_column_skips_inference() {
        let model = Arc::new(CountingModel::default());
        let estimator = TrendEstimator::new(model.clone());
        let table = HistoricalTable::new(vec![ts(2024, 1, 1)])
            .with_column("bookings", vec![3.0])
            .unwrap();

        let err = estimator.predict_trend(&table, &[]).await.unwrap_err();
        assert!(matches!(classify(&err), Some(TrendError::InputShape(_))));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);

        estimator.predict_trend(&monthly_table(), &[]).await.unwrap();
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_finite_predictions_are_dropped() {
        let estimator =
            TrendEstimator::new(Arc::new(FixedModel(vec![0.2, f64::NAN, 0.6, f64::INFINITY])));
        let result = estimator.predict_trend(&monthly_table(), &[]).await.unwrap();

        assert!((result.trend - 0.4).abs() < 1e-12);
        assert!(result.confidence.is_finite());
    }

    #[tokio::test]
    async fn test_all_non_finite_predictions() {
        let estimator = TrendEstimator::new(Arc::new(FixedModel(vec![f64::NAN, f64::NAN])));
        let err = estimator.predict_trend(&monthly_table(), &[]).await.unwrap_err();
        assert!(matches!(classify(&err), Some(TrendError::EmptyResult(_))));
    }

    #[tokio::test]
    async fn test_custom_feature_processor_receives_request() {
        let processor = Arc::new(RecordingProcessor::default());
        let estimator = TrendEstimator::new(Arc::new(FixedModel(vec![0.5])))
            .with_feature_processor(Box::new(SharedProcessor(processor.clone())));

        let features = vec!["value".to_string(), "bookings".to_string()];
        estimator.predict_trend(&monthly_table(), &features).await.unwrap();

        let seen = processor.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, features);
        assert_eq!(
            seen[0].1,
            FeatureOptions {
                include_seasonal: true,
                normalize: true,
            }
        );
    }

    #[tokio::test]
    async fn test_feature_options_are_forwarded() {
        let processor = Arc::new(RecordingProcessor::default());
        let options = FeatureOptions {
            include_seasonal: false,
            normalize: true,
        };
        let estimator = TrendEstimator::new(Arc::new(FixedModel(vec![0.5])))
            .with_feature_processor(Box::new(SharedProcessor(processor.clone())))
            .with_feature_options(options);

        estimator.predict_trend(&monthly_table(), &[]).await.unwrap();

        let seen = processor.seen.lock().unwrap();
        assert!(seen[0].0.is_empty());
        assert_eq!(seen[0].1, options);
    }

    #[test]
    fn test_as_map_keys() {
        let result = PredictionResult {
            trend: 1.0,
            confidence: 0.5,
            seasonal_factor: 0.0,
        };
        let map = result.as_map();
        assert_eq!(map.len(), 3);
        assert_eq!(map["trend"], 1.0);
        assert_eq!(map["confidence"], 0.5);
        assert_eq!(map["seasonal_factor"], 0.0);
    }

    #[test]
    fn test_from_config_without_model_path() {
        let err = match TrendEstimator::from_config(&EstimatorConfig::default()) {
            Ok(_) => panic!("expected missing model path to fail"),
            Err(e) => e,
        };
        assert!(matches!(classify(&err), Some(TrendError::ModelUnavailable(_))));
    }
}
