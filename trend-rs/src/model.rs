//! Predictive model interface.
//!
//! [`TrendModel`] is the single asynchronous seam of the estimator.
//! [`OnnxModel`] backs it with a pre-trained classifier exported to ONNX.

use crate::error::TrendError;
use crate::features::FeatureMatrix;
use crate::Result;
use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DynValue, Tensor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A trained model that scores a feature matrix.
#[async_trait]
pub trait TrendModel: Send + Sync {
    /// Run inference, returning one numeric prediction per output element.
    async fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Model name (for logging).
    fn name(&self) -> &str;
}

/// Runtime settings for the ONNX model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Enable full graph optimization
    pub optimize_graph: bool,

    /// Intra-op threads for the runtime
    pub intra_threads: usize,

    /// Output to read predictions from (first output when unset)
    pub output_name: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            optimize_graph: true,
            intra_threads: 1, // Single-threaded for determinism
            output_name: None,
        }
    }
}

/// ONNX Runtime backed model.
pub struct OnnxModel {
    /// Running a session needs exclusive access
    session: Arc<Mutex<Session>>,

    /// Output tensor holding the predictions
    output_name: String,

    name: String,
}

impl OnnxModel {
    /// Load an ONNX model from disk.
    ///
    /// Any failure (missing file, invalid graph, unknown output) is reported
    /// as a model-unavailable error.
    ///
    /// # Example
    /// ```no_run
    /// use trend_estimator::model::{ModelConfig, OnnxModel};
    /// use std::path::Path;
    ///
    /// let model = OnnxModel::load(Path::new("classifier.onnx"), &ModelConfig::default()).unwrap();
    /// ```
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self> {
        let unavailable =
            |e: ort::Error| TrendError::ModelUnavailable(format!("{}: {}", model_path.display(), e));

        let session = Session::builder()
            .map_err(unavailable)?
            .with_optimization_level(if config.optimize_graph {
                GraphOptimizationLevel::Level3
            } else {
                GraphOptimizationLevel::Level1
            })
            .map_err(unavailable)?
            .with_intra_threads(config.intra_threads.max(1))
            .map_err(unavailable)?
            .commit_from_file(model_path)
            .map_err(unavailable)?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let output_name = match &config.output_name {
            Some(name) if output_names.contains(name) => name.clone(),
            Some(name) => {
                return Err(TrendError::ModelUnavailable(format!(
                    "model has no output '{}' (outputs: {:?})",
                    name, output_names
                ))
                .into())
            }
            None => output_names.first().cloned().ok_or_else(|| {
                TrendError::ModelUnavailable("model declares no outputs".to_string())
            })?,
        };

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        log::info!(
            "Loaded ONNX model '{}' from {} (output '{}')",
            name,
            model_path.display(),
            output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            output_name,
            name,
        })
    }

    /// Name of the output predictions are read from.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

#[async_trait]
impl TrendModel for OnnxModel {
    async fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        let session = Arc::clone(&self.session);
        let output_name = self.output_name.clone();
        let input = features.values.clone();

        // Inference blocks; keep it off the async workers
        let handle = tokio::task::spawn_blocking(move || -> Result<Vec<f64>> {
            let mut session = session
                .lock()
                .map_err(|_| TrendError::ModelUnavailable("session lock poisoned".to_string()))?;

            let input_tensor = Tensor::from_array(input)
                .map_err(|e| TrendError::ModelUnavailable(e.to_string()))?;
            let outputs = session
                .run(ort::inputs![input_tensor])
                .map_err(|e| TrendError::ModelUnavailable(e.to_string()))?;

            let output = outputs.get(output_name.as_str()).ok_or_else(|| {
                TrendError::ModelUnavailable(format!("output '{}' missing", output_name))
            })?;
            tensor_to_f64(output)
        });

        handle
            .await
            .map_err(|e| TrendError::ModelUnavailable(format!("inference task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Flatten a numeric output tensor into `f64`.
fn tensor_to_f64(value: &DynValue) -> Result<Vec<f64>> {
    if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
        return Ok(data.iter().map(|&v| v as f64).collect());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<f64>() {
        return Ok(data.to_vec());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<i64>() {
        return Ok(data.iter().map(|&v| v as f64).collect());
    }
    Err(TrendError::ModelUnavailable("model output is not a numeric tensor".to_string()).into())
}
