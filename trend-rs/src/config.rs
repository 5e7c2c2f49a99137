//! Estimator configuration.
//!
//! Loaded from TOML; every section falls back to its defaults when omitted.

use crate::confidence::ConfidenceMethod;
use crate::features::FeatureOptions;
use crate::model::ModelConfig;
use crate::stats::StdConvention;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for the trend estimator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Path to the ONNX model file
    pub model_path: Option<PathBuf>,

    /// ONNX runtime settings
    pub model: ModelConfig,

    /// Feature processing switches
    pub features: FeatureOptions,

    /// Denominator used for the seasonal factor
    pub std_convention: StdConvention,

    /// How confidence is derived from predictions
    pub confidence: ConfidenceMethod,
}

impl EstimatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse config")
    }
}

/// Annotated template written by `--generate-config`.
pub fn default_config_template() -> &'static str {
    r#"# Trend estimator configuration

# Pre-trained classifier exported to ONNX
model_path = "model.onnx"

# "population" (divide by n) or "sample" (divide by n - 1)
std_convention = "population"

[model]
optimize_graph = true
intra_threads = 1
# output_name = "probabilities"

[features]
include_seasonal = true
normalize = true

[confidence]
# "dispersion" or "agreement"
method = "dispersion"
# threshold = 0.5
"#
}
