//! Feature computation for model inputs.
//!
//! Turns a [`HistoricalTable`] into the dense matrix the model consumes:
//! the selected numeric columns, optionally z-score normalized, followed by
//! optional one-hot month flags.

use crate::error::TrendError;
use crate::history::HistoricalTable;
use crate::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Number of seasonal flag columns (one per calendar month).
pub const NUM_MONTH_FLAGS: usize = 12;

/// Options passed to a [`FeatureProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureOptions {
    /// Append one-hot month flags
    pub include_seasonal: bool,

    /// Z-score normalize the selected columns
    pub normalize: bool,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            include_seasonal: true,
            normalize: true,
        }
    }
}

/// Dense feature matrix handed to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Column names, in matrix column order
    pub names: Vec<String>,

    /// Rows = table rows, columns = features
    pub values: Array2<f32>,
}

impl FeatureMatrix {
    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of feature columns.
    pub fn num_features(&self) -> usize {
        self.values.ncols()
    }
}

/// Transforms a historical table into model features.
pub trait FeatureProcessor: Send + Sync {
    /// Build the feature matrix.
    ///
    /// # Arguments
    /// * `table` - Historical records
    /// * `features` - Column names to use; empty selects every column
    /// * `options` - Seasonal inclusion and normalization switches
    fn process(
        &self,
        table: &HistoricalTable,
        features: &[String],
        options: &FeatureOptions,
    ) -> Result<FeatureMatrix>;
}

/// Column selection, z-score normalization and one-hot month flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalFeatureProcessor;

impl FeatureProcessor for SeasonalFeatureProcessor {
    fn process(
        &self,
        table: &HistoricalTable,
        features: &[String],
        options: &FeatureOptions,
    ) -> Result<FeatureMatrix> {
        if table.is_empty() {
            return Err(TrendError::InputShape("table has no rows".to_string()).into());
        }

        let selected: Vec<String> = if features.is_empty() {
            table.column_names().into_iter().map(String::from).collect()
        } else {
            features.to_vec()
        };

        let n = table.len();
        let num_flags = if options.include_seasonal { NUM_MONTH_FLAGS } else { 0 };
        let mut values = Array2::<f32>::zeros((n, selected.len() + num_flags));
        let mut names = Vec::with_capacity(selected.len() + num_flags);

        // 1. Numeric columns
        for (col, name) in selected.iter().enumerate() {
            let raw = table.column(name)?;
            let column = if options.normalize {
                z_score(raw)
            } else {
                raw.to_vec()
            };
            for (i, &v) in column.iter().enumerate() {
                values[[i, col]] = if v.is_finite() { v as f32 } else { 0.0 };
            }
            names.push(name.clone());
        }

        // 2. Month flags
        if options.include_seasonal {
            let offset = selected.len();
            for (i, month) in table.months().into_iter().enumerate() {
                values[[i, offset + month as usize - 1]] = 1.0;
            }
            names.extend((1..=NUM_MONTH_FLAGS).map(|m| format!("month_{}", m)));
        }

        log::debug!(
            "Built feature matrix: {} rows x {} features",
            values.nrows(),
            values.ncols()
        );

        Ok(FeatureMatrix { names, values })
    }
}

/// Z-score normalize a column.
///
/// Mean and population standard deviation are taken over finite entries only.
/// Non-finite entries stay non-finite; a constant column maps to zeros.
///
/// # Returns
/// `(x - mean) / std` per entry
pub fn z_score(values: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return vec![f64::NAN; values.len()];
    }

    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                f64::NAN
            } else if std == 0.0 {
                0.0
            } else {
                (v - mean) / std
            }
        })
        .collect()
}
