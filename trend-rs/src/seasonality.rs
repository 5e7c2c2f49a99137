//! Seasonal factor extraction.
//!
//! The seasonal factor is the dispersion of monthly means of the `value`
//! column. It is computed from the raw table, independently of the features
//! the model sees.

use crate::error::TrendError;
use crate::history::{HistoricalTable, VALUE_COLUMN};
use crate::stats::{std_dev, StdConvention};
use crate::Result;
use std::collections::BTreeMap;

/// Mean of `value` per calendar month (1-12).
///
/// NaN and infinite entries are both skipped; a month with no finite entry
/// is left out.
pub fn monthly_means(table: &HistoricalTable) -> Result<BTreeMap<u32, f64>> {
    if table.is_empty() {
        return Err(TrendError::InputShape("table has no rows".to_string()).into());
    }
    let values = table.column(VALUE_COLUMN)?;

    let mut groups: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    let mut skipped = 0usize;
    for (month, &v) in table.months().into_iter().zip(values) {
        if !v.is_finite() {
            skipped += 1;
            continue;
        }
        let entry = groups.entry(month).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }

    if skipped > 0 {
        log::warn!("Skipped {} non-finite '{}' entries", skipped, VALUE_COLUMN);
    }

    Ok(groups
        .into_iter()
        .map(|(month, (sum, count))| (month, sum / count as f64))
        .collect())
}

/// Standard deviation of the monthly means of `value`.
///
/// # Errors
/// * input-shape error if the table is empty or has no `value` column
/// * empty-result error if no month has a finite value, or the convention
///   needs more months than are present
pub fn extract_seasonality(table: &HistoricalTable, convention: StdConvention) -> Result<f64> {
    let means = monthly_means(table)?;
    if means.is_empty() {
        return Err(TrendError::EmptyResult("no month has a finite value".to_string()).into());
    }

    let means: Vec<f64> = means.into_values().collect();
    std_dev(&means, convention)
}
