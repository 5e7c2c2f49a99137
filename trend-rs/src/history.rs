//! Time-indexed historical tables.
//!
//! A [`HistoricalTable`] is a timestamp index plus named numeric columns of the
//! same length. The seasonality computation reads the `value` column; every
//! column is available to feature processing.

use crate::error::TrendError;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::Path;

/// Name of the column the seasonal factor is computed from.
pub const VALUE_COLUMN: &str = "value";

/// Naive formats tried, in order, after RFC 3339.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Historical records keyed by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalTable {
    index: Vec<NaiveDateTime>,
    /// Insertion-ordered columns
    columns: Vec<(String, Vec<f64>)>,
}

impl HistoricalTable {
    /// Create a table with the given index and no columns.
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Build a table with a single `value` column from `(timestamp, value)` pairs.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDateTime, f64)>,
    {
        let (index, values): (Vec<_>, Vec<_>) = records.into_iter().unzip();
        Self {
            index,
            columns: vec![(VALUE_COLUMN.to_string(), values)],
        }
    }

    /// Add (or replace) a column.
    ///
    /// Fails with an input-shape error if `values` does not match the index length.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(TrendError::InputShape(format!(
                "column '{}' has {} entries, index has {}",
                name,
                values.len(),
                self.index.len()
            ))
            .into());
        }

        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name, values)),
        }
        Ok(self)
    }

    /// Parse string timestamps into an index.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
    /// `YYYY-MM-DD` and `YYYY-MM`. Offset timestamps keep their local wall-clock
    /// time, so the month is the one written in the string. Anything else is an
    /// input-shape error, since the month cannot be recovered from it.
    pub fn parse_index<S: AsRef<str>>(raw: &[S]) -> Result<Vec<NaiveDateTime>> {
        raw.iter().map(|s| parse_timestamp(s.as_ref())).collect()
    }

    /// Load a table from CSV with a header row.
    ///
    /// `timestamp_column` becomes the index; every other column is parsed as
    /// `f64`, with empty cells read as NaN.
    pub fn from_csv_reader<R: Read>(reader: R, timestamp_column: &str) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers().context("reading CSV header")?.clone();

        let ts_idx = headers
            .iter()
            .position(|h| h == timestamp_column)
            .ok_or_else(|| TrendError::missing_column(timestamp_column))?;

        let names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut index = Vec::new();
        let mut data: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

        for (row, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("reading CSV row {}", row + 1))?;
            let raw_ts = record
                .get(ts_idx)
                .ok_or_else(|| TrendError::InputShape(format!("row {} has no timestamp", row + 1)))?;
            index.push(parse_timestamp(raw_ts)?);

            let cells = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != ts_idx)
                .map(|(_, cell)| cell);
            for (col, cell) in cells.enumerate() {
                data[col].push(parse_cell(cell, &names[col], row + 1)?);
            }
        }

        let mut table = Self::new(index);
        for (name, values) in names.into_iter().zip(data) {
            table = table.with_column(name, values)?;
        }
        Ok(table)
    }

    /// Load a table from a CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, timestamp_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        Self::from_csv_reader(file, timestamp_column)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The timestamp index.
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| TrendError::missing_column(name).into())
    }

    /// Check whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Calendar month (1-12) of every row.
    pub fn months(&self) -> Vec<u32> {
        self.index.iter().map(|ts| ts.month()).collect()
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"));
    match date.ok().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(dt) => Ok(dt),
        None => Err(TrendError::InputShape(format!(
            "index entry '{}' is not a timestamp with a month",
            raw
        ))
        .into()),
    }
}

fn parse_cell(cell: &str, column: &str, row: usize) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        TrendError::InputShape(format!(
            "column '{}' row {}: '{}' is not numeric",
            column, row, cell
        ))
        .into()
    })
}
