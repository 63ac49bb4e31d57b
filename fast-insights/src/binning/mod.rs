//! Bin tables and the pluggable binning contract.
//!
//! Numeric features are encoded through a [`BinTable`]: per column, an ordered
//! list of interval labels such as `[-inf,20.0)` plus the `missing` sentinel,
//! and the matching break values. Bin tables normally come from a [`Binner`]
//! strategy. The strategies shipped in [`strategies`] are simple reference
//! implementations; callers with a supervised binning service plug it in by
//! implementing the trait.
//!
//! # Example
//!
//! ```rust
//! use fast_insights::binning::{BinBound, ColumnBins};
//!
//! let bins = ColumnBins::from_breaks(&[20.0, 50.0], true);
//! assert_eq!(bins.labels(), ["[-inf,20.0)", "[20.0,50.0)", "[50.0,inf)", "missing"]);
//!
//! let entries = bins.entries().unwrap();
//! assert_eq!(entries[1].bound, BinBound::Interval { lower: 20.0, upper: 50.0 });
//! assert!(entries[3].contains(None));
//! ```

pub mod strategies;

use std::collections::HashMap;

use arrow::array::Float64Array;
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InsightError, Result};
use crate::model::columns::{coerce_numeric, MISSING_LABEL};

pub use strategies::{EqualWidthBinner, QuantileBinner};

/// User-supplied break points per column, bypassing automatic cut selection.
pub type ManualBreaks = HashMap<String, Vec<f64>>;

/// Error type returned by binning collaborators.
pub type BinnerError = Box<dyn std::error::Error + Send + Sync>;

/// A strategy that proposes bins for numeric columns.
///
/// `data` holds the numeric feature columns (as `Float64`) plus the binary
/// target column named `target` (as `Int8`). Columns listed in
/// `manual_breaks` must use the supplied break points.
pub trait Binner {
    /// Computes a bin table for every numeric column of `data`.
    fn bin(
        &self,
        data: &RecordBatch,
        target: &str,
        manual_breaks: &ManualBreaks,
    ) -> std::result::Result<BinTable, BinnerError>;
}

impl<F> Binner for F
where
    F: Fn(&RecordBatch, &str, &ManualBreaks) -> std::result::Result<BinTable, BinnerError>,
{
    fn bin(
        &self,
        data: &RecordBatch,
        target: &str,
        manual_breaks: &ManualBreaks,
    ) -> std::result::Result<BinTable, BinnerError> {
        self(data, target, manual_breaks)
    }
}

/// Bounds of a single bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinBound {
    /// Half-open interval `[lower, upper)`.
    Interval { lower: f64, upper: f64 },
    /// Rows with a missing value.
    Missing,
}

/// A parsed bin label.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEntry {
    /// Label as produced by the binner
    pub label: String,
    /// Parsed bounds
    pub bound: BinBound,
}

impl BinEntry {
    /// Parses an interval label (`[lower,upper)`) or the `missing` sentinel.
    pub fn parse(label: &str) -> Result<Self> {
        static INTERVAL_REGEX: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"^\s*[\[(]\s*([^,\s]+)\s*,\s*([^,\s]+)\s*[\])]\s*$")
                .expect("Hard-coded regex pattern should be valid")
        });

        if label == MISSING_LABEL {
            return Ok(Self {
                label: label.to_string(),
                bound: BinBound::Missing,
            });
        }

        let captures = INTERVAL_REGEX.captures(label).ok_or_else(|| {
            InsightError::dependency(format!(
                "bin label '{label}' is neither an interval like '[lower,upper)' nor '{MISSING_LABEL}'"
            ))
        })?;
        let bound = |i: usize| -> Result<f64> {
            captures[i].parse::<f64>().map_err(|_| {
                InsightError::dependency(format!(
                    "bin label '{label}' has a non-numeric bound '{}'",
                    &captures[i]
                ))
            })
        };
        let (lower, upper) = (bound(1)?, bound(2)?);
        if lower > upper {
            return Err(InsightError::dependency(format!(
                "bin label '{label}' has its lower bound above its upper bound"
            )));
        }

        Ok(Self {
            label: label.to_string(),
            bound: BinBound::Interval { lower, upper },
        })
    }

    /// Whether a raw value falls into this bin.
    pub fn contains(&self, value: Option<f64>) -> bool {
        match (self.bound, value) {
            (BinBound::Missing, v) => v.is_none(),
            (BinBound::Interval { lower, upper }, Some(v)) => v >= lower && v < upper,
            (BinBound::Interval { .. }, None) => false,
        }
    }
}

/// Bin description of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBins {
    labels: Vec<String>,
    breaks: Vec<f64>,
}

impl ColumnBins {
    /// Creates bins from collaborator output.
    pub fn new(labels: Vec<String>, breaks: Vec<f64>) -> Self {
        Self { labels, breaks }
    }

    /// Builds consecutive intervals from interior break points.
    ///
    /// Breaks are sorted and de-duplicated; non-finite values are ignored.
    /// The outer edges are `-inf` and `inf`. When `with_missing` is set, a
    /// trailing `missing` bin is added.
    pub fn from_breaks(breaks: &[f64], with_missing: bool) -> Self {
        let mut interior: Vec<f64> = breaks.iter().copied().filter(|b| b.is_finite()).collect();
        interior.sort_by(f64::total_cmp);
        interior.dedup();

        let mut edges = Vec::with_capacity(interior.len() + 2);
        edges.push(f64::NEG_INFINITY);
        edges.extend(interior);
        edges.push(f64::INFINITY);

        let mut labels: Vec<String> = edges
            .windows(2)
            .map(|w| format!("[{:?},{:?})", w[0], w[1]))
            .collect();
        if with_missing {
            labels.push(MISSING_LABEL.to_string());
        }

        Self {
            labels,
            breaks: edges,
        }
    }

    /// Bin labels in order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Break values in increasing order.
    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    /// Parses every label.
    pub fn entries(&self) -> Result<Vec<BinEntry>> {
        self.labels.iter().map(|l| BinEntry::parse(l)).collect()
    }
}

/// Bins for every binned numeric column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinTable {
    columns: IndexMap<String, ColumnBins>,
}

impl BinTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bins for a column, replacing previous bins.
    pub fn insert(&mut self, column: impl Into<String>, bins: ColumnBins) {
        self.columns.insert(column.into(), bins);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_column(mut self, column: impl Into<String>, bins: ColumnBins) -> Self {
        self.insert(column, bins);
        self
    }

    /// Bins of a column.
    pub fn get(&self, column: &str) -> Option<&ColumnBins> {
        self.columns.get(column)
    }

    /// Iterates over `(column, bins)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnBins)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of binned columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no column is binned.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks that every label honours the interval contract.
    pub fn validate(&self) -> Result<()> {
        for (column, bins) in &self.columns {
            bins.entries().map_err(|e| {
                InsightError::dependency(format!("invalid bins for column '{column}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Break values per column.
pub fn get_breaks(bins: &BinTable) -> IndexMap<String, Vec<f64>> {
    bins.iter()
        .map(|(column, b)| (column.to_string(), b.breaks().to_vec()))
        .collect()
}

/// Shared driver for strategies that derive interior cut points per column.
///
/// Manual breaks take precedence; intervals of manual breaks that hold no
/// values are reported with a warning but still emitted.
pub(crate) fn bin_numeric_columns<F>(
    data: &RecordBatch,
    target: &str,
    manual_breaks: &ManualBreaks,
    mut cuts: F,
) -> std::result::Result<BinTable, BinnerError>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let mut table = BinTable::new();
    let schema = data.schema();

    for (field, array) in schema.fields().iter().zip(data.columns()) {
        let column = field.name();
        if column == target {
            continue;
        }
        let values = coerce_numeric(column, array)?;
        let bins = match manual_breaks.get(column.as_str()) {
            Some(breaks) => {
                let bins = ColumnBins::from_breaks(breaks, true);
                warn_empty_intervals(column, &values, &bins);
                bins
            }
            None => {
                let mut observed: Vec<f64> = values.iter().flatten().collect();
                observed.sort_by(f64::total_cmp);
                ColumnBins::from_breaks(&cuts(&observed), true)
            }
        };
        table.insert(column.clone(), bins);
    }

    Ok(table)
}

fn warn_empty_intervals(column: &str, values: &Float64Array, bins: &ColumnBins) {
    for window in bins.breaks().windows(2) {
        let (lower, upper) = (window[0], window[1]);
        if !values.iter().flatten().any(|v| v >= lower && v < upper) {
            warn!(
                column = %column,
                lower,
                upper,
                "manual break interval holds no values; its segment will be empty"
            );
        }
    }
}
