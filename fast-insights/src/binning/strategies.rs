//! Reference binning strategies.
//!
//! Both strategies are unsupervised: they ignore the target column and only
//! look at the distribution of each feature.

use arrow::record_batch::RecordBatch;
use tracing::instrument;

use super::{bin_numeric_columns, BinTable, Binner, BinnerError, ManualBreaks};
use crate::stats::quantile_sorted;

/// Equal-frequency binning.
///
/// Cut points are the `i / bins` quantiles of the observed values; duplicated
/// cut points (heavy ties) collapse, so a column may get fewer bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantileBinner {
    bins: usize,
}

impl QuantileBinner {
    /// Creates a binner producing at most `bins` intervals (clamped between 1 and 100).
    pub fn new(bins: usize) -> Self {
        Self {
            bins: bins.clamp(1, 100),
        }
    }

    /// Maximum number of intervals per column.
    pub fn bins(&self) -> usize {
        self.bins
    }

    fn cuts(&self, sorted: &[f64]) -> Vec<f64> {
        if sorted.is_empty() {
            return Vec::new();
        }
        let min = sorted[0];
        (1..self.bins)
            .map(|i| quantile_sorted(sorted, i as f64 / self.bins as f64))
            .filter(|cut| *cut > min)
            .collect()
    }
}

impl Default for QuantileBinner {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Binner for QuantileBinner {
    #[instrument(skip_all, fields(binner = "quantile", bins = self.bins))]
    fn bin(
        &self,
        data: &RecordBatch,
        target: &str,
        manual_breaks: &ManualBreaks,
    ) -> Result<BinTable, BinnerError> {
        bin_numeric_columns(data, target, manual_breaks, |sorted| self.cuts(sorted))
    }
}

/// Equal-width binning between the observed minimum and maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualWidthBinner {
    bins: usize,
}

impl EqualWidthBinner {
    /// Creates a binner producing `bins` intervals (clamped between 1 and 100).
    pub fn new(bins: usize) -> Self {
        Self {
            bins: bins.clamp(1, 100),
        }
    }

    /// Number of intervals per column.
    pub fn bins(&self) -> usize {
        self.bins
    }

    fn cuts(&self, sorted: &[f64]) -> Vec<f64> {
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Vec::new();
        };
        let width = (max - min) / self.bins as f64;
        if width <= 0.0 {
            return Vec::new();
        }
        (1..self.bins).map(|i| min + i as f64 * width).collect()
    }
}

impl Default for EqualWidthBinner {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Binner for EqualWidthBinner {
    #[instrument(skip_all, fields(binner = "equal_width", bins = self.bins))]
    fn bin(
        &self,
        data: &RecordBatch,
        target: &str,
        manual_breaks: &ManualBreaks,
    ) -> Result<BinTable, BinnerError> {
        bin_numeric_columns(data, target, manual_breaks, |sorted| self.cuts(sorted))
    }
}
