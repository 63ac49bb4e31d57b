//! Prelude for commonly used types and traits in fast-insights.

pub use crate::binning::{BinTable, Binner, ColumnBins, EqualWidthBinner, QuantileBinner};
pub use crate::calculations::{
    calculate_dependence, compare_intervals, DependenceMetric, DependenceReport,
};
pub use crate::error::{InsightError, Result};
pub use crate::experiments::SplitApplyCombine;
pub use crate::formatters::{FormatterConfig, HumanFormatter, JsonFormatter, ReportFormatter};
pub use crate::model::{ModelConfig, ModelData, TargetSpec};
