//! Segment-versus-target dependence statistics.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Array, Float64Builder, ListBuilder, StringArray, StringBuilder, UInt64Array,
};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{InsightError, Result};
use crate::model::columns::named_labels;
use crate::model::{ModelData, Provenance};
use crate::stats;

/// Dependence statistics of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependenceRow {
    /// Segment name
    pub segment: String,
    /// Rows in the segment
    pub total_sum: u64,
    /// Rows in the segment with the "worse" target outcome
    pub low_sum: u64,
    /// Share of worse outcomes within the segment, in percent
    pub low_perc: f64,
    /// `100 - low_perc`
    pub high_perc: f64,
    /// Segment size relative to the whole table, in percent
    pub perc_of_total: f64,
    /// Deviation of the segment's target mean from the global target mean, in percent
    pub target_delta_perc: f64,
    /// Base column name, or the combination key
    pub base_col: String,
    /// Bin breaks of a numeric base column
    pub base_breaks: Option<Vec<f64>>,
    /// `[min, max]` of a numeric base column
    pub base_range: Option<[f64; 2]>,
    /// Distinct categories of a categorical base column
    pub base_cats: Option<Vec<String>>,
    /// Segment provenance
    pub provenance: Provenance,
}

/// Numeric statistic of a [`DependenceRow`], used for thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependenceMetric {
    TotalSum,
    LowSum,
    LowPerc,
    HighPerc,
    PercOfTotal,
    TargetDeltaPerc,
}

impl DependenceMetric {
    /// All metrics in report column order.
    pub const ALL: [DependenceMetric; 6] = [
        Self::TotalSum,
        Self::LowSum,
        Self::LowPerc,
        Self::HighPerc,
        Self::PercOfTotal,
        Self::TargetDeltaPerc,
    ];

    /// Column name of the metric.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TotalSum => "total_sum",
            Self::LowSum => "low_sum",
            Self::LowPerc => "low_perc",
            Self::HighPerc => "high_perc",
            Self::PercOfTotal => "perc_of_total",
            Self::TargetDeltaPerc => "target_delta_perc",
        }
    }

    /// Value of the metric for `row`.
    pub fn value(&self, row: &DependenceRow) -> f64 {
        match self {
            Self::TotalSum => row.total_sum as f64,
            Self::LowSum => row.low_sum as f64,
            Self::LowPerc => row.low_perc,
            Self::HighPerc => row.high_perc,
            Self::PercOfTotal => row.perc_of_total,
            Self::TargetDeltaPerc => row.target_delta_perc,
        }
    }
}

impl fmt::Display for DependenceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DependenceMetric {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| InsightError::validation(format!("unknown dependence metric '{s}'")))
    }
}

/// Dependence statistics of every segment, most "worse"-skewed first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependenceReport {
    /// Name of the binary target
    pub target: String,
    /// Rows in the analysed table
    pub row_count: usize,
    /// One row per segment
    pub rows: Vec<DependenceRow>,
}

impl DependenceReport {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the report has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row of a segment.
    pub fn get(&self, segment: &str) -> Option<&DependenceRow> {
        self.rows.iter().find(|r| r.segment == segment)
    }

    /// Keeps rows where every metric is strictly above its threshold.
    pub fn filter(&self, thresholds: &[(DependenceMetric, f64)]) -> Self {
        Self {
            target: self.target.clone(),
            row_count: self.row_count,
            rows: self
                .rows
                .iter()
                .filter(|row| thresholds.iter().all(|(m, v)| m.value(row) > *v))
                .cloned()
                .collect(),
        }
    }

    /// Rows grouped by `base_col`, groups in first-appearance order.
    pub fn group_by_base(&self) -> IndexMap<&str, Vec<&DependenceRow>> {
        let mut groups: IndexMap<&str, Vec<&DependenceRow>> = IndexMap::new();
        for row in &self.rows {
            groups.entry(row.base_col.as_str()).or_default().push(row);
        }
        groups
    }

    /// Exports the report as an Arrow table.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut breaks = ListBuilder::new(Float64Builder::new());
        let mut ranges = ListBuilder::new(Float64Builder::new());
        let mut cats = ListBuilder::new(StringBuilder::new());
        for row in &self.rows {
            match &row.base_breaks {
                Some(values) => {
                    breaks.values().append_slice(values);
                    breaks.append(true);
                }
                None => breaks.append(false),
            }
            match &row.base_range {
                Some(values) => {
                    ranges.values().append_slice(values);
                    ranges.append(true);
                }
                None => ranges.append(false),
            }
            match &row.base_cats {
                Some(values) => {
                    for value in values {
                        cats.values().append_value(value);
                    }
                    cats.append(true);
                }
                None => cats.append(false),
            }
        }

        let f64_column = |metric: DependenceMetric| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(
                self.rows.iter().map(|r| metric.value(r)),
            ))
        };
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.segment.as_str()),
            )),
            Arc::new(UInt64Array::from_iter_values(
                self.rows.iter().map(|r| r.total_sum),
            )),
            Arc::new(UInt64Array::from_iter_values(
                self.rows.iter().map(|r| r.low_sum),
            )),
            f64_column(DependenceMetric::LowPerc),
            f64_column(DependenceMetric::HighPerc),
            f64_column(DependenceMetric::PercOfTotal),
            f64_column(DependenceMetric::TargetDeltaPerc),
            Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.base_col.as_str()),
            )),
            Arc::new(breaks.finish()),
            Arc::new(ranges.finish()),
            Arc::new(cats.finish()),
        ];

        let fields: Vec<Field> = [
            ("segment", false),
            ("total_sum", false),
            ("low_sum", false),
            ("low_perc", false),
            ("high_perc", false),
            ("perc_of_total", false),
            ("target_delta_perc", false),
            ("base_col", false),
            ("base_breaks", true),
            ("base_range", true),
            ("base_cats", true),
        ]
        .iter()
        .zip(&columns)
        .map(|((name, nullable), column)| Field::new(*name, column.data_type().clone(), *nullable))
        .collect();

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}

/// Scores every segment of `model` against its binary target.
///
/// An unencoded model has no segments; the result is then an empty report
/// and a warning is logged.
#[instrument(skip_all, fields(target = %model.target().name()))]
pub fn calculate_dependence(model: &ModelData) -> Result<DependenceReport> {
    let target = model.target();
    let mut report = DependenceReport {
        target: target.name().to_string(),
        row_count: model.num_rows(),
        rows: Vec::new(),
    };

    let Ok(encoding) = model.encoding_for("calculate_dependence") else {
        warn!("features do not seem to be converted to binary format yet, dependence report is empty");
        return Ok(report);
    };

    let row_count = report.row_count as f64;
    let target_mean = stats::mean(target.raw()).unwrap_or(f64::NAN);

    for segment in encoding.segments().iter() {
        let total_sum = segment.size();
        let low_sum = stats::count_both(segment.values(), target.values());
        let low_perc = if total_sum > 0 {
            low_sum as f64 / total_sum as f64 * 100.0
        } else {
            f64::NAN
        };
        let segment_mean =
            stats::masked_mean(target.raw(), segment.values()).unwrap_or(f64::NAN);

        let mut row = DependenceRow {
            segment: segment.name().to_string(),
            total_sum,
            low_sum,
            low_perc,
            high_perc: 100.0 - low_perc,
            perc_of_total: total_sum as f64 / row_count * 100.0,
            target_delta_perc: (segment_mean / target_mean - 1.0) * 100.0,
            base_col: segment.provenance().key(),
            base_breaks: None,
            base_range: None,
            base_cats: None,
            provenance: segment.provenance().clone(),
        };
        enrich(model, &mut row)?;
        report.rows.push(row);
    }

    report
        .rows
        .sort_by(|a, b| compare_desc_nan_last(a.low_perc, b.low_perc).then(b.total_sum.cmp(&a.total_sum)));

    info!(segments = report.len(), "calculated dependence");
    Ok(report)
}

fn enrich(model: &ModelData, row: &mut DependenceRow) -> Result<()> {
    let Provenance::BaseColumn(column) = &row.provenance else {
        return Ok(());
    };
    if model.is_numeric(column) {
        row.base_range = stats::min_max(model.numeric_values(column)?).map(|(min, max)| [min, max]);
        row.base_breaks = model
            .bins()?
            .get(column)
            .map(|bins| bins.breaks().to_vec());
    } else if model.is_categorical(column) {
        let labels = model.categorical_labels(column)?;
        row.base_cats = Some(
            named_labels(labels)
                .into_iter()
                .map(|(_, name)| name)
                .collect(),
        );
    }
    Ok(())
}

fn compare_desc_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
