//! Split-apply-combine over partitions of a table.
//!
//! A [`SplitApplyCombine`] splits the rows of a prepared model by the values
//! of one dimension, runs an independent experiment (model, bins, encoding,
//! dependence) on every partition, then averages the per-segment statistics
//! over the partitions in which each segment appears. Partitions share
//! nothing but the optional global bins.

use std::cmp::Ordering;

use arrow::array::BooleanArray;
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::binning::{BinTable, Binner};
use crate::calculations::{calculate_dependence, DependenceMetric, DependenceReport};
use crate::error::{InsightError, Result};
use crate::model::columns::{category_labels, coerce_numeric, distinct_non_null, named_labels};
use crate::model::{ModelConfig, ModelData};
use crate::stats;

/// A table with its degenerate columns removed.
#[derive(Debug, Clone)]
pub struct PrunedTable {
    /// Remaining columns
    pub batch: RecordBatch,
    /// Remaining categorical columns
    pub categorical: Vec<String>,
    /// Remaining numeric columns
    pub numeric: Vec<String>,
}

/// Drops categorical columns with fewer than 2 distinct values and numeric
/// columns with zero variance.
///
/// Declared columns that are absent from `batch` are ignored.
pub fn exclude_zero_variance(
    batch: &RecordBatch,
    categorical: &[String],
    numeric: &[String],
) -> Result<PrunedTable> {
    let mut dropped = Vec::new();
    let mut kept_categorical = Vec::new();
    let mut kept_numeric = Vec::new();

    for name in categorical {
        let Some(array) = batch.column_by_name(name) else {
            continue;
        };
        if distinct_non_null(&category_labels(array)?) < 2 {
            dropped.push(name.as_str());
        } else {
            kept_categorical.push(name.clone());
        }
    }
    for name in numeric {
        let Some(array) = batch.column_by_name(name) else {
            continue;
        };
        if stats::distinct_count(&coerce_numeric(name, array)?) < 2 {
            dropped.push(name.as_str());
        } else {
            kept_numeric.push(name.clone());
        }
    }

    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !dropped.contains(&f.name().as_str()))
        .map(|(i, _)| i)
        .collect();
    if !dropped.is_empty() {
        debug!(?dropped, "excluded zero variance columns");
    }

    Ok(PrunedTable {
        batch: batch.project(&keep)?,
        categorical: kept_categorical,
        numeric: kept_numeric,
    })
}

/// Everything one partition produced.
#[derive(Debug, Clone)]
pub struct Experiment {
    /// The encoded partition model
    pub model: ModelData,
    /// Bins the partition was encoded with
    pub bins: BinTable,
    /// Dependence statistics of the partition
    pub report: DependenceReport,
}

/// Runs the full pipeline on one partition.
///
/// Returns `Ok(None)` (with a warning) when the partition's binary target does
/// not take two distinct values. `shared_bins` replaces per-partition binning.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(rows = part.num_rows(), target = %target))]
pub fn run_experiment<B>(
    part: RecordBatch,
    target: &str,
    categorical: &[String],
    numeric: &[String],
    config: &ModelConfig,
    binner: &B,
    shared_bins: Option<&BinTable>,
) -> Result<Option<Experiment>>
where
    B: Binner + ?Sized,
{
    let mut model = ModelData::builder(part, target)
        .categorical(categorical.iter().cloned())
        .numeric(numeric.iter().cloned())
        .config(config.clone())
        .build()?;

    if model.target().distinct_count() != 2 {
        warn!("skipping experiment, number of distinct binary target values is not 2");
        return Ok(None);
    }

    let bins = match shared_bins {
        Some(bins) => bins.clone(),
        None => model.make_bins(binner, None)?,
    };
    model.convert_to_binary(Some(bins.clone()))?;
    let report = calculate_dependence(&model)?;

    Ok(Some(Experiment {
        model,
        bins,
        report,
    }))
}

/// Rows of one value of the split dimension.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Partition rows (target and features)
    pub batch: RecordBatch,
    /// Whether the partition takes part in [`SplitApplyCombine::run`]
    pub use_for_report: bool,
}

/// Averaged statistics of one segment across experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    /// Segment name
    pub segment: String,
    /// Base column, or combination key
    pub base_col: String,
    /// Mean segment size
    pub total_sum: f64,
    /// Mean count of worse outcomes
    pub low_sum: f64,
    /// Mean share of worse outcomes, in percent
    pub low_perc: f64,
    /// Mean share of better outcomes, in percent
    pub high_perc: f64,
    /// Mean segment share of the partition, in percent
    pub perc_of_total: f64,
    /// Mean target deviation, in percent
    pub target_delta_perc: f64,
    /// Experiments in which the segment survived filtering
    pub number_of_experiments: usize,
}

/// Result of [`SplitApplyCombine::combine`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedReport {
    /// Experiments that contributed
    pub experiments: usize,
    /// One row per segment, most "worse"-skewed first
    pub rows: Vec<CombinedRow>,
}

impl CombinedReport {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no segment is reported.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row of a segment.
    pub fn get(&self, segment: &str) -> Option<&CombinedRow> {
        self.rows.iter().find(|r| r.segment == segment)
    }
}

/// Split-apply-combine driver over a prepared model.
#[derive(Debug)]
pub struct SplitApplyCombine<B> {
    model: ModelData,
    binner: B,
    global_bins: Option<BinTable>,
    partitions: IndexMap<String, Partition>,
    experiments: IndexMap<String, Experiment>,
}

impl<B: Binner> SplitApplyCombine<B> {
    /// Wraps a model covering the whole table.
    pub fn new(model: ModelData, binner: B) -> Self {
        Self {
            model,
            binner,
            global_bins: None,
            partitions: IndexMap::new(),
            experiments: IndexMap::new(),
        }
    }

    /// Model over the whole table.
    pub fn model(&self) -> &ModelData {
        &self.model
    }

    /// Mutable access to the whole-table model (for encoding it).
    pub fn model_mut(&mut self) -> &mut ModelData {
        &mut self.model
    }

    /// Uses `bins` for every partition instead of binning each one.
    pub fn with_global_bins(mut self, bins: BinTable) -> Self {
        self.global_bins = Some(bins);
        self
    }

    /// Bins shared by all partitions, if any.
    pub fn global_bins(&self) -> Option<&BinTable> {
        self.global_bins.as_ref()
    }

    /// Partitions the rows by the values of `dimension`.
    ///
    /// Replaces any earlier split; rows with a missing value form the
    /// `missing` partition.
    #[instrument(skip(self))]
    pub fn split(&mut self, dimension: &str) -> Result<()> {
        let base = self.model.base_table();
        let array = base
            .column_by_name(dimension)
            .ok_or_else(|| InsightError::ColumnNotFound {
                column: dimension.to_string(),
            })?;
        let labels = category_labels(array)?;

        let mut partitions = IndexMap::new();
        for (label, value) in named_labels(&labels) {
            let mask: BooleanArray = labels.iter().map(|l| Some(*l == label)).collect();
            let batch = filter_record_batch(base, &mask)?;
            partitions.insert(
                value,
                Partition {
                    batch,
                    use_for_report: true,
                },
            );
        }

        self.partitions = partitions;
        self.experiments.clear();

        info!(partitions = self.partitions.len(), "split table");
        Ok(())
    }

    /// Partitions of the latest split.
    pub fn partitions(&self) -> &IndexMap<String, Partition> {
        &self.partitions
    }

    /// Excludes a partition from the run; returns `false` for unknown values.
    pub fn exclude_partition(&mut self, value: &str) -> bool {
        match self.partitions.get_mut(value) {
            Some(partition) => {
                partition.use_for_report = false;
                true
            }
            None => false,
        }
    }

    /// Runs one independent experiment per partition.
    #[instrument(skip(self), fields(partitions = self.partitions.len()))]
    pub fn run(&mut self) -> Result<()> {
        if self.partitions.is_empty() {
            return Err(InsightError::state("Can only use run() after split()"));
        }

        self.experiments.clear();
        let target = self.model.target().raw_name().to_string();
        let config = self.model.config().clone();

        for (value, partition) in &self.partitions {
            if !partition.use_for_report {
                debug!(partition = %value, "partition excluded from the report");
                continue;
            }
            let pruned = exclude_zero_variance(
                &partition.batch,
                self.model.categorical_columns(),
                self.model.numeric_columns(),
            )?;
            let experiment = run_experiment(
                pruned.batch,
                &target,
                &pruned.categorical,
                &pruned.numeric,
                &config,
                &self.binner,
                self.global_bins.as_ref(),
            )?;
            match experiment {
                Some(experiment) => {
                    self.experiments.insert(value.clone(), experiment);
                }
                None => warn!(partition = %value, "experiment returned no result, skipping this part"),
            }
        }

        info!(experiments = self.experiments.len(), "experiments finished");
        Ok(())
    }

    /// Experiments of the latest run, by partition value.
    pub fn experiments(&self) -> &IndexMap<String, Experiment> {
        &self.experiments
    }

    /// Averages every statistic per segment over the experiments.
    ///
    /// Each experiment's rows are first filtered by `thresholds` (metric
    /// strictly above value). A segment's average only counts the experiments
    /// in which it survived.
    pub fn combine(&self, thresholds: &[(DependenceMetric, f64)]) -> CombinedReport {
        if self.experiments.is_empty() {
            warn!("no experiments to combine");
            return CombinedReport::default();
        }

        let provenance = self.model.provenance_map();
        let mut totals: IndexMap<String, CombinedRow> = IndexMap::new();

        for experiment in self.experiments.values() {
            for row in experiment.report.filter(thresholds).rows {
                let entry = totals
                    .entry(row.segment.clone())
                    .or_insert_with(|| CombinedRow {
                        segment: row.segment.clone(),
                        base_col: provenance
                            .get(&row.segment)
                            .map(|p| p.key())
                            .unwrap_or_else(|| row.base_col.clone()),
                        total_sum: 0.0,
                        low_sum: 0.0,
                        low_perc: 0.0,
                        high_perc: 0.0,
                        perc_of_total: 0.0,
                        target_delta_perc: 0.0,
                        number_of_experiments: 0,
                    });
                entry.total_sum += row.total_sum as f64;
                entry.low_sum += row.low_sum as f64;
                entry.low_perc += row.low_perc;
                entry.high_perc += row.high_perc;
                entry.perc_of_total += row.perc_of_total;
                entry.target_delta_perc += row.target_delta_perc;
                entry.number_of_experiments += 1;
            }
        }

        let mut rows: Vec<CombinedRow> = totals
            .into_values()
            .map(|mut row| {
                let n = row.number_of_experiments as f64;
                row.total_sum /= n;
                row.low_sum /= n;
                row.low_perc /= n;
                row.high_perc /= n;
                row.perc_of_total /= n;
                row.target_delta_perc /= n;
                row
            })
            .collect();
        rows.sort_by(|a, b| match (a.low_perc.is_nan(), b.low_perc.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => b.low_perc.total_cmp(&a.low_perc),
        });

        CombinedReport {
            experiments: self.experiments.len(),
            rows,
        }
    }
}
