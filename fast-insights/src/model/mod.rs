//! The dataset model.
//!
//! [`ModelData`] owns the raw table, its column taxonomy and the binarized
//! target. Encoding ([`ModelData::convert_to_binary`]) derives indicator
//! segments from it; combination construction adds conjunctions of those
//! segments. All derived state lives in an [`EncodingState`] that is rebuilt
//! from scratch on every encoding call.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use arrow::array::{ArrayRef, Float64Array, StringArray};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use fast_insights::binning::{BinTable, ColumnBins};
//! use fast_insights::model::{ModelConfig, ModelData};
//!
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("color", DataType::Utf8, false),
//!     Field::new("age", DataType::Float64, false),
//!     Field::new("num_of_sales", DataType::Float64, false),
//! ]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![
//!         Arc::new(StringArray::from(vec!["green", "red", "red", "red"])) as ArrayRef,
//!         Arc::new(Float64Array::from(vec![10.0, 20.0, 30.0, 2.0])),
//!         Arc::new(Float64Array::from(vec![45.0, 50.0, 101.0, 99.0])),
//!     ],
//! )
//! .unwrap();
//!
//! let mut model = ModelData::builder(batch, "num_of_sales")
//!     .categorical(["color"])
//!     .numeric(["age"])
//!     .config(ModelConfig::default())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(model.target().pivot(), Some(74.5));
//! let bins = BinTable::new().with_column("age", ColumnBins::from_breaks(&[15.0], true));
//! model.convert_to_binary(Some(bins)).unwrap();
//! assert!(model.segments().unwrap().contains("color_red"));
//! assert!(model.segments().unwrap().contains("age_[15.0,inf)"));
//! ```

pub mod columns;
pub mod combinations;
pub mod config;
pub mod encoder;
pub mod segments;
pub mod target;

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int8Array};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use crate::binning::{BinTable, Binner, ManualBreaks};
use crate::error::{InsightError, Result};
use crate::stats;

pub use config::{ModelConfig, TargetSpec};
pub use segments::{combination_key, Provenance, ProvenanceMap, Segment, SegmentTable};
pub use target::BinaryTarget;

/// Derived state of a model.
#[derive(Debug, Clone, Default)]
pub enum EncodingState {
    /// No indicator columns exist yet.
    #[default]
    Unencoded,
    /// Indicator columns built by the latest encoding pass.
    Encoded(Encoding),
}

/// Everything one encoding pass produces.
#[derive(Debug, Clone, Default)]
pub struct Encoding {
    pub(crate) segments: SegmentTable,
    pub(crate) bins: BinTable,
}

impl Encoding {
    /// Indicator segments in creation order.
    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    /// Bin table used for numeric columns.
    pub fn bins(&self) -> &BinTable {
        &self.bins
    }
}

/// Validated dataset with its binarized target and derived segments.
#[derive(Debug, Clone)]
pub struct ModelData {
    /// Raw table restricted to the target and surviving features
    base: RecordBatch,
    categorical: Vec<String>,
    numeric: Vec<String>,
    /// Numeric features normalized to Float64
    numeric_values: IndexMap<String, Float64Array>,
    /// Categorical features rendered as labels
    categorical_labels: IndexMap<String, Vec<Option<String>>>,
    target: BinaryTarget,
    config: ModelConfig,
    state: EncodingState,
}

impl ModelData {
    /// Starts building a model over `batch` with target column `target`.
    pub fn builder(batch: RecordBatch, target: impl Into<String>) -> ModelDataBuilder {
        ModelDataBuilder::new(vec![batch], target)
    }

    /// Starts building a model over several batches sharing one schema.
    pub fn from_batches(batches: Vec<RecordBatch>, target: impl Into<String>) -> ModelDataBuilder {
        ModelDataBuilder::new(batches, target)
    }

    /// Raw table (target and surviving features).
    pub fn base_table(&self) -> &RecordBatch {
        &self.base
    }

    /// Surviving categorical columns.
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical
    }

    /// Surviving numeric columns.
    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric
    }

    /// Whether `column` is a categorical feature.
    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical_labels.contains_key(column)
    }

    /// Whether `column` is a numeric feature.
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_values.contains_key(column)
    }

    /// Numeric feature values as `Float64`.
    pub fn numeric_values(&self, column: &str) -> Result<&Float64Array> {
        self.numeric_values
            .get(column)
            .ok_or_else(|| InsightError::ColumnNotFound {
                column: column.to_string(),
            })
    }

    /// Categorical feature labels (`None` for nulls).
    pub fn categorical_labels(&self, column: &str) -> Result<&[Option<String>]> {
        self.categorical_labels
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| InsightError::ColumnNotFound {
                column: column.to_string(),
            })
    }

    /// The raw and binarized target.
    pub fn target(&self) -> &BinaryTarget {
        &self.target
    }

    /// Model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.base.num_rows()
    }

    /// Current derived state.
    pub fn state(&self) -> &EncodingState {
        &self.state
    }

    /// Whether an encoding pass has run.
    pub fn is_encoded(&self) -> bool {
        matches!(self.state, EncodingState::Encoded(_))
    }

    /// The current encoding, or a state error naming `operation`.
    pub(crate) fn encoding_for(&self, operation: &str) -> Result<&Encoding> {
        match &self.state {
            EncodingState::Encoded(encoding) => Ok(encoding),
            EncodingState::Unencoded => Err(InsightError::state(format!(
                "Can only use {operation}() when data is converted to binary format"
            ))),
        }
    }

    pub(crate) fn encoding_mut_for(&mut self, operation: &str) -> Result<&mut Encoding> {
        match &mut self.state {
            EncodingState::Encoded(encoding) => Ok(encoding),
            EncodingState::Unencoded => Err(InsightError::state(format!(
                "Can only use {operation}() when data is converted to binary format"
            ))),
        }
    }

    /// Segments of the current encoding.
    pub fn segments(&self) -> Result<&SegmentTable> {
        Ok(&self.encoding_for("segments")?.segments)
    }

    /// Bins of the current encoding.
    pub fn bins(&self) -> Result<&BinTable> {
        Ok(&self.encoding_for("bins")?.bins)
    }

    /// Provenance of every segment; empty before encoding.
    pub fn provenance_map(&self) -> ProvenanceMap {
        match &self.state {
            EncodingState::Encoded(encoding) => encoding.segments.provenance_map(),
            EncodingState::Unencoded => ProvenanceMap::new(),
        }
    }

    /// Materializes the working table.
    ///
    /// Columns are the raw target, the binary target and every segment, the
    /// last two as `Int8` 0/1 values.
    pub fn binary_table(&self) -> Result<RecordBatch> {
        let mut fields = vec![
            Field::new(self.target.raw_name(), DataType::Float64, true),
            Field::new(self.target.name(), DataType::Int8, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(self.target.raw().clone()),
            Arc::new(to_int8(self.target.values())),
        ];
        if let EncodingState::Encoded(encoding) = &self.state {
            for segment in encoding.segments.iter() {
                fields.push(Field::new(segment.name(), DataType::Int8, false));
                columns.push(Arc::new(to_int8(segment.values())));
            }
        }
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }

    /// Asks `binner` for bins of every numeric feature.
    ///
    /// The binner sees the numeric features as `Float64` plus the binary
    /// target as `Int8`. Returns an empty table when there are no numeric
    /// features.
    #[instrument(skip_all, fields(numeric = self.numeric.len()))]
    pub fn make_bins<B>(&self, binner: &B, manual_breaks: Option<&ManualBreaks>) -> Result<BinTable>
    where
        B: Binner + ?Sized,
    {
        if self.numeric.is_empty() {
            warn!("model has no numeric columns, nothing to bin");
            return Ok(BinTable::new());
        }
        if self.is_encoded() {
            warn!("features are already converted to binary format, binning might be futile");
        }

        let mut fields = Vec::with_capacity(self.numeric.len() + 1);
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.numeric.len() + 1);
        for (name, values) in &self.numeric_values {
            fields.push(Field::new(name, DataType::Float64, true));
            columns.push(Arc::new(values.clone()));
        }
        fields.push(Field::new(self.target.name(), DataType::Int8, false));
        columns.push(Arc::new(to_int8(self.target.values())));
        let input = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;

        let empty = ManualBreaks::new();
        let bins = binner
            .bin(&input, self.target.name(), manual_breaks.unwrap_or(&empty))
            .map_err(|e| InsightError::dependency_with_source("binning collaborator failed", e))?;
        bins.validate()?;

        debug!(columns = bins.len(), "received bins");
        Ok(bins)
    }
}

pub(crate) fn to_int8(values: &BooleanArray) -> Int8Array {
    values.iter().map(|v| Some(i8::from(v.unwrap_or(false)))).collect()
}

/// Builder for [`ModelData`].
#[derive(Debug, Clone)]
pub struct ModelDataBuilder {
    batches: Vec<RecordBatch>,
    target: String,
    categorical: Vec<String>,
    numeric: Vec<String>,
    config: ModelConfig,
}

impl ModelDataBuilder {
    fn new(batches: Vec<RecordBatch>, target: impl Into<String>) -> Self {
        Self {
            batches,
            target: target.into(),
            categorical: Vec::new(),
            numeric: Vec::new(),
            config: ModelConfig::default(),
        }
    }

    /// Declares categorical columns.
    pub fn categorical<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_unique(&mut self.categorical, columns);
        self
    }

    /// Declares numeric columns.
    pub fn numeric<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        push_unique(&mut self.numeric, columns);
        self
    }

    /// Sets the model configuration.
    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the target binarization rule.
    pub fn target_spec(mut self, target: TargetSpec) -> Self {
        self.config.target = target;
        self
    }

    /// Validates the inputs, normalizes types, prunes degenerate columns and
    /// binarizes the target.
    #[instrument(skip(self), fields(target = %self.target))]
    pub fn build(self) -> Result<ModelData> {
        let Self {
            batches,
            target,
            mut categorical,
            mut numeric,
            config,
        } = self;
        config.validate()?;

        let base = single_batch(batches)?;
        let schema = base.schema();

        if schema.index_of(&target).is_err() {
            return Err(InsightError::validation(format!(
                "target column '{target}' not found in data"
            )));
        }
        if categorical.contains(&target) || numeric.contains(&target) {
            return Err(InsightError::validation(format!(
                "target column '{target}' must not be listed as a feature"
            )));
        }

        let categorical_set: HashSet<&String> = categorical.iter().collect();
        let common: Vec<&str> = numeric
            .iter()
            .filter(|c| categorical_set.contains(c))
            .map(String::as_str)
            .collect();
        if !common.is_empty() {
            return Err(InsightError::validation(format!(
                "categorical and numeric columns must not have common elements: {common:?}"
            )));
        }

        let absent: Vec<&str> = categorical
            .iter()
            .chain(&numeric)
            .filter(|c| schema.index_of(c).is_err())
            .map(String::as_str)
            .collect();
        if !absent.is_empty() {
            return Err(InsightError::validation(format!(
                "declared column(s) not found in data: {absent:?}"
            )));
        }

        let unmentioned: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .filter(|name| {
                *name != target
                    && !categorical.iter().any(|c| c == name)
                    && !numeric.iter().any(|c| c == name)
            })
            .collect();
        if !unmentioned.is_empty() {
            return Err(InsightError::validation(format!(
                "found {} column(s) in data that are not specified as categorical or numeric: {unmentioned:?}",
                unmentioned.len()
            )));
        }

        let mut numeric_values = IndexMap::with_capacity(numeric.len());
        for name in &numeric {
            let values = columns::coerce_numeric(name, base.column_by_name(name).ok_or_else(
                || InsightError::ColumnNotFound {
                    column: name.clone(),
                },
            )?)?;
            numeric_values.insert(name.clone(), values);
        }
        let mut categorical_labels = IndexMap::with_capacity(categorical.len());
        for name in &categorical {
            let array = base
                .column_by_name(name)
                .ok_or_else(|| InsightError::ColumnNotFound {
                    column: name.clone(),
                })?;
            categorical_labels.insert(name.clone(), columns::category_labels(array)?);
        }

        if config.exclude_zero_variance {
            categorical_labels.retain(|name, labels| {
                let keep = columns::distinct_non_null(labels) >= 2;
                if !keep {
                    warn!(column = %name, "feature was removed before the analysis, because it has < 2 unique values");
                }
                keep
            });
            numeric_values.retain(|name, values| {
                let keep = stats::distinct_count(values) >= 2;
                if !keep {
                    warn!(column = %name, "feature was removed before the analysis, because it has zero variance");
                }
                keep
            });
            categorical.retain(|c| categorical_labels.contains_key(c));
            numeric.retain(|c| numeric_values.contains_key(c));
        }

        let keep: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                let name = f.name().as_str();
                name == target
                    || categorical_labels.contains_key(name)
                    || numeric_values.contains_key(name)
            })
            .map(|(i, _)| i)
            .collect();
        let base = base.project(&keep)?;

        let raw_target = base
            .column_by_name(&target)
            .ok_or_else(|| InsightError::ColumnNotFound {
                column: target.clone(),
            })?;
        let raw_target = columns::coerce_numeric(&target, raw_target)?;
        let binary_target = BinaryTarget::compute(&target, raw_target, &config.target)?;

        info!(
            rows = base.num_rows(),
            categorical = categorical.len(),
            numeric = numeric.len(),
            binary_target = %binary_target.name(),
            "model data prepared"
        );

        Ok(ModelData {
            base,
            categorical,
            numeric,
            numeric_values,
            categorical_labels,
            target: binary_target,
            config,
            state: EncodingState::Unencoded,
        })
    }
}

fn push_unique<I, S>(into: &mut Vec<String>, columns: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for column in columns {
        let column = column.into();
        if !into.contains(&column) {
            into.push(column);
        }
    }
}

fn single_batch(batches: Vec<RecordBatch>) -> Result<RecordBatch> {
    let first = batches.first().ok_or_else(|| {
        InsightError::validation("input is not tabular: no record batches supplied")
    })?;
    let schema = first.schema();
    if batches.len() == 1 {
        return Ok(first.clone());
    }
    if batches.iter().any(|b| b.schema() != schema) {
        return Err(InsightError::validation(
            "input is not tabular: record batches have different schemas",
        ));
    }
    Ok(concat_batches(&schema, &batches)?)
}
