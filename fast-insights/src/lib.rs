//! # fast-insights - Segment dependence analysis for Rust
//!
//! fast-insights takes a tabular dataset with a numeric (or already binary)
//! target and a mix of categorical and numeric features, and answers a simple
//! question: which categories, value ranges and combinations of them go along
//! with a *worse* target?
//!
//! ## Overview
//!
//! The pipeline works on in-memory Arrow [`RecordBatch`](arrow::record_batch::RecordBatch)es:
//!
//! 1. [`ModelData`](model::ModelData) validates the column taxonomy, prunes
//!    degenerate columns and binarizes the target against a pivot (median,
//!    another quantile, or the mean).
//! 2. A [`Binner`](binning::Binner) proposes interval bins for the numeric
//!    features.
//! 3. [`convert_to_binary`](model::ModelData::convert_to_binary) turns every
//!    category and every bin into a 0/1 segment, recording where each segment
//!    came from.
//! 4. Optional combination passes add conjunctions of segments.
//! 5. [`calculate_dependence`](calculations::calculate_dependence) scores each
//!    segment and [`compare_intervals`](calculations::compare_intervals)
//!    projects what-if substitutions between sibling segments.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use arrow::array::{ArrayRef, Float64Array, StringArray};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use fast_insights::prelude::*;
//!
//! # fn main() -> fast_insights::error::Result<()> {
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("color", DataType::Utf8, false),
//!     Field::new("age", DataType::Float64, false),
//!     Field::new("num_of_sales", DataType::Float64, false),
//! ]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![
//!         Arc::new(StringArray::from(vec!["green", "red", "red", "red", "green", "red"])) as ArrayRef,
//!         Arc::new(Float64Array::from(vec![10.0, 20.0, 30.0, 2.0, 5.0, 15.0])),
//!         Arc::new(Float64Array::from(vec![45.0, 50.0, 50.0, 101.0, 99.0, 65.0])),
//!     ],
//! )?;
//!
//! let mut model = ModelData::builder(batch, "num_of_sales")
//!     .categorical(["color"])
//!     .numeric(["age"])
//!     .build()?;
//!
//! let bins = model.make_bins(&QuantileBinner::new(2), None)?;
//! model.convert_to_binary(Some(bins))?;
//! model.construct_combs_up_to(2)?;
//!
//! let report = calculate_dependence(&model)?;
//! let red = report.get("color_red").unwrap();
//! assert_eq!(red.total_sum, 4);
//!
//! println!("{}", HumanFormatter::new().format_report(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`model`**: the dataset model, target binarization, encoding and
//!   combination construction
//! - **`binning`**: bin tables, the `Binner` contract and reference strategies
//! - **`calculations`**: dependence statistics and the interval comparator
//! - **`experiments`**: split-apply-combine over partitions of a table
//! - **`formatters`**: JSON, human readable and Markdown reports
//! - **`sources`**: CSV loading
//! - **`logging`**: `tracing` subscriber setup
//!
//! ## Logging
//!
//! Every pipeline step emits `tracing` events: warnings for degenerate but
//! recoverable situations (pruned columns, skipped partitions, large
//! combination counts), info for pass progress. Install a subscriber with
//! [`logging::setup::init_logging`] or your own.

pub mod binning;
pub mod calculations;
pub mod error;
pub mod experiments;
pub mod formatters;
pub mod logging;
pub mod model;
pub mod prelude;
pub mod sources;
pub mod stats;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
