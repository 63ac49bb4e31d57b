//! Common test fixtures for dependence analysis scenarios.
//!
//! The `cars` table is the canonical small dataset: six rows, one categorical
//! feature, two numeric features (one with a missing value) and a sales
//! target whose median is 57.5.

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::binning::{BinTable, ColumnBins};

/// Raw cars table: `color`, `age`, `max_speed`, `num_of_sales`.
pub fn cars_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("color", DataType::Utf8, true),
        Field::new("age", DataType::Int64, true),
        Field::new("max_speed", DataType::Float64, true),
        Field::new("num_of_sales", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![
            "green", "red", "red", "red", "green", "red",
        ])),
        Arc::new(Int64Array::from(vec![10, 20, 30, 2, 5, 15])),
        Arc::new(Float64Array::from(vec![
            100.0,
            60.0,
            80.0,
            110.0,
            f64::NAN,
            80.0,
        ])),
        Arc::new(Float64Array::from(vec![45.0, 50.0, 50.0, 101.0, 99.0, 65.0])),
    ];

    RecordBatch::try_new(schema, columns).expect("cars fixture schema matches its columns")
}

/// Categorical columns of [`cars_batch`].
pub fn cars_categorical() -> Vec<&'static str> {
    vec!["color"]
}

/// Numeric columns of [`cars_batch`].
pub fn cars_numeric() -> Vec<&'static str> {
    vec!["age", "max_speed"]
}

/// Hand-made bins for the cars table.
///
/// `age` splits at 10 and 20; `max_speed` splits at 80.
pub fn cars_bins() -> BinTable {
    BinTable::new()
        .with_column("age", ColumnBins::from_breaks(&[10.0, 20.0], true))
        .with_column("max_speed", ColumnBins::from_breaks(&[80.0], true))
}

/// A table with constant columns that pruning must drop.
pub fn degenerate_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("brand", DataType::Utf8, false),
        Field::new("color", DataType::Utf8, false),
        Field::new("doors", DataType::Float64, false),
        Field::new("age", DataType::Float64, false),
        Field::new("num_of_sales", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["acme", "acme", "acme", "acme"])),
        Arc::new(StringArray::from(vec!["red", "green", "red", "green"])),
        Arc::new(Float64Array::from(vec![4.0, 4.0, 4.0, 4.0])),
        Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0])),
        Arc::new(Float64Array::from(vec![10.0, 20.0, 30.0, 40.0])),
    ];

    RecordBatch::try_new(schema, columns).expect("degenerate fixture schema matches its columns")
}
