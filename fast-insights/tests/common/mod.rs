//! Shared tables for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use fast_insights::binning::{BinTable, ColumnBins};

/// Six cars with a color, an age, a top speed (one missing) and their sales.
pub fn cars() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("color", DataType::Utf8, true),
        Field::new("age", DataType::Int64, true),
        Field::new("max_speed", DataType::Float64, true),
        Field::new("num_of_sales", DataType::Float64, false),
        Field::new("year_of_sale", DataType::Int64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["green", "red", "red", "red", "green", "red"])) as ArrayRef,
            Arc::new(Int64Array::from(vec![10, 20, 30, 2, 5, 15])),
            Arc::new(Float64Array::from(vec![100.0, 60.0, 80.0, 110.0, f64::NAN, 80.0])),
            Arc::new(Float64Array::from(vec![45.0, 50.0, 50.0, 101.0, 99.0, 65.0])),
            Arc::new(Int64Array::from(vec![2000, 2000, 2000, 2002, 2003, 2002])),
        ],
    )
    .unwrap()
}

/// Fixed bins for the numeric car columns.
pub fn cars_bins() -> BinTable {
    BinTable::new()
        .with_column("age", ColumnBins::from_breaks(&[10.0, 20.0], true))
        .with_column("max_speed", ColumnBins::from_breaks(&[80.0], true))
}

/// The cars table as CSV text.
pub const CARS_CSV: &str = "\
color,age,max_speed,num_of_sales,year_of_sale
green,10,100,45,2000
red,20,60,50,2000
red,30,80,50,2000
red,2,110,101,2002
green,5,,99,2003
red,15,80,65,2002
";
