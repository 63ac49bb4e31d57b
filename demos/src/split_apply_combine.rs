//! Running the same analysis per year of sale and averaging the results.
//!
//! Each year is analysed independently with shared bins. Years where the
//! binarized target takes a single value are skipped with a warning.
//!
//! Run with:
//! ```bash
//! cargo run --example split_apply_combine
//! ```

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use fast_insights::logging::setup::{init_logging, LoggingConfig};
use fast_insights::prelude::*;

fn cars() -> std::result::Result<RecordBatch, arrow::error::ArrowError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("color", DataType::Utf8, false),
        Field::new("age", DataType::Int64, false),
        Field::new("max_speed", DataType::Float64, true),
        Field::new("num_of_sales", DataType::Float64, false),
        Field::new("year_of_sale", DataType::Int64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec![
                "green", "red", "red", "red", "green", "red", "green", "red",
            ])) as ArrayRef,
            Arc::new(Int64Array::from(vec![10, 20, 30, 2, 5, 15, 7, 12])),
            Arc::new(Float64Array::from(vec![
                Some(100.0),
                Some(60.0),
                Some(80.0),
                Some(110.0),
                None,
                Some(80.0),
                Some(80.0),
                Some(80.0),
            ])),
            Arc::new(Float64Array::from(vec![45.0, 50.0, 50.0, 101.0, 99.0, 65.0, 70.0, 30.0])),
            Arc::new(Int64Array::from(vec![2000, 2000, 2000, 2001, 2001, 2001, 2002, 2002])),
        ],
    )
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging(LoggingConfig::default())?;

    // every column must be declared; the split dimension is pruned per partition
    let mut model = ModelData::builder(cars()?, "num_of_sales")
        .categorical(["color", "year_of_sale"])
        .numeric(["age", "max_speed"])
        .build()?;

    let bins = model.make_bins(&QuantileBinner::new(2), None)?;
    model.convert_to_binary(Some(bins.clone()))?;
    println!("{}", HumanFormatter::new().format_report(&calculate_dependence(&model)?)?);

    let mut sac = SplitApplyCombine::new(model, QuantileBinner::new(2)).with_global_bins(bins);
    sac.split("year_of_sale")?;
    sac.run()?;

    let combined = sac.combine(&[(DependenceMetric::TotalSum, 0.0)]);
    println!("combined {} experiments", combined.experiments);
    for row in &combined.rows {
        println!(
            "{:<28} low {:>6.1}%  share {:>6.1}%  in {} experiment(s)",
            row.segment, row.low_perc, row.perc_of_total, row.number_of_experiments
        );
    }

    Ok(())
}
