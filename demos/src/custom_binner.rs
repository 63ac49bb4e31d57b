//! Plugging a custom binning strategy into the pipeline.
//!
//! Any closure with the `Binner` signature can stand in for a strategy, for
//! example a client of a supervised binning service. Manual breaks are
//! forwarded to the strategy and always take precedence.
//!
//! Run with:
//! ```bash
//! cargo run --example custom_binner
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use fast_insights::binning::{BinnerError, ManualBreaks};
use fast_insights::prelude::*;
use tracing::info;

/// Cuts every column at round multiples of ten within its range.
fn decade_binner(
    data: &RecordBatch,
    target: &str,
    manual: &ManualBreaks,
) -> std::result::Result<BinTable, BinnerError> {
    let mut table = BinTable::new();
    for field in data.schema().fields() {
        let name = field.name();
        if name == target {
            continue;
        }
        let breaks = match manual.get(name) {
            Some(breaks) => breaks.clone(),
            None => {
                let column = data
                    .column_by_name(name)
                    .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
                    .ok_or_else(|| format!("column {name} is not Float64"))?;
                let (min, max) = fast_insights::stats::min_max(column).unwrap_or((0.0, 0.0));
                let first = (min / 10.0).floor() as i64 + 1;
                let last = (max / 10.0).ceil() as i64;
                (first..last).map(|d| d as f64 * 10.0).collect()
            }
        };
        info!(column = %name, ?breaks, "binned");
        table.insert(name.clone(), ColumnBins::from_breaks(&breaks, true));
    }
    Ok(table)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_target(false).init();

    let schema = Arc::new(Schema::new(vec![
        Field::new("color", DataType::Utf8, false),
        Field::new("age", DataType::Float64, false),
        Field::new("max_speed", DataType::Float64, true),
        Field::new("num_of_sales", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["green", "red", "red", "red", "green", "red"])) as ArrayRef,
            Arc::new(Float64Array::from(vec![10.0, 20.0, 30.0, 2.0, 5.0, 15.0])),
            Arc::new(Float64Array::from(vec![Some(100.0), Some(60.0), Some(80.0), Some(110.0), None, Some(80.0)])),
            Arc::new(Float64Array::from(vec![45.0, 50.0, 50.0, 101.0, 99.0, 65.0])),
        ],
    )?;

    let mut model = ModelData::builder(batch, "num_of_sales")
        .categorical(["color"])
        .numeric(["age", "max_speed"])
        .config(ModelConfig::default().with_target(TargetSpec::Mean))
        .build()?;

    let manual: ManualBreaks = HashMap::from([("max_speed".to_string(), vec![90.0])]);
    let bins = model.make_bins(&decade_binner, Some(&manual))?;
    model.convert_to_binary(Some(bins))?;
    model.construct_combs_up_to(2)?;

    let report = calculate_dependence(&model)?;
    let json = JsonFormatter::with_config(FormatterConfig::minimal()).with_pretty(true);
    println!("{}", json.format_report(&report)?);
    Ok(())
}
