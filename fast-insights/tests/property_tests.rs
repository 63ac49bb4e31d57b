//! Property-based tests for encoding, combination and dependence invariants.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use fast_insights::binning::{BinTable, ColumnBins};
use fast_insights::calculations::calculate_dependence;
use fast_insights::model::{ModelConfig, ModelData, Provenance};
use proptest::prelude::*;

fn table(colors: &[Option<&str>], values: &[Option<f64>], target: &[f64]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("color", DataType::Utf8, true),
        Field::new("value", DataType::Float64, true),
        Field::new("target", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(colors.to_vec())) as ArrayRef,
            Arc::new(Float64Array::from(values.to_vec())),
            Arc::new(Float64Array::from(target.to_vec())),
        ],
    )
    .unwrap()
}

fn model(batch: RecordBatch, breaks: &[f64]) -> ModelData {
    let mut model = ModelData::builder(batch, "target")
        .categorical(["color"])
        .numeric(["value"])
        .config(ModelConfig::default().with_exclude_zero_variance(false))
        .build()
        .unwrap();
    let bins = BinTable::new().with_column("value", ColumnBins::from_breaks(breaks, true));
    model.convert_to_binary(Some(bins)).unwrap();
    model
}

/// Rows of three parallel columns plus a set of break points.
fn rows() -> impl Strategy<Value = (Vec<Option<&'static str>>, Vec<Option<f64>>, Vec<f64>, Vec<f64>)> {
    (2usize..40).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::option::weighted(0.9, prop::sample::select(vec!["red", "green", "blue"])), n),
            prop::collection::vec(prop::option::weighted(0.9, -100i32..100), n)
                .prop_map(|v| v.into_iter().map(|x| x.map(f64::from)).collect::<Vec<_>>()),
            prop::collection::vec(0i32..1000, n)
                .prop_map(|v| v.into_iter().map(f64::from).collect::<Vec<_>>()),
            prop::collection::vec(-100i32..100, 0..5)
                .prop_map(|v| v.into_iter().map(f64::from).collect::<Vec<_>>()),
        )
    })
}

fn row_sum<'a>(columns: impl Iterator<Item = &'a BooleanArray>, row: usize) -> usize {
    columns.filter(|c| c.value(row)).count()
}

proptest! {
    #[test]
    fn prop_one_hot_rows_sum_to_one((colors, values, target, breaks) in rows()) {
        let model = model(table(&colors, &values, &target), &breaks);
        let segments = model.segments().unwrap();
        for row in 0..colors.len() {
            let colors = segments.with_base("color").map(|s| s.values());
            prop_assert_eq!(row_sum(colors, row), 1);
        }
    }

    #[test]
    fn prop_bins_partition_rows((colors, values, target, breaks) in rows()) {
        let model = model(table(&colors, &values, &target), &breaks);
        let segments = model.segments().unwrap();
        let total: u64 = segments.with_base("value").map(|s| s.size()).sum();
        prop_assert_eq!(total as usize, values.len());
        for row in 0..values.len() {
            let bins = segments.with_base("value").map(|s| s.values());
            prop_assert_eq!(row_sum(bins, row), 1);
        }
    }

    #[test]
    fn prop_combinations_are_conjunctions((colors, values, target, breaks) in rows()) {
        let mut model = model(table(&colors, &values, &target), &breaks);
        model.construct_combs_up_to(2).unwrap();
        let segments = model.segments().unwrap();
        for segment in segments.iter() {
            let Provenance::Combination(parts) = segment.provenance() else {
                continue;
            };
            prop_assert_eq!(parts.len(), 2);
            let a = segments.get(&parts[0]).unwrap().values();
            let b = segments.get(&parts[1]).unwrap().values();
            for row in 0..colors.len() {
                prop_assert_eq!(segment.values().value(row), a.value(row) && b.value(row));
            }
        }
    }

    #[test]
    fn prop_dependence_is_sorted((colors, values, target, breaks) in rows()) {
        let report = calculate_dependence(&model(table(&colors, &values, &target), &breaks)).unwrap();
        let scored: Vec<f64> = report.rows.iter().map(|r| r.low_perc).take_while(|p| !p.is_nan()).collect();
        prop_assert!(scored.windows(2).all(|w| w[0] >= w[1]));
        for row in &report.rows {
            prop_assert!(row.low_sum <= row.total_sum);
            if !row.low_perc.is_nan() {
                prop_assert!((row.low_perc + row.high_perc - 100.0).abs() < 1e-9);
            }
        }
    }
}
