//! End-to-end tests of the dependence pipeline on the cars table.

mod common;

use std::io::Write;

use arrow::array::{Array, AsArray};
use arrow::datatypes::Int8Type;
use common::{cars, cars_bins, CARS_CSV};
use fast_insights::calculations::CentralMetric;
use fast_insights::experiments::SplitApplyCombine;
use fast_insights::formatters::MarkdownFormatter;
use fast_insights::prelude::*;
use fast_insights::sources::read_csv;

fn cars_model() -> ModelData {
    ModelData::builder(cars(), "num_of_sales")
        .categorical(["color"])
        .numeric(["age", "max_speed", "year_of_sale"])
        .build()
        .unwrap()
}

fn encoded_cars() -> ModelData {
    let mut model = cars_model();
    model.convert_to_binary(Some(cars_bins())).unwrap();
    model
}

#[test]
fn test_target_is_binarized_at_the_median() {
    let model = cars_model();
    let target = model.target();
    assert_eq!(target.pivot(), Some(57.5));
    assert_eq!(target.name(), "is_num_of_sales_lt_quantile");
    let flags: Vec<bool> = target.values().iter().map(|v| v.unwrap()).collect();
    assert_eq!(flags, vec![true, true, true, false, false, false]);
}

#[test]
fn test_color_segments() {
    let report = calculate_dependence(&encoded_cars()).unwrap();

    let green = report.get("color_green").unwrap();
    let red = report.get("color_red").unwrap();
    assert_eq!(green.total_sum, 2);
    assert_eq!(red.total_sum, 4);
    assert!((red.perc_of_total - 66.67).abs() < 0.01);
    assert_eq!(red.base_col, "color");
    assert_eq!(red.base_cats.as_deref(), Some(&["green".to_string(), "red".to_string()][..]));
}

#[test]
fn test_report_invariants() {
    let mut model = encoded_cars();
    model.construct_combs_up_to(2).unwrap();
    let report = calculate_dependence(&model).unwrap();

    for row in report.rows.iter().filter(|r| !r.low_perc.is_nan()) {
        assert!((row.low_perc + row.high_perc - 100.0).abs() < 1e-9);
    }
    let ordered: Vec<f64> = report
        .rows
        .iter()
        .map(|r| r.low_perc)
        .take_while(|p| !p.is_nan())
        .collect();
    assert!(ordered.windows(2).all(|w| w[0] >= w[1]));
    assert!(report.rows.iter().skip(ordered.len()).all(|r| r.low_perc.is_nan()));
}

#[test]
fn test_numeric_bins_partition_rows() {
    let model = encoded_cars();
    let table = model.binary_table().unwrap();
    for column in ["age", "max_speed"] {
        let bins: Vec<_> = table
            .schema()
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name().starts_with(&format!("{column}_")))
            .map(|(i, _)| table.column(i).as_primitive::<Int8Type>().clone())
            .collect();
        assert_eq!(bins.len(), model.bins().unwrap().get(column).unwrap().labels().len());
        for row in 0..table.num_rows() {
            let total: i8 = bins.iter().map(|b| b.value(row)).sum();
            assert_eq!(total, 1, "row {row} of {column}");
        }
    }
}

#[test]
fn test_re_encoding_is_idempotent() {
    let mut model = encoded_cars();
    let first = model.provenance_map();
    model.construct_combs_up_to(2).unwrap();
    model.convert_to_binary(Some(cars_bins())).unwrap();
    assert_eq!(model.provenance_map(), first);
}

#[test]
fn test_combination_counts() {
    let mut model = encoded_cars();
    let before = model.segments().unwrap().len();
    model.construct_combs_up_to(1).unwrap();
    assert_eq!(model.segments().unwrap().len(), before);
    model.construct_combs_up_to(0).unwrap();
    assert_eq!(model.segments().unwrap().len(), before);
}

#[test]
fn test_comparator_green_to_red_lowers_sales() {
    let comparisons = compare_intervals(&encoded_cars(), "color_green").unwrap();
    assert_eq!(comparisons.len(), 1);
    assert_eq!(comparisons[0].metric, CentralMetric::Mode);
    assert!(comparisons[0].total_target_change_perc < 0.0);
}

#[test]
fn test_binary_target_mode() {
    let batch = cars();
    let sales = batch.column_by_name("num_of_sales").unwrap();
    let flags: arrow::array::Float64Array = sales
        .as_primitive::<arrow::datatypes::Float64Type>()
        .iter()
        .map(|v| v.map(|x| if x < 60.0 { 1.0 } else { 0.0 }))
        .collect();
    let mut columns = batch.columns().to_vec();
    columns[3] = std::sync::Arc::new(flags);
    let batch = arrow::record_batch::RecordBatch::try_new(batch.schema(), columns).unwrap();

    let model = ModelData::builder(batch, "num_of_sales")
        .categorical(["color"])
        .numeric(["age", "max_speed", "year_of_sale"])
        .config(ModelConfig::binary_target())
        .build()
        .unwrap();
    assert_eq!(model.target().name(), "num_of_sales_copy");
    assert_eq!(model.target().pivot(), None);
    assert_eq!(model.target().values().true_count(), 3);
}

#[test]
fn test_csv_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CARS_CSV.as_bytes()).unwrap();
    file.flush().unwrap();

    let batch = read_csv(file.path()).unwrap();
    let mut model = ModelData::builder(batch, "num_of_sales")
        .categorical(["color"])
        .numeric(["age", "max_speed", "year_of_sale"])
        .build()
        .unwrap();
    model.convert_to_binary(Some(cars_bins())).unwrap();
    let report = calculate_dependence(&model).unwrap();

    assert_eq!(report.get("color_red").unwrap().total_sum, 4);
    assert_eq!(report.get("max_speed_missing").unwrap().total_sum, 1);

    let markdown = MarkdownFormatter::new().format_report(&report).unwrap();
    assert!(markdown.contains("color_red"));
    let json: serde_json::Value =
        serde_json::from_str(&JsonFormatter::new().format_report(&report).unwrap()).unwrap();
    assert_eq!(json["target"], "is_num_of_sales_lt_quantile");
}

#[test]
fn test_split_apply_combine_by_year() {
    let mut model = cars_model();
    let bins = model.make_bins(&QuantileBinner::new(2), None).unwrap();
    model.convert_to_binary(Some(bins.clone())).unwrap();

    let mut sac = SplitApplyCombine::new(model, QuantileBinner::new(2)).with_global_bins(bins);
    sac.split("year_of_sale").unwrap();
    sac.run().unwrap();
    assert_eq!(sac.experiments().len(), 2);

    let combined = sac.combine(&[(DependenceMetric::TotalSum, 0.0)]);
    assert_eq!(combined.experiments, 2);
    assert!(combined.rows.iter().all(|r| r.number_of_experiments >= 1));
    assert!(combined.rows.iter().all(|r| r.number_of_experiments <= 2));
    assert_eq!(combined.get("color_green").unwrap().number_of_experiments, 1);
}

#[test]
fn test_raw_table_columns_survive_projection() {
    let model = cars_model();
    assert_eq!(model.base_table().num_columns(), 5);
    assert_eq!(model.base_table().column(0).len(), 6);
}
