//! Column-level type normalization.

use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use indexmap::IndexSet;

use crate::error::{InsightError, Result};

/// Label used for null categories and for the numeric "missing" bin.
pub const MISSING_LABEL: &str = "missing";

/// Coerces a column to `Float64`, treating `NaN` as missing.
///
/// String columns are parsed value by value so the first offending value can
/// be reported; empty strings count as missing.
pub fn coerce_numeric(name: &str, array: &ArrayRef) -> Result<Float64Array> {
    let values = match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let strings = cast(array, &DataType::Utf8)?;
            let strings = strings.as_string::<i32>();
            let mut parsed = Vec::with_capacity(strings.len());
            for raw in strings.iter() {
                parsed.push(parse_number(name, raw)?);
            }
            Float64Array::from(parsed)
        }
        data_type if data_type.is_numeric() || *data_type == DataType::Boolean => {
            cast(array, &DataType::Float64)?
                .as_primitive::<arrow::datatypes::Float64Type>()
                .clone()
        }
        DataType::Null => Float64Array::from(vec![None::<f64>; array.len()]),
        other => {
            return Err(InsightError::type_conversion(
                name,
                format!("<{other} column>"),
            ))
        }
    };

    Ok(values.iter().map(|v| v.filter(|x| !x.is_nan())).collect())
}

fn parse_number(name: &str, raw: Option<&str>) -> Result<Option<f64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse::<f64>()
            .map(Some)
            .map_err(|_| InsightError::type_conversion(name, text)),
    }
}

/// Renders every value of a column as a category label (`None` for nulls).
pub fn category_labels(array: &ArrayRef) -> Result<Vec<Option<String>>> {
    let strings = cast(array, &DataType::Utf8)?;
    Ok(strings
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Distinct labels in first-appearance order, nulls included.
pub fn distinct_labels(labels: &[Option<String>]) -> Vec<Option<String>> {
    let seen: IndexSet<&Option<String>> = labels.iter().collect();
    seen.into_iter().cloned().collect()
}

/// Number of distinct non-null labels.
pub fn distinct_non_null(labels: &[Option<String>]) -> usize {
    labels
        .iter()
        .flatten()
        .collect::<IndexSet<&String>>()
        .len()
}

/// Distinct labels paired with unique display names.
///
/// A null is named [`MISSING_LABEL`] unless a value of the column already
/// reads `missing`; it then takes the first free `missing_<n>`.
pub fn named_labels(labels: &[Option<String>]) -> Vec<(Option<String>, String)> {
    let distinct = distinct_labels(labels);
    let null_name = null_label(&distinct);
    distinct
        .into_iter()
        .map(|label| {
            let name = label.clone().unwrap_or_else(|| null_name.clone());
            (label, name)
        })
        .collect()
}

fn null_label(distinct: &[Option<String>]) -> String {
    let taken = |candidate: &str| distinct.iter().any(|l| l.as_deref() == Some(candidate));
    let mut candidate = MISSING_LABEL.to_string();
    let mut suffix = 0;
    while taken(&candidate) {
        suffix += 1;
        candidate = format!("{MISSING_LABEL}_{suffix}");
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use std::sync::Arc;

    #[test]
    fn test_coerce_integers_and_nan() {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![100.0, f64::NAN, 80.0]));
        let values = coerce_numeric("max_speed", &array).unwrap();
        assert_eq!(values.null_count(), 1);
        assert_eq!(values.value(2), 80.0);

        let array: ArrayRef = Arc::new(Int64Array::from(vec![Some(10), None]));
        let values = coerce_numeric("age", &array).unwrap();
        assert_eq!(values.value(0), 10.0);
        assert!(values.is_null(1));
    }

    #[test]
    fn test_coerce_numeric_strings() {
        let array: ArrayRef = Arc::new(StringArray::from(vec![Some(" 1.5"), Some(""), None]));
        let values = coerce_numeric("price", &array).unwrap();
        assert_eq!(values.value(0), 1.5);
        assert!(values.is_null(1));
        assert!(values.is_null(2));
    }

    #[test]
    fn test_coerce_rejects_text() {
        let array: ArrayRef = Arc::new(StringArray::from(vec!["1", "ten"]));
        let err = coerce_numeric("age", &array).unwrap_err();
        match err {
            InsightError::TypeConversion { column, value } => {
                assert_eq!(column, "age");
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_distinct_labels_keep_order() {
        let array: ArrayRef = Arc::new(StringArray::from(vec![
            Some("green"),
            Some("red"),
            None,
            Some("green"),
        ]));
        let labels = category_labels(&array).unwrap();
        let distinct = distinct_labels(&labels);
        assert_eq!(
            distinct,
            vec![Some("green".to_string()), Some("red".to_string()), None]
        );
        assert_eq!(distinct_non_null(&labels), 2);
        assert_eq!(named_labels(&labels)[2].1, "missing");
    }

    #[test]
    fn test_null_name_avoids_literal_missing() {
        let labels = vec![
            Some("missing".to_string()),
            None,
            Some("missing_1".to_string()),
            Some("ok".to_string()),
        ];
        let names: Vec<String> = named_labels(&labels).into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["missing", "missing_2", "missing_1", "ok"]);
    }

    #[test]
    fn test_distinct_labels_many_values() {
        let labels: Vec<Option<String>> = (0..10_000).map(|i| Some((i % 2_500).to_string())).collect();
        let distinct = distinct_labels(&labels);
        assert_eq!(distinct.len(), 2_500);
        assert_eq!(distinct[0].as_deref(), Some("0"));
        assert_eq!(distinct[2_499].as_deref(), Some("2499"));
    }
}
