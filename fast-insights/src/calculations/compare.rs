//! What-if comparison of sibling segments.
//!
//! Selecting a segment and a sibling of the same base column, the comparator
//! pretends the selected rows behaved like the sibling: their target becomes
//! the sibling's mean target and their base value the sibling's central value.
//! The resulting change of the total target is reported per sibling.

use std::fmt;

use arrow::array::{BooleanArray, Float64Array};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{InsightError, Result};
use crate::model::{ModelData, Provenance};
use crate::stats;

/// Central tendency used for a base column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralMetric {
    /// Arithmetic mean (numeric columns)
    Mean,
    /// Most frequent value (categorical columns)
    Mode,
}

impl fmt::Display for CentralMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => f.write_str("mean"),
            Self::Mode => f.write_str("mode"),
        }
    }
}

/// A central value of a numeric or categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CentralValue {
    Number(f64),
    Category(String),
}

impl fmt::Display for CentralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Category(value) => f.write_str(value),
        }
    }
}

/// Result of substituting the selected segment by one sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalComparison {
    /// Metric behind the central values
    pub metric: CentralMetric,
    /// The selected segment
    pub old_col: String,
    /// Central value of the base column over the selected rows
    pub old_value: Option<CentralValue>,
    /// Central value of the whole base column
    pub old_base_value: Option<CentralValue>,
    /// The sibling segment
    pub new_col: String,
    /// Central value of the base column over the sibling rows
    pub new_value: Option<CentralValue>,
    /// Central value of the base column after the substitution
    pub new_base_value: Option<CentralValue>,
    /// Change of the total target after the substitution, in percent
    pub total_target_change_perc: f64,
}

/// Compares `selected` against every other segment of its base column.
///
/// Fails with a validation error when `selected` is not a segment (for
/// example a raw column name) or when it is a combination segment.
#[instrument(skip(model))]
pub fn compare_intervals(model: &ModelData, selected: &str) -> Result<Vec<IntervalComparison>> {
    let segments = model.segments().ok();
    let Some(segment) = segments.and_then(|s| s.get(selected)) else {
        return Err(InsightError::validation(format!(
            "'{selected}' segment not found; make sure you pass a binary segment name, not the original feature name"
        )));
    };
    let base = match segment.provenance() {
        Provenance::BaseColumn(base) => base.as_str(),
        Provenance::Combination(_) => {
            return Err(InsightError::validation(format!(
                "'{selected}' is a combination segment; only segments of a single base column can be compared"
            )))
        }
    };

    let column = BaseColumn::resolve(model, base)?;
    let selected_mask = segment.values();
    let raw_target = model.target().raw();
    let original_sum = stats::sum(raw_target);

    let old_value = column.central(Some(selected_mask));
    let old_base_value = column.central(None);

    let mut comparisons = Vec::new();
    for sibling in segments
        .into_iter()
        .flat_map(|s| s.with_base(base))
        .filter(|s| s.name() != selected)
    {
        let sibling_mask = sibling.values();
        let sibling_target_mean = stats::masked_mean(raw_target, sibling_mask);
        let total_target_change_perc = match sibling_target_mean {
            Some(mean) => {
                let simulated = substituted_sum(raw_target, selected_mask, mean);
                (simulated / original_sum - 1.0) * 100.0
            }
            None => f64::NAN,
        };

        let new_value = column.central(Some(sibling_mask));
        let new_base_value = column.central_after(selected_mask, new_value.as_ref());

        debug!(sibling = %sibling.name(), total_target_change_perc, "compared segment");
        comparisons.push(IntervalComparison {
            metric: column.metric(),
            old_col: selected.to_string(),
            old_value: old_value.clone(),
            old_base_value: old_base_value.clone(),
            new_col: sibling.name().to_string(),
            new_value,
            new_base_value,
            total_target_change_perc,
        });
    }

    Ok(comparisons)
}

fn substituted_sum(raw: &Float64Array, mask: &BooleanArray, replacement: f64) -> f64 {
    raw.iter()
        .zip(mask.iter())
        .filter_map(|(value, active)| {
            if active == Some(true) {
                Some(replacement)
            } else {
                value
            }
        })
        .sum()
}

/// Raw values of the base column being compared.
enum BaseColumn<'a> {
    Numeric(&'a Float64Array),
    Categorical(&'a [Option<String>]),
}

impl<'a> BaseColumn<'a> {
    fn resolve(model: &'a ModelData, name: &str) -> Result<Self> {
        if model.is_numeric(name) {
            Ok(Self::Numeric(model.numeric_values(name)?))
        } else if model.is_categorical(name) {
            Ok(Self::Categorical(model.categorical_labels(name)?))
        } else {
            Err(InsightError::validation(format!(
                "base column '{name}' is neither a numeric nor a categorical feature"
            )))
        }
    }

    fn metric(&self) -> CentralMetric {
        match self {
            Self::Numeric(_) => CentralMetric::Mean,
            Self::Categorical(_) => CentralMetric::Mode,
        }
    }

    /// Central value over the rows set in `mask`, or over every row.
    fn central(&self, mask: Option<&BooleanArray>) -> Option<CentralValue> {
        let active = |i: usize| mask.map_or(true, |m| m.value(i));
        match self {
            Self::Numeric(values) => {
                let (sum, count) = values
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| active(*i))
                    .filter_map(|(_, v)| v)
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                (count > 0).then(|| CentralValue::Number(sum / count as f64))
            }
            Self::Categorical(labels) => stats::mode(
                labels
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| active(*i))
                    .map(|(_, l)| l.as_deref()),
            )
            .map(CentralValue::Category),
        }
    }

    /// Central value of the column once the rows in `mask` take `replacement`.
    fn central_after(
        &self,
        mask: &BooleanArray,
        replacement: Option<&CentralValue>,
    ) -> Option<CentralValue> {
        match self {
            Self::Numeric(values) => {
                let replacement = match replacement {
                    Some(CentralValue::Number(v)) => Some(*v),
                    _ => None,
                };
                let substituted: Float64Array = values
                    .iter()
                    .zip(mask.iter())
                    .map(|(v, active)| if active == Some(true) { replacement } else { v })
                    .collect();
                stats::mean(&substituted).map(CentralValue::Number)
            }
            Self::Categorical(labels) => {
                let replacement = match replacement {
                    Some(CentralValue::Category(v)) => Some(v.as_str()),
                    _ => None,
                };
                stats::mode(labels.iter().zip(mask.iter()).map(|(l, active)| {
                    if active == Some(true) {
                        replacement
                    } else {
                        l.as_deref()
                    }
                }))
                .map(CentralValue::Category)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{cars_batch, cars_bins, cars_categorical, cars_numeric};

    fn encoded_cars() -> ModelData {
        let mut model = ModelData::builder(cars_batch(), "num_of_sales")
            .categorical(cars_categorical())
            .numeric(cars_numeric())
            .build()
            .unwrap();
        model.convert_to_binary(Some(cars_bins())).unwrap();
        model
    }

    fn number(value: &Option<CentralValue>) -> f64 {
        match value {
            Some(CentralValue::Number(v)) => *v,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn test_green_against_red() {
        let comparisons = compare_intervals(&encoded_cars(), "color_green").unwrap();
        assert_eq!(comparisons.len(), 1);

        let c = &comparisons[0];
        assert_eq!(c.metric, CentralMetric::Mode);
        assert_eq!(c.new_col, "color_red");
        assert_eq!(c.old_value, Some(CentralValue::Category("green".into())));
        assert_eq!(c.old_base_value, Some(CentralValue::Category("red".into())));
        assert_eq!(c.new_value, Some(CentralValue::Category("red".into())));
        assert_eq!(c.new_base_value, Some(CentralValue::Category("red".into())));
        // green rows (45 + 99) take red's mean sales 66.5: 399 against 410
        assert!((c.total_target_change_perc - (399.0 / 410.0 - 1.0) * 100.0).abs() < 1e-9);
        assert!(c.total_target_change_perc < 0.0);
    }

    #[test]
    fn test_numeric_siblings() {
        let comparisons = compare_intervals(&encoded_cars(), "age_[10.0,20.0)").unwrap();
        let names: Vec<&str> = comparisons.iter().map(|c| c.new_col.as_str()).collect();
        assert_eq!(names, vec!["age_[-inf,10.0)", "age_[20.0,inf)", "age_missing"]);

        let young = &comparisons[0];
        assert_eq!(young.metric, CentralMetric::Mean);
        assert_eq!(number(&young.old_value), 12.5);
        assert!((number(&young.old_base_value) - 82.0 / 6.0).abs() < 1e-9);
        assert_eq!(number(&young.new_value), 3.5);
        assert!((number(&young.new_base_value) - 64.0 / 6.0).abs() < 1e-9);
        // rows 0 and 5 (45 + 65) take mean sales 100
        assert!((young.total_target_change_perc - (500.0 / 410.0 - 1.0) * 100.0).abs() < 1e-9);

        let missing = &comparisons[2];
        assert!(missing.new_value.is_none());
        assert!(missing.total_target_change_perc.is_nan());
    }

    #[test]
    fn test_raw_column_name_rejected() {
        let err = compare_intervals(&encoded_cars(), "color").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("not the original feature name"));
    }

    #[test]
    fn test_combination_rejected() {
        let mut model = encoded_cars();
        model.construct_partial_combs("color", true).unwrap();
        let err = compare_intervals(&model, "color_red_AND_age_missing").unwrap_err();
        assert!(err.to_string().contains("combination segment"));
    }

    #[test]
    fn test_unencoded_model_rejected() {
        let model = ModelData::builder(cars_batch(), "num_of_sales")
            .categorical(cars_categorical())
            .numeric(cars_numeric())
            .build()
            .unwrap();
        assert!(compare_intervals(&model, "color_red").unwrap_err().is_validation());
    }
}
