//! Target binarization.

use arrow::array::{Array, BooleanArray, Float64Array};
use tracing::debug;

use crate::error::{InsightError, Result};
use crate::model::config::TargetSpec;
use crate::stats;

/// The raw target together with its binary "worse outcome" form.
#[derive(Debug, Clone)]
pub struct BinaryTarget {
    /// Name of the raw target column
    pub(crate) raw_name: String,
    /// Name of the derived binary column
    pub(crate) name: String,
    /// Threshold separating worse from better rows; absent for binary targets
    pub(crate) pivot: Option<f64>,
    /// Raw target values (nulls for missing)
    pub(crate) raw: Float64Array,
    /// `true` where the outcome is "worse"
    pub(crate) values: BooleanArray,
}

impl BinaryTarget {
    /// Binarizes `raw` according to `spec`.
    pub fn compute(raw_name: &str, raw: Float64Array, spec: &TargetSpec) -> Result<Self> {
        spec.validate()?;
        let pivot = pivot(&raw, spec)?;

        let (name, values) = match pivot {
            None => {
                let mut distinct: Vec<f64> = raw.iter().flatten().collect();
                distinct.sort_by(f64::total_cmp);
                distinct.dedup();
                if raw.null_count() > 0 || distinct != [0.0, 1.0] {
                    return Err(InsightError::validation(
                        "No pivot set, expect binary target: binary target must have exactly 2 unique values: 0 and 1",
                    ));
                }
                let values: BooleanArray = raw.iter().map(|v| v.map(|x| x == 1.0)).collect();
                (format!("{raw_name}_copy"), values)
            }
            Some(pivot) => {
                let values: BooleanArray = raw
                    .iter()
                    .map(|v| Some(v.map(|x| x < pivot).unwrap_or(false)))
                    .collect();
                (format!("is_{raw_name}_lt_{}", spec.mode_name()), values)
            }
        };

        debug!(target_column = %raw_name, binary_column = %name, ?pivot, "binarized target");

        Ok(Self {
            raw_name: raw_name.to_string(),
            name,
            pivot,
            raw,
            values,
        })
    }

    /// Name of the raw target column.
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Name of the binary target column.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pivot value, if the target was thresholded.
    pub fn pivot(&self) -> Option<f64> {
        self.pivot
    }

    /// Raw target values.
    pub fn raw(&self) -> &Float64Array {
        &self.raw
    }

    /// Binary target values.
    pub fn values(&self) -> &BooleanArray {
        &self.values
    }

    /// Number of distinct values taken by the binary target (0, 1 or 2).
    pub fn distinct_count(&self) -> usize {
        let ones = self.values.true_count();
        usize::from(ones > 0) + usize::from(ones < self.values.len())
    }
}

/// Computes the threshold for `spec`; `None` for binary targets.
pub fn pivot(raw: &Float64Array, spec: &TargetSpec) -> Result<Option<f64>> {
    let pivot = match spec {
        TargetSpec::Binary => return Ok(None),
        TargetSpec::Mean => stats::mean(raw),
        TargetSpec::Quantile { level } => stats::quantile(raw, *level),
    };
    pivot
        .map(Some)
        .ok_or_else(|| InsightError::validation("target column has no non-missing values"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> Float64Array {
        Float64Array::from(vec![45.0, 50.0, 50.0, 101.0, 99.0, 65.0])
    }

    #[test]
    fn test_quantile_target() {
        let target = BinaryTarget::compute("num_of_sales", sales(), &TargetSpec::quantile(0.5))
            .unwrap();
        assert_eq!(target.pivot(), Some(57.5));
        assert_eq!(target.name(), "is_num_of_sales_lt_quantile");
        let flags: Vec<bool> = target.values().iter().map(|v| v.unwrap()).collect();
        assert_eq!(flags, vec![true, true, true, false, false, false]);
        assert_eq!(target.distinct_count(), 2);
    }

    #[test]
    fn test_mean_target() {
        let target = BinaryTarget::compute("num_of_sales", sales(), &TargetSpec::Mean).unwrap();
        let mean = 410.0 / 6.0;
        assert!((target.pivot().unwrap() - mean).abs() < 1e-12);
        assert_eq!(target.name(), "is_num_of_sales_lt_mean");
        assert_eq!(target.values().true_count(), 4);
    }

    #[test]
    fn test_binary_target() {
        let raw = Float64Array::from(vec![1.0, 0.0, 0.0, 1.0]);
        let target = BinaryTarget::compute("churned", raw, &TargetSpec::Binary).unwrap();
        assert_eq!(target.pivot(), None);
        assert_eq!(target.name(), "churned_copy");
        assert_eq!(target.values().true_count(), 2);
    }

    #[test]
    fn test_binary_target_rejects_other_values() {
        let raw = Float64Array::from(vec![1.0, 2.0, 0.0]);
        let err = BinaryTarget::compute("churned", raw, &TargetSpec::Binary).unwrap_err();
        assert!(err.to_string().contains("exactly 2 unique values"));

        let raw = Float64Array::from(vec![1.0, 1.0]);
        assert!(BinaryTarget::compute("churned", raw, &TargetSpec::Binary).is_err());
    }

    #[test]
    fn test_binary_target_rejects_nulls() {
        let raw = Float64Array::from(vec![Some(1.0), None, Some(0.0)]);
        let err = BinaryTarget::compute("churned", raw, &TargetSpec::Binary).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_target_values_are_not_worse() {
        let raw = Float64Array::from(vec![Some(1.0), None, Some(3.0)]);
        let target = BinaryTarget::compute("y", raw, &TargetSpec::Mean).unwrap();
        assert_eq!(target.pivot(), Some(2.0));
        assert!(!target.values().value(1));
        assert_eq!(target.values().null_count(), 0);
    }
}
