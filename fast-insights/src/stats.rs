//! Descriptive statistics over nullable numeric columns.
//!
//! Nulls are skipped everywhere, matching the "skip missing" semantics the
//! dependence statistics are defined with. Functions return `None` when no
//! non-null value is available.

use std::collections::HashMap;

use arrow::array::{Array, BooleanArray, Float64Array};

/// Arithmetic mean of the non-null values.
pub fn mean(values: &Float64Array) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean of the non-null values on rows where `mask` is set.
pub fn masked_mean(values: &Float64Array, mask: &BooleanArray) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .zip(mask.iter())
        .filter_map(|(v, m)| if m == Some(true) { v } else { None })
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Sum of the non-null values.
pub fn sum(values: &Float64Array) -> f64 {
    values.iter().flatten().sum()
}

/// Sample variance (n - 1 denominator) of the non-null values.
pub fn variance(values: &Float64Array) -> Option<f64> {
    let observed: Vec<f64> = values.iter().flatten().collect();
    if observed.len() < 2 {
        return None;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let squares: f64 = observed.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some(squares / (observed.len() - 1) as f64)
}

/// Minimum and maximum of the non-null values.
pub fn min_max(values: &Float64Array) -> Option<(f64, f64)> {
    values.iter().flatten().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Quantile with linear interpolation between the closest ranks.
///
/// `level` is expected in `[0, 1]`.
pub fn quantile(values: &Float64Array, level: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, level))
}

/// Quantile of an already sorted, non-empty slice.
pub(crate) fn quantile_sorted(sorted: &[f64], level: f64) -> f64 {
    let position = level.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Most frequent value; ties resolve to the smallest value.
pub fn mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .map(|(value, _)| value.to_string())
}

/// Number of set rows in a boolean column.
pub fn count_true(mask: &BooleanArray) -> u64 {
    mask.true_count() as u64
}

/// Number of rows set in both columns.
pub fn count_both(a: &BooleanArray, b: &BooleanArray) -> u64 {
    a.iter()
        .zip(b.iter())
        .filter(|(x, y)| *x == Some(true) && *y == Some(true))
        .count() as u64
}

/// Number of distinct non-null values.
pub fn distinct_count(values: &Float64Array) -> usize {
    let mut observed: Vec<f64> = values.iter().flatten().collect();
    observed.sort_by(f64::total_cmp);
    observed.dedup();
    observed.len()
}

/// Whether the column contains any null.
pub fn has_nulls(values: &dyn Array) -> bool {
    values.null_count() > 0
}
