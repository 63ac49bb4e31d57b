//! Conjunctions of existing segments.
//!
//! A combination segment is active exactly where all of its constituents are
//! active. Constituents are always read from a snapshot of the segments that
//! existed when the call started, so a call never combines its own output.
//! [`ModelData::construct_combs_up_to`] only combines segments derived from a
//! single base column; earlier combinations are never nested.

use std::collections::HashSet;

use arrow::array::BooleanArray;
use arrow::compute::kernels::boolean::and;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use super::{ModelData, Provenance, Segment};
use crate::error::Result;
use crate::logging::truncate_field;

/// Separator between constituent names in a combination segment name.
pub const COMBINATION_SEPARATOR: &str = "_AND_";

impl ModelData {
    /// Combines every segment of `selected_feature` with every other segment.
    ///
    /// Each new segment is named `<selected>_AND_<other>`. Its provenance is
    /// the selected segment when `consider_selected_base` is true and the
    /// other segment otherwise; grouping downstream follows that choice.
    #[instrument(skip(self))]
    pub fn construct_partial_combs(
        &mut self,
        selected_feature: &str,
        consider_selected_base: bool,
    ) -> Result<()> {
        let encoding = self.encoding_mut_for("construct_partial_combs")?;

        let selected: Vec<Segment> = encoding
            .segments
            .with_base(selected_feature)
            .cloned()
            .collect();
        if selected.is_empty() {
            warn!(feature = %selected_feature, "feature has no segments, no combinations will be created");
            return Ok(());
        }
        let selected_names: HashSet<&str> = selected.iter().map(Segment::name).collect();
        let others: Vec<Segment> = encoding
            .segments
            .iter()
            .filter(|s| !selected_names.contains(s.name()))
            .cloned()
            .collect();

        let mut created = 0usize;
        for sel in &selected {
            for other in &others {
                let values = and(sel.values(), other.values())?;
                let provenance = if consider_selected_base {
                    Provenance::combination([sel.name()])
                } else {
                    Provenance::combination([other.name()])
                };
                let name = format!("{}{COMBINATION_SEPARATOR}{}", sel.name(), other.name());
                encoding.segments.insert(Segment::new(name, provenance, values));
                created += 1;
            }
        }

        info!(created, "constructed partial combinations");
        Ok(())
    }

    /// Adds every combination of 2 up to `max_size` base segments.
    ///
    /// Only segments derived from a raw column take part; combination
    /// segments from earlier calls are left out of the pool. Names join the
    /// constituents with `_AND_`; provenance is the sorted constituent list.
    /// A combination whose provenance or name is already present is not built
    /// again, so repeated calls are idempotent.
    #[instrument(skip(self))]
    pub fn construct_combs_up_to(&mut self, max_size: usize) -> Result<()> {
        let threshold = self.config.combination_warning_threshold;
        let encoding = self.encoding_mut_for("construct_combs_up_to")?;

        if max_size < 2 {
            warn!(max_size, "combination size < 2, no features will be created");
            return Ok(());
        }
        if max_size > threshold {
            warn!(max_size, threshold, "using a high combination size, calculations might take some time");
        }

        let snapshot: Vec<Segment> = encoding
            .segments
            .iter()
            .filter(|s| !s.provenance().is_combination())
            .cloned()
            .collect();
        let mut known: HashSet<Provenance> = encoding
            .segments
            .iter()
            .map(|s| s.provenance().clone())
            .collect();

        for size in 2..=max_size {
            info!(level = size, of = max_size, "working on combinations");
            let mut created = 0usize;

            for combination in snapshot.iter().combinations(size) {
                let provenance = Provenance::combination(combination.iter().map(|s| s.name()));
                if known.contains(&provenance) {
                    debug!(key = %truncate_field(&provenance.key(), 120), "combination already present, skipping");
                    continue;
                }

                let name = combination.iter().map(|s| s.name()).join(COMBINATION_SEPARATOR);
                if encoding.segments.contains(&name) {
                    debug!(name = %truncate_field(&name, 120), "segment name already taken, skipping");
                    continue;
                }

                let values = conjunction(&combination)?;
                encoding.segments.insert(Segment::new(name, provenance.clone(), values));
                known.insert(provenance);
                created += 1;
            }

            debug!(level = size, created, "combination level done");
        }

        Ok(())
    }
}

fn conjunction(segments: &[&Segment]) -> Result<BooleanArray> {
    let (first, rest) = segments
        .split_first()
        .ok_or_else(|| crate::error::InsightError::state("empty combination"))?;
    let mut values = first.values().clone();
    for segment in rest {
        values = and(&values, segment.values())?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightError;
    use crate::model::ModelConfig;
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

    fn flags(model: &ModelData, name: &str) -> Vec<bool> {
        model
            .segments()
            .unwrap()
            .get(name)
            .unwrap()
            .values()
            .iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_requires_encoding() {
        let mut model = ModelData::builder(cars_batch(), "num_of_sales")
            .categorical(cars_categorical())
            .numeric(cars_numeric())
            .build()
            .unwrap();
        assert!(matches!(model.construct_combs_up_to(2), Err(InsightError::State(_))));
        assert!(matches!(
            model.construct_partial_combs("color", true),
            Err(InsightError::State(_))
        ));
    }

    #[test]
    fn test_small_sizes_are_noops() {
        let mut model = encoded_cars();
        let before = model.segments().unwrap().len();
        model.construct_combs_up_to(0).unwrap();
        model.construct_combs_up_to(1).unwrap();
        assert_eq!(model.segments().unwrap().len(), before);
    }

    #[test]
    fn test_pairs() {
        let mut model = encoded_cars();
        assert_eq!(model.segments().unwrap().len(), 9);
        model.construct_combs_up_to(2).unwrap();
        assert_eq!(model.segments().unwrap().len(), 9 + 36);

        let name = "color_green_AND_age_[10.0,20.0)";
        let green = flags(&model, "color_green");
        let age = flags(&model, "age_[10.0,20.0)");
        let combined = flags(&model, name);
        for i in 0..combined.len() {
            assert_eq!(combined[i], green[i] && age[i]);
        }
        assert_eq!(
            model.provenance_map()[name].key(),
            r#"["age_[10.0,20.0)", "color_green"]"#
        );
    }

    #[test]
    fn test_repeated_calls_do_not_duplicate() {
        let mut model = encoded_cars();
        model.construct_combs_up_to(2).unwrap();
        let after_first = model.segments().unwrap().len();
        model.construct_combs_up_to(2).unwrap();
        assert_eq!(model.segments().unwrap().len(), after_first);
    }

    #[test]
    fn test_repeated_triples_do_not_nest() {
        let mut model = encoded_cars();
        model.construct_combs_up_to(3).unwrap();
        let provenance = model.provenance_map();
        model.construct_combs_up_to(3).unwrap();
        model.construct_combs_up_to(2).unwrap();
        // 9 base segments, C(9,2) pairs, C(9,3) triples
        assert_eq!(model.segments().unwrap().len(), 9 + 36 + 84);
        assert_eq!(model.provenance_map(), provenance);
    }

    #[test]
    fn test_pairs_after_partial_combs() {
        let mut model = encoded_cars();
        model.construct_partial_combs("color", true).unwrap();
        model.construct_combs_up_to(2).unwrap();
        // the 14 color pairs already exist under the same names
        assert_eq!(model.segments().unwrap().len(), 9 + 14 + 22);
        assert_eq!(
            model.provenance_map()["color_red_AND_age_missing"],
            Provenance::combination(["color_red"])
        );
        assert_eq!(
            model.provenance_map()["color_green_AND_color_red"],
            Provenance::combination(["color_green", "color_red"])
        );

        model.construct_combs_up_to(2).unwrap();
        assert_eq!(model.segments().unwrap().len(), 9 + 14 + 22);
    }

    #[test]
    fn test_triples_include_pairs() {
        let mut model = ModelData::builder(cars_batch(), "num_of_sales")
            .categorical(cars_categorical())
            .numeric(cars_numeric())
            .config(ModelConfig::default().with_combination_warning_threshold(2))
            .build()
            .unwrap();
        model
            .convert_to_binary(Some(
                crate::binning::BinTable::new()
                    .with_column("age", crate::binning::ColumnBins::from_breaks(&[10.0], false)),
            ))
            .unwrap();
        // color_green, color_red, age_[-inf,10.0), age_[10.0,inf)
        model.construct_combs_up_to(3).unwrap();
        assert_eq!(model.segments().unwrap().len(), 4 + 6 + 4);
    }

    #[test]
    fn test_partial_combs() {
        let mut model = encoded_cars();
        model.construct_partial_combs("color", true).unwrap();
        // 2 color segments x 7 others
        assert_eq!(model.segments().unwrap().len(), 9 + 14);

        let name = "color_red_AND_max_speed_[80.0,inf)";
        assert_eq!(flags(&model, name), vec![false, false, true, true, false, true]);
        assert_eq!(
            model.provenance_map()[name],
            Provenance::combination(["color_red"])
        );
    }

    #[test]
    fn test_partial_combs_other_base() {
        let mut model = encoded_cars();
        model.construct_partial_combs("color", false).unwrap();
        assert_eq!(
            model.provenance_map()["color_green_AND_age_missing"],
            Provenance::combination(["age_missing"])
        );
    }

    #[test]
    fn test_partial_combs_unknown_feature() {
        let mut model = encoded_cars();
        model.construct_partial_combs("weight", true).unwrap();
        assert_eq!(model.segments().unwrap().len(), 9);
    }
}
