//! Binary encoding of categorical values and numeric bins.

use arrow::array::BooleanArray;
use tracing::{debug, info, instrument};

use super::columns::named_labels;
use super::{Encoding, EncodingState, ModelData, Provenance, Segment, SegmentTable};
use crate::binning::BinTable;
use crate::error::Result;

impl ModelData {
    /// Converts every feature into indicator segments.
    ///
    /// Categorical columns get one segment per distinct value (nulls included,
    /// as `<column>_missing`, or a suffixed name when `missing` is a real
    /// value of the column). Numeric columns get one segment per entry of
    /// their bins; numeric columns without bins are left unencoded. Any
    /// previous encoding, including combinations built on top of it, is
    /// discarded first.
    #[instrument(skip_all, fields(binned_columns = bins.as_ref().map_or(0, BinTable::len)))]
    pub fn convert_to_binary(&mut self, bins: Option<BinTable>) -> Result<()> {
        let bins = bins.unwrap_or_default();
        bins.validate()?;

        if self.is_encoded() {
            debug!("discarding previous encoding");
        }
        self.state = EncodingState::Unencoded;

        let mut segments = SegmentTable::new();

        for (column, labels) in &self.categorical_labels {
            for (label, name) in named_labels(labels) {
                let values: BooleanArray = labels.iter().map(|l| Some(*l == label)).collect();
                segments.insert(Segment::new(
                    format!("{column}_{name}"),
                    Provenance::base(column.as_str()),
                    values,
                ));
            }
        }

        for (column, values) in &self.numeric_values {
            let Some(column_bins) = bins.get(column) else {
                debug!(column = %column, "no bins supplied, numeric column left unencoded");
                continue;
            };
            for entry in column_bins.entries()? {
                let flags: BooleanArray = values.iter().map(|v| Some(entry.contains(v))).collect();
                segments.insert(Segment::new(
                    format!("{column}_{}", entry.label),
                    Provenance::base(column.as_str()),
                    flags,
                ));
            }
        }

        for (column, _) in bins.iter() {
            if !self.numeric_values.contains_key(column) {
                debug!(column = %column, "ignoring bins for a column that is not a numeric feature");
            }
        }

        info!(segments = segments.len(), "converted features to binary format");
        self.state = EncodingState::Encoded(Encoding { segments, bins });
        Ok(())
    }
}
