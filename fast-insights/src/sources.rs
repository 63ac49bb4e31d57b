//! Loading tables from disk.
//!
//! The library itself works on in-memory Arrow [`RecordBatch`]es; this module
//! only offers a CSV loader that infers the schema and returns a single batch.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use tracing::{debug, instrument};

use crate::error::Result;

/// Options for reading CSV files.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the first line holds column names
    pub has_header: bool,
    /// Field delimiter
    pub delimiter: u8,
    /// Rows per decoded batch
    pub batch_size: usize,
    /// Rows inspected for schema inference (`None` for the whole file)
    pub max_infer_records: Option<usize>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            batch_size: 8192,
            max_infer_records: Some(1000),
        }
    }
}

impl CsvOptions {
    /// Sets the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the file has a header line.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Sets how many rows schema inference inspects.
    pub fn with_max_infer_records(mut self, records: Option<usize>) -> Self {
        self.max_infer_records = records;
        self
    }
}

/// Reads a CSV file with default options.
pub fn read_csv(path: impl AsRef<Path>) -> Result<RecordBatch> {
    read_csv_with_options(path, &CsvOptions::default())
}

/// Reads a CSV file into one batch, inferring column types.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_csv_with_options(path: impl AsRef<Path>, options: &CsvOptions) -> Result<RecordBatch> {
    let mut file = File::open(path.as_ref())?;

    let format = Format::default()
        .with_header(options.has_header)
        .with_delimiter(options.delimiter);
    let (schema, inspected) = format.infer_schema(&mut file, options.max_infer_records)?;
    file.rewind()?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(options.batch_size)
        .build(file)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;

    debug!(
        columns = batch.num_columns(),
        rows = batch.num_rows(),
        inspected,
        "loaded csv"
    );
    Ok(batch)
}
