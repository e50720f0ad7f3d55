//! Spreadsheet price-list import.
//!
//! The pipeline runs synchronously on the caller's thread (the job controller
//! puts it on a blocking worker):
//!
//! 1. [`TabularReader`] streams the first worksheet as row batches.
//! 2. [`detect_schema`] splits the header into identity and provider columns
//!    once, before any row is touched.
//! 3. [`normalize_row`] turns each row into a record or a skip, in parallel
//!    across a batch.
//! 4. [`BatchWriter`] appends records to the store in bulk.
//!
//! Progress is pushed to a caller-supplied callback after every batch and
//! every bulk write.

mod normalize;
mod reader;
mod schema;
mod writer;

pub use normalize::NormalizedRecord;

use normalize::{normalize_row, RowOutcome, SkipReason};
use reader::{Row, TabularReader};
use schema::detect_schema;
use writer::BatchWriter;

use crate::config::IngestSettings;
use crate::store::{OfferSink, StoreError};
use log::{debug, info};
use rayon::prelude::*;
use std::path::Path;
use thiserror::Error;

pub const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file is not a readable spreadsheet: {0}")]
    MalformedInput(String),
    #[error("'{column}' column not found")]
    Schema { column: String },
    #[error("could not save records: {0}")]
    Persistence(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("an import is already running")]
    AlreadyRunning,
    #[error("unsupported file type '{0}', expected .xlsx or .xls")]
    UnsupportedExtension(String),
}

/// Lower-cased extension of `file_name` if it is an accepted spreadsheet type.
pub fn allowed_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.iter().copied().find(|allowed| *allowed == ext)
}

/// Progress notifications emitted while a file is imported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestEvent {
    /// Approximate number of data rows, when the format reports it up front.
    SizeHint(u64),
    Progress { progress: u64, saved: u64, skipped: u64 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: u64,
    pub saved: u64,
    pub skipped: u64,
}

/// Imports already-read batches under `header`.
pub fn ingest_batches<S, I>(
    header: &[String],
    batches: I,
    sink: &S,
    write_batch: usize,
    report: &mut dyn FnMut(IngestEvent),
) -> Result<IngestSummary, IngestError>
where
    S: OfferSink + ?Sized,
    I: IntoIterator<Item = Result<Vec<Row>, IngestError>>,
{
    let schema = detect_schema(header)?;
    info!(
        "provider columns: {:?}",
        schema.offers.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    let mut writer = BatchWriter::new(sink, write_batch);
    let mut rows = 0u64;
    let mut converted = 0u64;
    let mut skipped = 0u64;

    for batch in batches {
        let batch = batch?;
        rows += batch.len() as u64;
        let outcomes: Vec<RowOutcome> = batch
            .par_iter()
            .map(|row| normalize_row(row, &schema))
            .collect();

        for (row, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                RowOutcome::Record(record) => {
                    converted += 1;
                    if let Some(saved) = writer.push(record)? {
                        report(IngestEvent::Progress {
                            progress: converted,
                            saved,
                            skipped,
                        });
                    }
                }
                RowOutcome::Skip(reason) => {
                    skipped += 1;
                    if reason != SkipReason::NoOffers {
                        debug!("row {} dropped: {:?}", row.line, reason);
                    }
                }
            }
        }
        report(IngestEvent::Progress {
            progress: converted,
            saved: writer.saved(),
            skipped,
        });
    }

    let saved = writer.finish()?;
    info!("import finished: {} rows, {} saved, {} skipped", rows, saved, skipped);
    Ok(IngestSummary {
        rows,
        saved,
        skipped,
    })
}

/// Opens `path` and imports every row of its first worksheet into `sink`.
pub fn ingest_file<S>(
    path: &Path,
    settings: IngestSettings,
    sink: &S,
    report: &mut dyn FnMut(IngestEvent),
) -> Result<IngestSummary, IngestError>
where
    S: OfferSink + ?Sized,
{
    let reader = TabularReader::open(path, settings.read_batch_rows)?;
    info!(
        "opened {} with {} columns",
        path.display(),
        reader.header().len()
    );
    if let Some(rows) = reader.size_hint() {
        report(IngestEvent::SizeHint(rows));
    }
    let header = reader.header().to_vec();
    ingest_batches(&header, reader, sink, settings.write_batch_records, report)
}
