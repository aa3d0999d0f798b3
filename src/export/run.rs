//! Export orchestration: drive the per-record pipeline for each
//! requested direction.
//!
//! Failures are isolated per record: a record whose serialization or
//! publish fails is logged with its identifier and counted, and the
//! batch continues. Only setup failures (output base or staging
//! directory not creatable, record-source query errors) abort a run.

use std::path::PathBuf;

use tracing::{error, info};

use crate::db::source::{MessageSource, TimeRange};
use crate::error::Result;
use crate::mime;
use crate::model::message::{Direction, MessageRecord};
use crate::model::outgoing;

use super::atomic::AtomicFileWriter;
use super::paths;

/// Parameters for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub directions: Vec<Direction>,
    pub range: TimeRange,
    /// Base directory of the output tree.
    pub output_base: PathBuf,
}

/// Counters reported at the end of a run.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: usize,
    pub bytes_written: u64,
}

impl ExportSummary {
    fn absorb(&mut self, other: &ExportSummary) {
        self.exported += other.exported;
        self.failed += other.failed;
        self.bytes_written += other.bytes_written;
    }
}

/// Run a full export across all requested directions.
///
/// The progress callback receives `(direction, current, total)` as each
/// record of a direction completes.
pub fn run_export(
    source: &dyn MessageSource,
    opts: &ExportOptions,
    progress: Option<&dyn Fn(Direction, usize, usize)>,
) -> Result<ExportSummary> {
    let writer = AtomicFileWriter::new(&opts.output_base)?;

    let mut summary = ExportSummary::default();
    for &direction in &opts.directions {
        let dir_summary = export_direction(source, &writer, direction, opts, progress)?;
        summary.absorb(&dir_summary);
    }

    info!(
        exported = summary.exported,
        failed = summary.failed,
        bytes = summary.bytes_written,
        "Export complete"
    );
    Ok(summary)
}

/// Export all matching records of a single direction, ordered by sent
/// timestamp ascending.
fn export_direction(
    source: &dyn MessageSource,
    writer: &AtomicFileWriter,
    direction: Direction,
    opts: &ExportOptions,
    progress: Option<&dyn Fn(Direction, usize, usize)>,
) -> Result<ExportSummary> {
    let records = source.fetch_messages(direction, &opts.range)?;
    let total = records.len();
    info!(%direction, total, "Fetched messages");

    let mut summary = ExportSummary::default();
    for (i, record) in records.iter().enumerate() {
        match export_record(writer, record, opts) {
            Ok(bytes) => {
                summary.exported += 1;
                summary.bytes_written += bytes;
            }
            Err(e) => {
                error!(id = record.id, %direction, error = %e, "Failed to export message");
                summary.failed += 1;
            }
        }
        if let Some(cb) = progress {
            cb(direction, i + 1, total);
        }
    }
    Ok(summary)
}

/// Run the pipeline for one record: normalize, build, serialize,
/// publish. Returns the number of bytes written.
fn export_record(
    writer: &AtomicFileWriter,
    record: &MessageRecord,
    opts: &ExportOptions,
) -> Result<u64> {
    let dest = paths::destination(&opts.output_base, record);
    let message = outgoing::build_message(record);
    let bytes = mime::serialize_message(&message)?;
    writer.publish(&bytes, &dest, record.id)?;

    info!(
        id = record.id,
        direction = %record.direction,
        path = %dest.display(),
        "Exported message"
    );
    Ok(bytes.len() as u64)
}
