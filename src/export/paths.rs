//! Deterministic output path layout for exported messages.
//!
//! Layout: `<base>/<SanitizedFolder>/<Direction>/<id>_<SanitizedSubject>.eml`.
//! Re-running an export computes identical paths, so overlapping runs
//! overwrite rather than duplicate.

use std::path::{Path, PathBuf};

use crate::model::message::{Direction, MessageRecord};
use crate::sanitize;

/// Compute the output directory for a record.
pub fn output_dir(base: &Path, ticket_box: Option<&str>, direction: Direction) -> PathBuf {
    let folder = sanitize::sanitize_folder(ticket_box.unwrap_or(""));
    base.join(folder).join(direction.as_str())
}

/// Compute the output filename: `<id>_<sanitized-subject>.eml`.
pub fn eml_filename(id: i64, subject: &str) -> String {
    format!("{}_{}.eml", id, sanitize::sanitize_subject(subject))
}

/// Full destination path for a record.
pub fn destination(base: &Path, record: &MessageRecord) -> PathBuf {
    output_dir(base, record.ticket_box.as_deref(), record.direction)
        .join(eml_filename(record.id, &record.subject))
}
