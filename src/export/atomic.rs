//! Atomic file publishing.
//!
//! Serialized output is written into a fresh staging directory and moved
//! to its final path in a single rename, so a partially written file is
//! never visible at the destination — not to concurrent export runs and
//! not after a crash mid-write.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ExportError, Result};

/// Publishes byte streams to final paths without exposing partial writes.
///
/// Each publish attempt stages its content in a unique temporary
/// directory under the output base, so concurrent or retried attempts
/// for the same destination cannot collide during the write phase. The
/// last rename to complete wins.
pub struct AtomicFileWriter {
    staging_root: PathBuf,
}

impl AtomicFileWriter {
    /// Create a writer staging under `base`. The base directory is
    /// created if absent; failure to do so is fatal for the export.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self> {
        let staging_root = base.into();
        std::fs::create_dir_all(&staging_root).map_err(|e| ExportError::OutputDir {
            path: staging_root.clone(),
            source: e,
        })?;
        Ok(Self { staging_root })
    }

    /// Write `content` to `dest` atomically.
    ///
    /// Empty content is rejected: serialization that produced nothing is
    /// a fatal error for the record (`id` is used for the error only).
    pub fn publish(&self, content: &[u8], dest: &Path, id: i64) -> Result<()> {
        if content.is_empty() {
            return Err(ExportError::EmptyMessage { id });
        }

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.staging_root)
            .map_err(|e| ExportError::StagingDir {
                path: self.staging_root.clone(),
                source: e,
            })?;

        let staged = staging.path().join("message.eml");
        std::fs::write(&staged, content).map_err(|e| ExportError::io(&staged, e))?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::OutputDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Remove-then-rename: rename over an existing file is not
        // portable, and the rename must stay the last observable action.
        if dest.exists() {
            std::fs::remove_file(dest).map_err(|e| ExportError::io(dest, e))?;
        }
        std::fs::rename(&staged, dest).map_err(|e| ExportError::io(dest, e))?;
        debug!(path = %dest.display(), bytes = content.len(), "Published");

        // Staging cleanup is non-fatal.
        if let Err(e) = staging.close() {
            warn!(error = %e, "Failed to remove staging directory");
        }
        Ok(())
    }
}
