//! The export pipeline: path layout, atomic publishing, and the
//! per-record orchestration loop.

pub mod atomic;
pub mod paths;
pub mod run;

pub use run::{run_export, ExportOptions, ExportSummary};
