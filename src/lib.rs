//! `mailflow` — export ticketing-system messages as standards-compliant
//! EML files, with purge and totals maintenance operations.
//!
//! The core pipeline reads message rows from a ticketing database,
//! normalizes recipient lists, sanitizes untrusted text into safe path
//! segments, serializes each record (plus its on-disk attachments) into
//! a MIME document, and publishes it atomically into a deterministic
//! output tree.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod mime;
pub mod model;
pub mod sanitize;
