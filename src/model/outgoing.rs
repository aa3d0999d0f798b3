//! In-memory representation of one outgoing message, ready for MIME
//! serialization.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::model::address::{self, EmailAddress};
use crate::model::message::{ContentKind, MessageRecord};
use crate::sanitize;

/// A fully loaded attachment part.
#[derive(Debug, Clone)]
pub struct AttachmentPart {
    /// Display filename used in the MIME headers.
    pub filename: String,
    /// MIME content type guessed from the filename extension.
    pub content_type: String,
    /// Raw file content.
    pub data: Vec<u8>,
}

/// The structured message assembled from one [`MessageRecord`].
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub from: EmailAddress,
    /// Ordered recipients (primary first). May be empty.
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub reply_to: Option<EmailAddress>,
    /// Subject with control characters stripped (header-safe, NOT
    /// filesystem-sanitized); `"No Subject"` when nothing is left.
    pub subject: String,
    pub date: DateTime<Utc>,
    pub body: String,
    pub kind: ContentKind,
    pub attachments: Vec<AttachmentPart>,
}

/// Build an [`OutgoingMessage`] from a record.
///
/// Field-level problems are recoverable: an invalid sender falls back to
/// a fixed address, invalid recipients are dropped, and attachment refs
/// whose file is missing on disk are skipped with a logged warning.
pub fn build_message(record: &MessageRecord) -> OutgoingMessage {
    let from = address::normalize_sender(&record.from_raw);
    let (to, cc) =
        address::normalize_recipients(&record.primary_to, &record.to_raw, &record.cc_raw);
    let reply_to = EmailAddress::parse(&record.reply_to_raw);

    let mut attachments = Vec::with_capacity(record.attachments.len());
    for att in &record.attachments {
        if !att.location.is_file() {
            warn!(
                id = record.id,
                direction = %record.direction,
                path = %att.location.display(),
                "Attachment file missing, skipping"
            );
            continue;
        }
        match std::fs::read(&att.location) {
            Ok(data) => {
                let filename = if att.filename.trim().is_empty() {
                    att.location
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "attachment".to_string())
                } else {
                    att.filename.clone()
                };
                let content_type = content_type_for(&filename).to_string();
                attachments.push(AttachmentPart {
                    filename,
                    content_type,
                    data,
                });
            }
            Err(e) => {
                warn!(
                    id = record.id,
                    path = %att.location.display(),
                    error = %e,
                    "Attachment file unreadable, skipping"
                );
            }
        }
    }

    OutgoingMessage {
        from,
        to,
        cc,
        reply_to,
        subject: sanitize::header_subject(&record.subject),
        date: record.sent,
        body: record.body.clone(),
        kind: record.kind,
        attachments,
    }
}

/// Guess a MIME content type from a filename extension.
///
/// Covers the types that actually occur in ticket traffic; everything
/// else is `application/octet-stream`.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "htm" | "html" => "text/html",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "xml" => "application/xml",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
