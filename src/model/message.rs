//! Message records as read from the ticketing database.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Message direction. Inbound and outbound messages live in separate
/// tables and identifier spaces, so `(id, direction)` is globally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Directory segment and log label: `"Inbound"` / `"Outbound"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "Inbound",
            Direction::Outbound => "Outbound",
        }
    }

    /// Message table for this direction (`InboundMessages` / `OutboundMessages`).
    pub fn message_table(&self) -> String {
        format!("{}Messages", self.as_str())
    }

    /// Message/attachment join table for this direction.
    pub fn attachment_table(&self) -> String {
        format!("{}MessageAttachments", self.as_str())
    }

    /// Identifier column for this direction (`InboundMessageID` / ...).
    pub fn id_column(&self) -> String {
        format!("{}MessageID", self.as_str())
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body content kind, from the `MediaSubType` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    #[default]
    Plain,
    Html,
}

impl ContentKind {
    /// Map the stored media subtype. Anything other than `html`
    /// (case-insensitive) is treated as plain text.
    pub fn from_media_subtype(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("html") {
            ContentKind::Html
        } else {
            ContentKind::Plain
        }
    }

    /// MIME content type for the message body.
    pub fn content_type(&self) -> &'static str {
        match self {
            ContentKind::Plain => "text/plain",
            ContentKind::Html => "text/html",
        }
    }
}

/// Reference to an attachment file stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentRef {
    /// Filesystem location of the stored content.
    pub location: PathBuf,
    /// Display filename to use in the exported message.
    pub filename: String,
}

/// One message row, read transiently from the record source and dropped
/// once its output file is published (or the record is skipped).
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Identifier, unique within `direction`.
    pub id: i64,
    pub direction: Direction,
    /// Raw sender field (possibly malformed).
    pub from_raw: String,
    /// Primary recipient, merged ahead of `to_raw` during normalization.
    pub primary_to: String,
    /// Delimited additional recipients.
    pub to_raw: String,
    /// Delimited carbon-copy recipients.
    pub cc_raw: String,
    /// Raw reply-to field.
    pub reply_to_raw: String,
    /// Sent timestamp from the `EmailDateTime` column.
    pub sent: DateTime<Utc>,
    /// Free-text subject; may contain control characters.
    pub subject: String,
    /// Body text or markup.
    pub body: String,
    pub kind: ContentKind,
    /// Owning ticket-box name, absent when the ticket join found nothing.
    pub ticket_box: Option<String>,
    pub attachments: Vec<AttachmentRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_table_names() {
        assert_eq!(Direction::Inbound.message_table(), "InboundMessages");
        assert_eq!(Direction::Outbound.message_table(), "OutboundMessages");
        assert_eq!(
            Direction::Inbound.attachment_table(),
            "InboundMessageAttachments"
        );
        assert_eq!(Direction::Outbound.id_column(), "OutboundMessageID");
    }

    #[test]
    fn test_content_kind_mapping() {
        assert_eq!(ContentKind::from_media_subtype("html"), ContentKind::Html);
        assert_eq!(ContentKind::from_media_subtype("HTML"), ContentKind::Html);
        assert_eq!(ContentKind::from_media_subtype("plain"), ContentKind::Plain);
        assert_eq!(ContentKind::from_media_subtype(""), ContentKind::Plain);
        assert_eq!(ContentKind::Html.content_type(), "text/html");
    }
}
