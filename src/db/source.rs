//! Record source: the narrow query contract the export pipeline consumes,
//! plus its SQLite implementation against the ticketing schema.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

use crate::error::{ExportError, Result};
use crate::model::message::{AttachmentRef, ContentKind, Direction, MessageRecord};

/// Inclusive timestamp range for message queries.
#[derive(Debug, Clone, Copy)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build an inclusive range from calendar dates: the whole of
    /// `start` through the whole of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ExportError::InvalidDateRange(format!(
                "end date {end} is before start date {start}"
            )));
        }
        let start = start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc();
        let end = end
            .and_hms_opt(23, 59, 59)
            .expect("23:59:59 is valid")
            .and_utc();
        Ok(Self { start, end })
    }
}

/// The record source the export orchestrator pulls from.
///
/// One operation: all messages of a direction whose sent timestamp falls
/// inside the range, ordered by sent timestamp ascending, each with its
/// attachment references resolved.
pub trait MessageSource {
    fn fetch_messages(&self, direction: Direction, range: &TimeRange)
        -> Result<Vec<MessageRecord>>;
}

/// SQLite-backed record source over the ticketing schema
/// (`InboundMessages`/`OutboundMessages`, `Tickets`, `TicketBoxes`,
/// `Attachments`, and the per-direction attachment join tables).
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open the ticketing database read-only queries will run against.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection (used by tests and the purge/totals
    /// commands that share one handle).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn fetch_attachments(&self, direction: Direction, msg_id: i64) -> Result<Vec<AttachmentRef>> {
        let sql = format!(
            "SELECT A.AttachmentLocation, A.FileName \
             FROM {join_table} MA \
             JOIN Attachments A ON MA.AttachmentID = A.AttachmentID \
             WHERE MA.{id_col} = ?1",
            join_table = direction.attachment_table(),
            id_col = direction.id_column(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([msg_id], |row| {
            let location: String = row.get(0)?;
            let filename: Option<String> = row.get(1)?;
            Ok(AttachmentRef {
                location: location.into(),
                filename: filename.unwrap_or_default(),
            })
        })?;

        let mut refs = Vec::new();
        for row in rows {
            let r = row?;
            if r.location.as_os_str().is_empty() {
                continue;
            }
            refs.push(r);
        }
        Ok(refs)
    }
}

impl MessageSource for SqliteSource {
    fn fetch_messages(
        &self,
        direction: Direction,
        range: &TimeRange,
    ) -> Result<Vec<MessageRecord>> {
        let sql = format!(
            "SELECT M.{id_col}, M.EmailFrom, M.EmailPrimaryTo, M.EmailTo, M.EmailCc, \
                    M.EmailReplyTo, M.EmailDateTime, M.Subject, M.Body, M.MediaSubType, \
                    TBox.Name AS TicketBoxName \
             FROM {msg_table} M \
             LEFT JOIN Tickets TK ON M.TicketID = TK.TicketID \
             LEFT JOIN TicketBoxes TBox ON TK.TicketBoxID = TBox.TicketBoxID \
             WHERE M.EmailDateTime BETWEEN ?1 AND ?2 \
             ORDER BY M.EmailDateTime",
            id_col = direction.id_column(),
            msg_table = direction.message_table(),
        );

        // Bind as text in the stored column format so lexicographic
        // BETWEEN matches chronological order.
        let start = range.start.format("%Y-%m-%d %H:%M:%S").to_string();
        let end = range.end.format("%Y-%m-%d %H:%M:%S").to_string();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params![start, end], |row| {
            let sent: chrono::NaiveDateTime = row.get(6)?;
            Ok(MessageRecord {
                id: row.get(0)?,
                direction,
                from_raw: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                primary_to: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                to_raw: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                cc_raw: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                reply_to_raw: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                sent: sent.and_utc(),
                subject: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                body: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                kind: ContentKind::from_media_subtype(
                    &row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                ),
                ticket_box: row.get(10)?,
                attachments: Vec::new(),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        for record in &mut records {
            record.attachments = self.fetch_attachments(direction, record.id)?;
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_schema;

    fn seeded() -> SqliteSource {
        let conn = Connection::open_in_memory().unwrap();
        test_schema::create(&conn);
        conn.execute_batch(
            "INSERT INTO TicketBoxes (TicketBoxID, Name) VALUES (1, 'Support');
             INSERT INTO Tickets (TicketID, TicketBoxID, TicketStateID, IsDeleted, DateCreated)
               VALUES (10, 1, 2, 0, '2024-03-01 09:00:00');
             INSERT INTO InboundMessages
               (InboundMessageID, TicketID, EmailFrom, EmailPrimaryTo, EmailTo, EmailCc,
                EmailReplyTo, EmailDateTime, Subject, Body, MediaSubType)
               VALUES
               (1, 10, 'a@x.com', 'ops@acme.com', '', '', '', '2024-03-02 10:00:00', 'First', 'b1', 'plain'),
               (2, 10, 'b@x.com', '', 'c@x.com', '', '', '2024-03-01 08:00:00', 'Earlier', 'b2', 'html'),
               (3, NULL, 'c@x.com', '', '', '', '', '2024-05-01 00:00:00', 'Out of range', 'b3', 'plain');",
        )
        .unwrap();
        SqliteSource::from_connection(conn)
    }

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::from_dates(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_fetch_ordered_ascending_within_range() {
        let source = seeded();
        let records = source
            .fetch_messages(Direction::Inbound, &range("2024-03-01", "2024-03-31"))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 2);
        assert_eq!(records[1].id, 1);
        assert!(records[0].sent < records[1].sent);
    }

    #[test]
    fn test_range_is_inclusive_of_end_day() {
        let source = seeded();
        let records = source
            .fetch_messages(Direction::Inbound, &range("2024-03-02", "2024-03-02"))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
    }

    #[test]
    fn test_ticket_box_join_and_missing_ticket() {
        let source = seeded();
        let records = source
            .fetch_messages(Direction::Inbound, &range("2024-01-01", "2024-12-31"))
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].ticket_box.as_deref(), Some("Support"));
        // Message 3 has no ticket; the left join yields no box name
        assert_eq!(records[2].ticket_box, None);
    }

    #[test]
    fn test_attachment_refs_resolved() {
        let source = seeded();
        source
            .connection()
            .execute_batch(
                "INSERT INTO Attachments (AttachmentID, AttachmentLocation, FileName)
                   VALUES (100, '/tmp/a.pdf', 'a.pdf'), (101, '', 'empty-loc.pdf');
                 INSERT INTO InboundMessageAttachments (InboundMessageID, AttachmentID)
                   VALUES (1, 100), (1, 101);",
            )
            .unwrap();

        let records = source
            .fetch_messages(Direction::Inbound, &range("2024-03-02", "2024-03-02"))
            .unwrap();
        // The empty-location row is dropped
        assert_eq!(records[0].attachments.len(), 1);
        assert_eq!(records[0].attachments[0].filename, "a.pdf");
    }

    #[test]
    fn test_invalid_range_rejected() {
        let err = TimeRange::from_dates(
            "2024-03-10".parse().unwrap(),
            "2024-03-01".parse().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::InvalidDateRange(_)));
    }
}
