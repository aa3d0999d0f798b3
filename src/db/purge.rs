//! Ticket purge operations: soft delete (mark) and hard purge.
//!
//! Soft delete only flips `IsDeleted` on tickets of a chosen state in a
//! date range. Hard purge permanently removes marked tickets and every
//! child row inside one transaction, children first, and rolls back as
//! a unit on any failure.

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use crate::error::{ExportError, Result};

use super::source::TimeRange;

/// Per-table row counts reported by a hard purge.
#[derive(Debug)]
pub struct PurgeStats {
    /// Number of tickets in scope before deletion.
    pub tickets_in_scope: usize,
    /// `(table, rows deleted)` in deletion order.
    pub deleted: Vec<(&'static str, usize)>,
}

/// Ticket count for one state, as shown in the pre-purge summary.
#[derive(Debug, serde::Serialize)]
pub struct StateCount {
    pub state_id: i64,
    pub label: String,
    pub count: i64,
}

/// Human label for a ticket state id.
pub fn state_label(id: i64) -> String {
    match id {
        1 => "Closed".to_string(),
        2 => "Open".to_string(),
        3 => "On-Hold".to_string(),
        6 => "Marked for Deletion".to_string(),
        _ => format!("State {id}"),
    }
}

fn range_params(range: &TimeRange) -> (String, String) {
    (
        range.start.format("%Y-%m-%d %H:%M:%S").to_string(),
        range.end.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Count non-deleted tickets per state created in the range.
pub fn state_summary(conn: &Connection, range: &TimeRange) -> Result<Vec<StateCount>> {
    let (start, end) = range_params(range);
    let mut stmt = conn.prepare(
        "SELECT T.TicketStateID, S.Name, COUNT(*) \
         FROM Tickets T \
         LEFT JOIN TicketStates S ON S.TicketStateID = T.TicketStateID \
         WHERE T.DateCreated BETWEEN ?1 AND ?2 AND T.IsDeleted = 0 \
         GROUP BY T.TicketStateID, S.Name \
         ORDER BY T.TicketStateID",
    )?;
    let rows = stmt.query_map([&start, &end], |row| {
        let state_id: i64 = row.get(0)?;
        let name: Option<String> = row.get(1)?;
        Ok(StateCount {
            state_id,
            label: name.unwrap_or_else(|| state_label(state_id)),
            count: row.get(2)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(ExportError::from)
}

/// How many tickets a [`mark_for_purge`] call with the same arguments
/// would affect.
pub fn count_candidates(conn: &Connection, range: &TimeRange, state_id: i64) -> Result<usize> {
    let (start, end) = range_params(range);
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM Tickets \
         WHERE IsDeleted = 0 AND TicketStateID = ?1 AND DateCreated BETWEEN ?2 AND ?3",
        rusqlite::params![state_id, start, end],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Mark tickets of `state_id` created in the range as deleted.
///
/// Returns the number of tickets marked.
pub fn mark_for_purge(
    conn: &Connection,
    range: &TimeRange,
    state_id: i64,
    deleted_by: i64,
) -> Result<usize> {
    let (start, end) = range_params(range);
    let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let affected = conn.execute(
        "UPDATE Tickets \
         SET IsDeleted = 1, DeletedBy = ?1, DeletedTime = ?2 \
         WHERE TicketStateID = ?3 AND DateCreated BETWEEN ?4 AND ?5 AND IsDeleted = 0",
        rusqlite::params![deleted_by, now, state_id, start, end],
    )?;
    info!(
        affected,
        state_id,
        label = state_label(state_id),
        deleted_by,
        "Marked tickets for purge"
    );
    Ok(affected)
}

/// Child-table delete statements, parents last. Each is scoped to the
/// `scope` temp table of ticket ids.
const PURGE_STEPS: &[(&str, &str)] = &[
    (
        "InboundMessageAttachments",
        "DELETE FROM InboundMessageAttachments WHERE InboundMessageID IN \
         (SELECT InboundMessageID FROM InboundMessages WHERE TicketID IN (SELECT TicketID FROM PurgeScope))",
    ),
    (
        "OutboundMessageAttachments",
        "DELETE FROM OutboundMessageAttachments WHERE OutboundMessageID IN \
         (SELECT OutboundMessageID FROM OutboundMessages WHERE TicketID IN (SELECT TicketID FROM PurgeScope))",
    ),
    (
        "InboundMessages",
        "DELETE FROM InboundMessages WHERE TicketID IN (SELECT TicketID FROM PurgeScope)",
    ),
    (
        "OutboundMessages",
        "DELETE FROM OutboundMessages WHERE TicketID IN (SELECT TicketID FROM PurgeScope)",
    ),
    (
        "TicketNotes",
        "DELETE FROM TicketNotes WHERE TicketID IN (SELECT TicketID FROM PurgeScope)",
    ),
    (
        "TicketContacts",
        "DELETE FROM TicketContacts WHERE TicketID IN (SELECT TicketID FROM PurgeScope)",
    ),
    (
        "TicketHistory",
        "DELETE FROM TicketHistory WHERE TicketID IN (SELECT TicketID FROM PurgeScope)",
    ),
    (
        "Tickets",
        "DELETE FROM Tickets WHERE TicketID IN (SELECT TicketID FROM PurgeScope)",
    ),
];

/// Permanently delete tickets marked as deleted and created in the range.
pub fn hard_purge(conn: &mut Connection, range: &TimeRange) -> Result<PurgeStats> {
    let (start, end) = range_params(range);
    let tx = conn.transaction()?;

    let result = (|| -> Result<PurgeStats> {
        tx.execute_batch("DROP TABLE IF EXISTS PurgeScope")?;
        tx.execute(
            "CREATE TEMP TABLE PurgeScope AS \
             SELECT TicketID FROM Tickets \
             WHERE IsDeleted = 1 AND DateCreated BETWEEN ?1 AND ?2",
            [&start, &end],
        )?;

        let tickets_in_scope: i64 =
            tx.query_row("SELECT COUNT(*) FROM PurgeScope", [], |row| row.get(0))?;
        info!(tickets = tickets_in_scope, "Tickets to hard delete");

        let mut deleted = Vec::with_capacity(PURGE_STEPS.len());
        for (table, sql) in PURGE_STEPS {
            let rows = tx.execute(sql, [])?;
            info!(table, rows, "Purged rows");
            deleted.push((*table, rows));
        }
        tx.execute_batch("DROP TABLE PurgeScope")?;

        Ok(PurgeStats {
            tickets_in_scope: tickets_in_scope as usize,
            deleted,
        })
    })();

    match result {
        Ok(stats) => {
            tx.commit()?;
            info!("Hard purge complete");
            Ok(stats)
        }
        Err(e) => {
            // Dropping the transaction rolls it back.
            drop(tx);
            Err(ExportError::PurgeFailed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_schema;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        test_schema::create(&conn);
        conn.execute_batch(
            "INSERT INTO TicketStates (TicketStateID, Name) VALUES
               (1, 'Closed'), (2, 'Open');
             INSERT INTO Tickets (TicketID, TicketBoxID, TicketStateID, IsDeleted, DateCreated) VALUES
               (1, NULL, 1, 0, '2024-01-10 12:00:00'),
               (2, NULL, 1, 0, '2024-01-20 12:00:00'),
               (3, NULL, 2, 0, '2024-01-15 12:00:00'),
               (4, NULL, 1, 0, '2025-01-01 12:00:00');
             INSERT INTO InboundMessages
               (InboundMessageID, TicketID, EmailFrom, EmailDateTime, Subject)
               VALUES (10, 1, 'a@x.com', '2024-01-10 13:00:00', 's');
             INSERT INTO Attachments (AttachmentID, AttachmentLocation, FileName)
               VALUES (20, '/tmp/a', 'a');
             INSERT INTO InboundMessageAttachments (InboundMessageID, AttachmentID)
               VALUES (10, 20);
             INSERT INTO TicketNotes (TicketNoteID, TicketID) VALUES (30, 1);",
        )
        .unwrap();
        conn
    }

    fn jan_2024() -> TimeRange {
        TimeRange::from_dates(
            "2024-01-01".parse().unwrap(),
            "2024-01-31".parse().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_preview_matches_marked_rows() {
        let conn = seeded();
        let range = jan_2024();
        let preview = count_candidates(&conn, &range, 1).unwrap();
        let marked = mark_for_purge(&conn, &range, 1, 7).unwrap();
        assert_eq!(preview, 2);
        assert_eq!(marked, preview);

        // Second run finds nothing left to mark
        assert_eq!(mark_for_purge(&conn, &range, 1, 7).unwrap(), 0);
    }

    #[test]
    fn test_mark_sets_audit_columns() {
        let conn = seeded();
        mark_for_purge(&conn, &jan_2024(), 1, 42).unwrap();
        let (deleted_by, deleted_time): (i64, Option<String>) = conn
            .query_row(
                "SELECT DeletedBy, DeletedTime FROM Tickets WHERE TicketID = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(deleted_by, 42);
        assert!(deleted_time.is_some());
    }

    #[test]
    fn test_state_summary() {
        let conn = seeded();
        let summary = state_summary(&conn, &jan_2024()).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].state_id, 1);
        assert_eq!(summary[0].label, "Closed");
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[1].count, 1);
    }

    #[test]
    fn test_hard_purge_removes_marked_tickets_and_children() {
        let mut conn = seeded();
        let range = jan_2024();
        mark_for_purge(&conn, &range, 1, 1).unwrap();

        let stats = hard_purge(&mut conn, &range).unwrap();
        assert_eq!(stats.tickets_in_scope, 2);

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM Tickets", [], |r| r.get(0))
            .unwrap();
        // The open ticket (3) and out-of-range ticket (4) survive
        assert_eq!(remaining, 2);

        for table in ["InboundMessages", "InboundMessageAttachments", "TicketNotes"] {
            let rows: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap();
            assert_eq!(rows, 0, "{table} not emptied");
        }
    }

    #[test]
    fn test_hard_purge_skips_unmarked() {
        let mut conn = seeded();
        let stats = hard_purge(&mut conn, &jan_2024()).unwrap();
        assert_eq!(stats.tickets_in_scope, 0);
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM Tickets", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 4);
    }

    #[test]
    fn test_state_label() {
        assert_eq!(state_label(1), "Closed");
        assert_eq!(state_label(6), "Marked for Deletion");
        assert_eq!(state_label(99), "State 99");
    }
}
