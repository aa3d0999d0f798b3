//! Totals reporting: enabled agents and ticket counts by state.

use rusqlite::Connection;

use crate::error::{ExportError, Result};

use super::purge::state_label;

/// The states the totals report covers.
const REPORTED_STATES: &[i64] = &[1, 2, 3, 6];

#[derive(Debug, serde::Serialize)]
pub struct Totals {
    pub enabled_agents: i64,
    pub tickets_by_state: Vec<StateTotal>,
}

#[derive(Debug, serde::Serialize)]
pub struct StateTotal {
    pub state_id: i64,
    pub label: String,
    pub count: i64,
}

/// Gather the totals report from the ticketing database.
pub fn totals(conn: &Connection) -> Result<Totals> {
    let enabled_agents: i64 = conn.query_row(
        "SELECT COUNT(*) FROM Agents WHERE IsEnabled = 1",
        [],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT TicketStateID, COUNT(*) FROM Tickets \
         WHERE TicketStateID IN (1, 2, 3, 6) \
         GROUP BY TicketStateID \
         ORDER BY TicketStateID",
    )?;
    let rows = stmt.query_map([], |row| {
        let state_id: i64 = row.get(0)?;
        Ok(StateTotal {
            state_id,
            label: state_label(state_id),
            count: row.get(1)?,
        })
    })?;
    let tickets_by_state = rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(ExportError::from)?;

    Ok(Totals {
        enabled_agents,
        tickets_by_state,
    })
}

/// Whether a state id appears in the totals report.
pub fn is_reported_state(id: i64) -> bool {
    REPORTED_STATES.contains(&id)
}
