//! Ticketing-database access: the export record source plus the purge
//! and totals maintenance operations.

pub mod purge;
pub mod source;
pub mod totals;

/// Shared fixture schema for unit tests (mirrors the production tables
/// the queries touch).
#[cfg(test)]
pub(crate) mod test_schema {
    use rusqlite::Connection;

    pub fn create(conn: &Connection) {
        conn.execute_batch(include_str!("../../tests/fixtures/schema.sql"))
            .expect("fixture schema");
    }
}
