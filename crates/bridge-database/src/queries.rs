//! Standalone query functions that work with any Connection.
//!
//! Each function is a single SQL statement, so each one is atomic under
//! SQLite's autocommit.

use crate::{DatabaseResult, QueueRecord};
use rusqlite::{params, Connection};

/// Insert a new record with `retries = 0` and return its id.
pub fn insert_event(conn: &Connection, event_json: &str) -> DatabaseResult<i64> {
    conn.execute(
        "INSERT INTO event_queue (event_json) VALUES (?1)",
        params![event_json],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get the record with the smallest pending id.
pub fn get_oldest_event(conn: &Connection) -> DatabaseResult<Option<QueueRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, event_json, retries FROM event_queue ORDER BY id ASC LIMIT 1",
    )?;

    let result = stmt.query_row([], map_record);

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List up to `limit` pending records in delivery order.
pub fn list_events(conn: &Connection, limit: usize) -> DatabaseResult<Vec<QueueRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, event_json, retries FROM event_queue ORDER BY id ASC LIMIT ?1",
    )?;

    let records = stmt
        .query_map(params![limit as i64], map_record)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Increment the retry counter of a record. Returns false if it no longer exists.
pub fn increment_event_retries(conn: &Connection, id: i64) -> DatabaseResult<bool> {
    let count = conn.execute(
        "UPDATE event_queue SET retries = COALESCE(retries, 0) + 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}

/// Delete a record. Returns false if it was already absent.
pub fn delete_event(conn: &Connection, id: i64) -> DatabaseResult<bool> {
    let count = conn.execute("DELETE FROM event_queue WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Count pending records.
pub fn count_events(conn: &Connection) -> DatabaseResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM event_queue", [], |row| row.get(0))?;
    Ok(count as u64)
}

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueRecord> {
    Ok(QueueRecord {
        id: row.get(0)?,
        payload: row.get(1)?,
        retries: row.get::<_, Option<u32>>(2)?.unwrap_or(0),
    })
}
