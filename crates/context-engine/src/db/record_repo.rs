//! Key/value statements against the `job_records` table.

use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// Inserts or replaces the value stored under `key`.
pub fn upsert(db: &Database, key: &str, value: &str, updated_at: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO job_records (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, updated_at],
        )?;
        Ok(())
    })
}

/// Finds the raw value stored under `key`.
pub fn find(db: &Database, key: &str) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let value = conn
            .query_row(
                "SELECT value FROM job_records WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value)
    })
}
