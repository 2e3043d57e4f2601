//! Ordered schema migrations, tracked with SQLite's `user_version`.

use rusqlite::{Connection, TransactionBehavior};

use super::error::DatabaseError;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create job_records",
        sql: include_str!("sql/001_create_job_records.sql"),
    },
    Migration {
        version: 2,
        name: "index job_records.updated_at",
        sql: include_str!("sql/002_index_job_records_updated_at.sql"),
    },
];

/// Highest schema version this build knows how to produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

pub fn schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
}

/// Brings the schema up to [`latest_version`]. Each step commits together
/// with its version bump, so a failed step leaves the previous version.
pub fn migrate(conn: &mut Connection) -> Result<(), DatabaseError> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DatabaseError::NewerSchema { found, supported });
    }

    for step in MIGRATIONS.iter().filter(|m| m.version > found) {
        log::info!("Applying schema migration v{} ({})", step.version, step.name);

        let failed = |e: rusqlite::Error| DatabaseError::Migration {
            version: step.version,
            reason: e.to_string(),
        };
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(failed)?;
        tx.execute_batch(step.sql).map_err(failed)?;
        tx.pragma_update(None, "user_version", step.version)
            .map_err(failed)?;
        tx.commit().map_err(failed)?;
    }

    Ok(())
}
