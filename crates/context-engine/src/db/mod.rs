//! SQLite persistence for job records.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

pub mod error;
pub mod migrations;
pub mod record_repo;

pub use error::DatabaseError;

/// How long a statement waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to one migrated SQLite connection.
///
/// Clones share the connection; statements run one at a time under its
/// mutex.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens the file at `path`, creating it and its parent directories if
    /// needed, and migrates it to the current schema.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| DatabaseError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        migrations::migrate(&mut conn)?;

        log::info!("Job record database ready at {}", path.display());
        Ok(Self::wrap(conn))
    }

    /// A private in-memory database, gone when the last clone drops.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let mut conn = Connection::open_in_memory()?;
        migrations::migrate(&mut conn)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` while holding the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    pub fn schema_version(&self) -> Result<u32, DatabaseError> {
        self.with_conn(migrations::schema_version)
    }
}

/// `~/.context-engine/data/jobs.db`, when a home directory is known.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".context-engine").join("data").join("jobs.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_database_is_migrated() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), migrations::latest_version());
    }

    #[test]
    fn test_open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("jobs.db");

        Database::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_parent_that_is_a_file_reports_create_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        match Database::open(&blocker.join("jobs.db")) {
            Err(DatabaseError::CreateDir { path, .. }) => assert_eq!(path, blocker),
            other => panic!("expected CreateDir, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        let db = Database::open(&path).unwrap();
        record_repo::upsert(&db, "processing_job:cv:1", "{}", "2026-01-01T00:00:00Z").unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert_eq!(
            record_repo::find(&reopened, "processing_job:cv:1").unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn test_default_database_path() {
        if let Some(path) = default_database_path() {
            assert!(path.ends_with(".context-engine/data/jobs.db"));
        }
    }

    #[test]
    fn test_clones_share_one_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();

        record_repo::upsert(&db, "k", "v", "t").unwrap();
        assert_eq!(record_repo::find(&other, "k").unwrap().as_deref(), Some("v"));
    }
}
