use chrono::Utc;

use super::{RecordStore, StoreError};
use crate::db::{record_repo, Database};

/// Record store backed by the SQLite `job_records` table.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl RecordStore for SqliteRecordStore {
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        record_repo::upsert(&self.db, key, value, &Utc::now().to_rfc3339())?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(record_repo::find(&self.db, key)?)
    }
}
