//! Durable key/value storage for serialized job records.
//!
//! A store only ever sees complete serialized records; merging and
//! validation live in [`crate::jobs::JobManager`].

pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::db::DatabaseError;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

/// Errors raised by a record store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Record store lock poisoned")]
    LockPoisoned,
}

/// Key/value persistence for job records.
///
/// `put` replaces any prior value for the key; there is no partial-field
/// storage.
pub trait RecordStore: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}
