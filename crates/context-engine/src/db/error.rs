use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create database directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// The file was written by a newer build with migrations this one lacks.
    #[error("Database schema v{found} is newer than supported v{supported}")]
    NewerSchema { found: u32, supported: u32 },

    #[error("Database lock poisoned")]
    LockPoisoned,
}
