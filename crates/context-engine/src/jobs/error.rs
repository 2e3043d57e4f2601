use thiserror::Error;

use crate::store::StoreError;

/// Errors from the job lifecycle manager.
#[derive(Error, Debug)]
pub enum JobError {
    /// The manager has no record store attached yet.
    #[error("Job record store is not initialized")]
    StoreUnavailable,

    #[error("Job '{0}' not found")]
    NotFound(String),

    /// Stored bytes exist but do not deserialize into a job.
    #[error("Stored record for job '{job_id}' is corrupt: {source}")]
    CorruptRecord {
        job_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The merged record failed validation; nothing was written.
    #[error("Invalid update for job '{job_id}': {reason}")]
    InvalidTransition { job_id: String, reason: String },

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// The blocking task that ran the store call panicked or was cancelled.
    #[error("Job store task failed: {0}")]
    StoreTask(String),

    #[error("Failed to serialize job '{job_id}': {source}")]
    Serialize {
        job_id: String,
        #[source]
        source: serde_json::Error,
    },
}
