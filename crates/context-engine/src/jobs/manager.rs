//! Job lifecycle manager: the only component that talks to the record store.

use std::sync::{Arc, RwLock};

use chrono::Utc;

use super::error::JobError;
use super::model::{Job, JobPatch, JobType};
use crate::store::RecordStore;

/// Namespace prepended to every job id when forming a store key.
pub const DEFAULT_KEY_PREFIX: &str = "processing_job";

/// Creates, reads and updates job records.
///
/// The store handle is attached after construction; until then every
/// operation fails with [`JobError::StoreUnavailable`]. Store access runs on
/// the blocking pool, so a slow backend never stalls the async workers.
///
/// Each update is a read-modify-write with no cross-call locking, so two
/// writers updating the *same* job id race and the last persist wins.
/// A job id is driven by exactly one pipeline run at a time.
pub struct JobManager {
    store: RwLock<Option<Arc<dyn RecordStore>>>,
    key_prefix: String,
}

impl JobManager {
    /// A manager with no store attached.
    pub fn new(key_prefix: &str) -> Self {
        Self {
            store: RwLock::new(None),
            key_prefix: key_prefix.to_string(),
        }
    }

    /// A manager that is ready to use.
    pub fn with_store(store: Arc<dyn RecordStore>, key_prefix: &str) -> Self {
        let manager = Self::new(key_prefix);
        manager.attach_store(store);
        manager
    }

    /// Attaches (or replaces) the record store handle.
    pub fn attach_store(&self, store: Arc<dyn RecordStore>) {
        let mut guard = match self.store.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job manager store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        *guard = Some(store);
        log::info!("Record store attached to job manager");
    }

    pub fn is_ready(&self) -> bool {
        self.records().is_ok()
    }

    pub fn record_key(&self, job_id: &str) -> String {
        record_key(&self.key_prefix, job_id)
    }

    fn records(&self) -> Result<Records, JobError> {
        let guard = match self.store.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let store = guard.clone().ok_or(JobError::StoreUnavailable)?;
        Ok(Records {
            store,
            key_prefix: self.key_prefix.clone(),
        })
    }

    /// Creates a pending, queued job and persists it.
    ///
    /// An existing record with the same id is replaced by the fresh one.
    pub async fn create_job(
        &self,
        job_id: &str,
        job_type: JobType,
        filename: Option<&str>,
    ) -> Result<Job, JobError> {
        let records = self.records()?;
        let job = Job::new(job_id, job_type, filename, Utc::now());

        blocking(move || {
            if records.contains(&job.job_id)? {
                log::warn!("Job '{}' already exists, resetting its record", job.job_id);
            }
            records.persist(&job)?;
            log::info!("Created new job '{}' of type '{}'", job.job_id, job.job_type);
            Ok(job)
        })
        .await
    }

    /// Fetches a job. A corrupt record is logged and reported as not found.
    pub async fn get_job(&self, job_id: &str) -> Result<Job, JobError> {
        let records = self.records()?;
        let job_id = job_id.to_string();
        blocking(move || records.load(&job_id).map_err(hide_corruption)).await
    }

    /// Applies `patch` over the current record and persists the result.
    ///
    /// Nothing is written when the job is missing or the merged record is
    /// not a legal transition.
    pub async fn update_job(&self, job_id: &str, patch: &JobPatch) -> Result<Job, JobError> {
        let records = self.records()?;
        let job_id = job_id.to_string();
        let patch = patch.clone();
        blocking(move || records.update(&job_id, &patch)).await
    }
}

/// A store handle plus key namespace, moved onto the blocking pool.
struct Records {
    store: Arc<dyn RecordStore>,
    key_prefix: String,
}

impl Records {
    fn key(&self, job_id: &str) -> String {
        record_key(&self.key_prefix, job_id)
    }

    fn contains(&self, job_id: &str) -> Result<bool, JobError> {
        Ok(self.store.get(&self.key(job_id))?.is_some())
    }

    fn load(&self, job_id: &str) -> Result<Job, JobError> {
        let raw = self
            .store
            .get(&self.key(job_id))?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        serde_json::from_str(&raw).map_err(|source| {
            log::error!("Error decoding stored record for job '{}': {}", job_id, source);
            JobError::CorruptRecord {
                job_id: job_id.to_string(),
                source,
            }
        })
    }

    fn persist(&self, job: &Job) -> Result<(), JobError> {
        let json = serde_json::to_string(job).map_err(|source| JobError::Serialize {
            job_id: job.job_id.clone(),
            source,
        })?;
        self.store.put(&self.key(&job.job_id), &json)?;
        Ok(())
    }

    fn update(&self, job_id: &str, patch: &JobPatch) -> Result<Job, JobError> {
        let current = match self.load(job_id).map_err(hide_corruption) {
            Ok(job) => job,
            Err(JobError::NotFound(id)) => {
                log::warn!("Job '{}' not found for update", id);
                return Err(JobError::NotFound(id));
            }
            Err(e) => return Err(e),
        };

        let updated = patch.apply(&current, Utc::now()).map_err(|reason| {
            log::error!("Rejected update for job '{}': {}", job_id, reason);
            JobError::InvalidTransition {
                job_id: job_id.to_string(),
                reason,
            }
        })?;

        self.persist(&updated)?;

        log::info!(
            "Updated job '{}'. New status: {}, Stage: {}",
            job_id,
            updated.status,
            updated.job_stage
        );
        Ok(updated)
    }
}

fn record_key(prefix: &str, job_id: &str) -> String {
    format!("{}:{}", prefix, job_id)
}

async fn blocking<T, F>(f: F) -> Result<T, JobError>
where
    F: FnOnce() -> Result<T, JobError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| JobError::StoreTask(e.to_string()))?
}

fn hide_corruption(err: JobError) -> JobError {
    match err {
        JobError::CorruptRecord { job_id, .. } => JobError::NotFound(job_id),
        other => other,
    }
}
