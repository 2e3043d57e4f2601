//! Job record model and the typed patch used to mutate it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Kind of ingestion a job performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    CvIngestion,
    RepoIngestion,
    ProfileIngestion,
}

impl JobType {
    /// Prefix used when generating job ids for this kind of job.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            JobType::CvIngestion => "cv",
            JobType::RepoIngestion => "repo",
            JobType::ProfileIngestion => "profile",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::CvIngestion => "CV_INGESTION",
            JobType::RepoIngestion => "REPO_INGESTION",
            JobType::ProfileIngestion => "PROFILE_INGESTION",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress marker within the ingestion pipeline. Only ever moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStage {
    Queued,
    ExtractingText,
    Vectorization,
    Completed,
}

impl JobStage {
    /// The stage a running job moves to from this one.
    pub fn next(&self) -> Option<JobStage> {
        match self {
            JobStage::Queued => Some(JobStage::ExtractingText),
            JobStage::ExtractingText => Some(JobStage::Vectorization),
            JobStage::Vectorization => Some(JobStage::Completed),
            JobStage::Completed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Queued => "QUEUED",
            JobStage::ExtractingText => "EXTRACTING_TEXT",
            JobStage::Vectorization => "VECTORIZATION",
            JobStage::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome marker, orthogonal to [`JobStage`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs accept no further writes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// PENDING -> RUNNING -> {COMPLETED | FAILED}. A pending job may also
    /// fail directly when it could not be scheduled.
    fn can_become(&self, to: JobStatus) -> bool {
        matches!(
            (self, to),
            (JobStatus::Pending, JobStatus::Pending)
                | (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted ingestion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub job_type: JobType,
    pub job_stage: JobStage,
    pub status: JobStatus,
    /// Human-readable description of the current state.
    pub details: String,
    /// Present only while `status` is `Failed`.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Original upload name.
    #[serde(default)]
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A freshly accepted job: pending, queued, both timestamps equal.
    pub fn new(job_id: &str, job_type: JobType, filename: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_type,
            job_stage: JobStage::Queued,
            status: JobStatus::Pending,
            details: format!(
                "Job '{}' has been created and is waiting to be processed.",
                job_id
            ),
            error_message: None,
            filename: filename.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// The fields a pipeline transition may change.
///
/// Identity, type, filename and `created_at` are not patchable;
/// `updated_at` is always set by [`JobPatch::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    stage: Option<JobStage>,
    status: Option<JobStatus>,
    details: Option<String>,
    error_message: Option<String>,
}

impl JobPatch {
    /// Moves a job into `stage` and marks it running.
    pub fn advance(stage: JobStage, details: impl Into<String>) -> Self {
        Self {
            stage: Some(stage),
            status: Some(JobStatus::Running),
            details: Some(details.into()),
            error_message: None,
        }
    }

    /// Terminal success.
    pub fn complete(details: impl Into<String>) -> Self {
        Self {
            stage: Some(JobStage::Completed),
            status: Some(JobStatus::Completed),
            details: Some(details.into()),
            error_message: None,
        }
    }

    /// Terminal failure. The stage is left where the failure happened.
    pub fn fail(error_message: impl Into<String>) -> Self {
        Self {
            stage: None,
            status: Some(JobStatus::Failed),
            details: Some("Job processing failed.".to_string()),
            error_message: Some(error_message.into()),
        }
    }

    /// Only replaces the details text.
    pub fn note(details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn stage(&self) -> Option<JobStage> {
        self.stage
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.status
    }

    /// Merges this patch over `current` and validates the result.
    ///
    /// Returns the merged record or a human-readable reason the merge is
    /// not a legal transition. Stages move one step at a time, and a job
    /// only completes from RUNNING in VECTORIZATION. `current` is never
    /// modified.
    pub fn apply(&self, current: &Job, now: DateTime<Utc>) -> Result<Job, String> {
        if current.status.is_terminal() {
            return Err(format!(
                "job is already {} and accepts no further updates",
                current.status
            ));
        }

        let mut next = current.clone();

        if let Some(stage) = self.stage {
            if stage < current.job_stage {
                return Err(format!(
                    "stage cannot move backwards from {} to {}",
                    current.job_stage, stage
                ));
            }
            if stage != current.job_stage && current.job_stage.next() != Some(stage) {
                return Err(format!(
                    "stage cannot skip from {} to {}",
                    current.job_stage, stage
                ));
            }
            next.job_stage = stage;
        }

        if let Some(status) = self.status {
            if !current.status.can_become(status) {
                return Err(format!(
                    "status cannot move from {} to {}",
                    current.status, status
                ));
            }
            next.status = status;
        }

        if let Some(ref details) = self.details {
            next.details = details.clone();
        }

        if next.status == JobStatus::Failed {
            let message = self
                .error_message
                .as_ref()
                .filter(|m| !m.trim().is_empty())
                .ok_or_else(|| "a failed job requires a non-empty error message".to_string())?;
            next.error_message = Some(message.clone());
        } else {
            if self.error_message.is_some() {
                return Err(format!(
                    "error message can only be set on a failed job, status is {}",
                    next.status
                ));
            }
            next.error_message = None;
        }

        if (next.status == JobStatus::Completed) != (next.job_stage == JobStage::Completed) {
            return Err(format!(
                "status {} is inconsistent with stage {}",
                next.status, next.job_stage
            ));
        }

        // Strictly increasing even when the clock has not advanced.
        let floor = current.updated_at + Duration::microseconds(1);
        next.updated_at = if now > current.updated_at { now } else { floor };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queued_job() -> Job {
        Job::new("cv:1", JobType::CvIngestion, Some("resume.pdf"), Utc::now())
    }

    /// A running job walked forward stage by stage up to `stage`.
    fn running_at(stage: JobStage) -> Job {
        let mut job = queued_job();
        while job.job_stage < stage {
            let to = job.job_stage.next().unwrap();
            job = JobPatch::advance(to, to.as_str()).apply(&job, Utc::now()).unwrap();
        }
        job
    }

    #[test]
    fn test_new_job_is_pending_and_queued() {
        let job = queued_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.job_stage, JobStage::Queued);
        assert_eq!(job.created_at, job.updated_at);
        assert!(job.details.contains("cv:1"));
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_serialized_field_names_and_values() {
        let job = queued_job();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["job_type"], "CV_INGESTION");
        assert_eq!(value["job_stage"], "QUEUED");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["filename"], "resume.pdf");
        assert!(value["error_message"].is_null());
        assert_eq!(value.as_object().unwrap().len(), 9);
    }

    #[test]
    fn test_json_round_trip_preserves_every_field() {
        let job = queued_job();
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_unknown_enum_value_does_not_deserialize() {
        let job = queued_job();
        let mut value = serde_json::to_value(&job).unwrap();
        value["status"] = serde_json::json!("paused");
        assert!(serde_json::from_value::<Job>(value).is_err());
    }

    #[test]
    fn test_advance_preserves_unspecified_fields() {
        let job = queued_job();
        let next = JobPatch::advance(JobStage::ExtractingText, "Extracting")
            .apply(&job, Utc::now())
            .unwrap();
        assert_eq!(next.job_id, job.job_id);
        assert_eq!(next.filename, job.filename);
        assert_eq!(next.created_at, job.created_at);
        assert_eq!(next.status, JobStatus::Running);
        assert_eq!(next.job_stage, JobStage::ExtractingText);
    }

    #[test]
    fn test_note_keeps_stage_and_status() {
        let job = running_at(JobStage::Vectorization);
        let next = JobPatch::note("still working").apply(&job, Utc::now()).unwrap();
        assert_eq!(next.job_stage, JobStage::Vectorization);
        assert_eq!(next.status, JobStatus::Running);
        assert_eq!(next.details, "still working");
    }

    #[test]
    fn test_updated_at_strictly_increases_with_stalled_clock() {
        let job = queued_job();
        let next = JobPatch::note("x").apply(&job, job.updated_at).unwrap();
        assert!(next.updated_at > job.updated_at);

        let earlier = job.updated_at - Duration::seconds(5);
        let next = JobPatch::note("y").apply(&job, earlier).unwrap();
        assert!(next.updated_at > job.updated_at);
    }

    #[test]
    fn test_stage_regression_rejected() {
        let job = running_at(JobStage::Vectorization);
        let err = JobPatch::advance(JobStage::ExtractingText, "back")
            .apply(&job, Utc::now())
            .unwrap_err();
        assert!(err.contains("backwards"));
    }

    #[test]
    fn test_fail_sets_error_and_keeps_stage() {
        let job = running_at(JobStage::ExtractingText);
        let failed = JobPatch::fail("boom").apply(&job, Utc::now()).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.job_stage, JobStage::ExtractingText);
        assert_eq!(failed.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_fail_requires_message() {
        let err = JobPatch::fail("  ").apply(&queued_job(), Utc::now()).unwrap_err();
        assert!(err.contains("error message"));
    }

    #[test]
    fn test_terminal_job_rejects_updates() {
        let done = JobPatch::complete("done")
            .apply(&running_at(JobStage::Vectorization), Utc::now())
            .unwrap();
        assert!(done.error_message.is_none());
        assert!(JobPatch::note("late").apply(&done, Utc::now()).is_err());
        assert!(JobPatch::fail("late").apply(&done, Utc::now()).is_err());

        let failed = JobPatch::fail("x").apply(&queued_job(), Utc::now()).unwrap();
        assert!(JobPatch::complete("late").apply(&failed, Utc::now()).is_err());
    }

    #[test]
    fn test_stages_cannot_be_skipped() {
        let err = JobPatch::advance(JobStage::Vectorization, "v")
            .apply(&queued_job(), Utc::now())
            .unwrap_err();
        assert!(err.contains("skip"));

        let err = JobPatch::complete("done")
            .apply(&running_at(JobStage::ExtractingText), Utc::now())
            .unwrap_err();
        assert!(err.contains("skip"));
    }

    #[test]
    fn test_pending_job_cannot_complete() {
        let err = JobPatch::complete("done")
            .apply(&queued_job(), Utc::now())
            .unwrap_err();
        assert!(err.contains("stage cannot skip"));

        let status_only = JobPatch {
            stage: None,
            status: Some(JobStatus::Completed),
            details: None,
            error_message: None,
        };
        let err = status_only.apply(&queued_job(), Utc::now()).unwrap_err();
        assert!(err.contains("status cannot move"));
    }

    #[test]
    fn test_pending_job_may_fail_directly() {
        let failed = JobPatch::fail("Failed to schedule job: closed")
            .apply(&queued_job(), Utc::now())
            .unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.job_stage, JobStage::Queued);
    }

    #[test]
    fn test_full_walk_reaches_completed() {
        let done = JobPatch::complete("done")
            .apply(&running_at(JobStage::Vectorization), Utc::now())
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.job_stage, JobStage::Completed);
    }

    #[test]
    fn test_completed_status_requires_completed_stage() {
        let patch = JobPatch {
            stage: None,
            status: Some(JobStatus::Completed),
            details: None,
            error_message: None,
        };
        let err = patch
            .apply(&running_at(JobStage::Vectorization), Utc::now())
            .unwrap_err();
        assert!(err.contains("inconsistent"));
    }

    #[test]
    fn test_job_type_prefixes() {
        assert_eq!(JobType::CvIngestion.id_prefix(), "cv");
        assert_eq!(JobType::RepoIngestion.id_prefix(), "repo");
        assert_eq!(JobType::ProfileIngestion.id_prefix(), "profile");
    }
}
