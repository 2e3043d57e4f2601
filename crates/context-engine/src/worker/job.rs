use crate::jobs::JobType;

/// An accepted upload waiting to be run through the pipeline.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    pub job_id: String,
    pub job_type: JobType,
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

impl IngestionRequest {
    pub fn new(job_id: &str, job_type: JobType, bytes: Vec<u8>, filename: Option<&str>) -> Self {
        Self {
            job_id: job_id.to_string(),
            job_type,
            bytes,
            filename: filename.map(str::to_string),
        }
    }
}

/// Outcome of one pipeline run. The job record holds the same outcome;
/// this is what the worker pool reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionResult {
    pub job_id: String,
    pub success: bool,
    pub chunks: usize,
    pub points: usize,
    pub error: Option<String>,
}

impl IngestionResult {
    pub fn success(job_id: &str, chunks: usize, points: usize) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: true,
            chunks,
            points,
            error: None,
        }
    }

    pub fn failure(job_id: &str, error: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: false,
            chunks: 0,
            points: 0,
            error: Some(error),
        }
    }
}
