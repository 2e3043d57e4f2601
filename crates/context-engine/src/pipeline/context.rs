use serde_json::Value;

use crate::jobs::{JobStage, JobType};
use crate::vector::Payload;
use crate::worker::job::IngestionRequest;

pub struct PipelineContext {
    // Input
    pub job_id: String,
    pub job_type: JobType,
    pub filename: Option<String>,
    /// Taken by the extraction step.
    pub bytes: Vec<u8>,

    // Stage the job was last moved into
    pub stage: JobStage,

    // Extraction result
    pub text: Option<String>,

    // Vectorization results
    pub chunks: Vec<String>,
    pub points: usize,
}

impl PipelineContext {
    pub fn new(request: IngestionRequest) -> Self {
        Self {
            job_id: request.job_id,
            job_type: request.job_type,
            filename: request.filename,
            bytes: request.bytes,
            stage: JobStage::Queued,
            text: None,
            chunks: Vec::new(),
            points: 0,
        }
    }

    /// Payload fields shared by every point stored for this job.
    pub fn base_metadata(&self) -> Payload {
        let mut metadata = Payload::new();
        metadata.insert("job_type".to_string(), Value::from(self.job_type.as_str()));
        if let Some(ref filename) = self.filename {
            metadata.insert("filename".to_string(), Value::from(filename.as_str()));
        }
        metadata
    }
}
