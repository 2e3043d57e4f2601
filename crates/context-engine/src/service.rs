//! Entry points used by the outer transport layer.

use std::sync::Arc;

use crate::embedding::Embedder;
use crate::error::{EngineError, Result};
use crate::extract::{PdfTextExtractor, TextExtractor};
use crate::jobs::{generate_job_id, Job, JobError, JobManager, JobPatch, JobType, DEFAULT_KEY_PREFIX};
use crate::pipeline::{IngestionPipeline, PipelineConfig};
use crate::store::RecordStore;
use crate::vector::{VectorIndex, VectorUpsertCoordinator};
use crate::worker::{IngestionRequest, JobSubmitter, WorkerPool};

pub const DEFAULT_COLLECTION: &str = "personal_gpt_collection";

/// Accepts uploads and answers status queries.
pub struct IngestionService {
    jobs: Arc<JobManager>,
    submitter: Arc<dyn JobSubmitter>,
    pool: Option<Arc<WorkerPool>>,
}

impl IngestionService {
    /// A service that hands work to an arbitrary submitter.
    pub fn new(jobs: Arc<JobManager>, submitter: Arc<dyn JobSubmitter>) -> Self {
        Self {
            jobs,
            submitter,
            pool: None,
        }
    }

    fn with_pool(jobs: Arc<JobManager>, pool: Arc<WorkerPool>) -> Self {
        Self {
            jobs,
            submitter: pool.clone(),
            pool: Some(pool),
        }
    }

    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    pub fn worker_pool(&self) -> Option<&Arc<WorkerPool>> {
        self.pool.as_ref()
    }

    /// Records a new job and schedules its pipeline run.
    ///
    /// Returns the freshly created (PENDING/QUEUED) job without waiting for
    /// the run. If scheduling fails the job is marked FAILED and the error
    /// is returned.
    pub async fn submit_job(
        &self,
        job_type: JobType,
        bytes: Vec<u8>,
        filename: Option<&str>,
    ) -> Result<Job> {
        let job_id = generate_job_id(Some(job_type.id_prefix()));
        let job = self.jobs.create_job(&job_id, job_type, filename).await?;

        let request = IngestionRequest::new(&job_id, job_type, bytes, filename);
        if let Err(e) = self.submitter.submit(request) {
            tracing::error!(job_id = %job_id, "Failed to schedule ingestion job: {}", e);
            let patch = JobPatch::fail(format!("Failed to schedule job: {}", e));
            if let Err(update_err) = self.jobs.update_job(&job_id, &patch).await {
                tracing::error!(job_id = %job_id, "Failed to record scheduling failure: {}", update_err);
            }
            return Err(e.into());
        }

        tracing::info!(job_id = %job_id, "Ingestion job accepted");
        Ok(job)
    }

    pub async fn get_job(&self, job_id: &str) -> std::result::Result<Job, JobError> {
        self.jobs.get_job(job_id).await
    }

    /// Waits for in-flight runs when the service owns its worker pool.
    pub async fn shutdown(&self) {
        if let Some(ref pool) = self.pool {
            pool.shutdown().await;
        }
    }
}

/// Wires the process-wide handles into a ready service.
///
/// The record store, vector index and embedder are required. The extractor
/// defaults to [`PdfTextExtractor`].
pub struct EngineBuilder {
    pipeline: PipelineConfig,
    key_prefix: String,
    collection: String,
    record_store: Option<Arc<dyn RecordStore>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    embedder: Option<Arc<dyn Embedder>>,
    extractor: Arc<dyn TextExtractor>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            record_store: None,
            vector_index: None,
            embedder: None,
            extractor: Arc::new(PdfTextExtractor::new()),
        }
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    pub fn key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    pub fn collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }

    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Builds the service and starts its worker pool on the current tokio
    /// runtime.
    pub fn build(self) -> Result<IngestionService> {
        let store = self
            .record_store
            .ok_or(EngineError::MissingHandle("record store"))?;
        let index = self
            .vector_index
            .ok_or(EngineError::MissingHandle("vector index"))?;
        let embedder = self
            .embedder
            .ok_or(EngineError::MissingHandle("embedder"))?;

        let jobs = Arc::new(JobManager::with_store(store, &self.key_prefix));
        let vectors = Arc::new(VectorUpsertCoordinator::new(
            index,
            &self.collection,
            embedder.dimension(),
        ));

        let pipeline = IngestionPipeline::new(
            &self.pipeline,
            Arc::clone(&jobs),
            self.extractor,
            embedder,
            vectors,
        )
        .map_err(|e| crate::error::ConfigError::Validation {
            message: format!("Invalid chunking settings: {}", e),
        })?;

        let pool = Arc::new(WorkerPool::start(Arc::new(pipeline))?);
        Ok(IngestionService::with_pool(jobs, pool))
    }
}
