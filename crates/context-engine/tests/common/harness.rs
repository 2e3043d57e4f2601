//! Test harness for isolated test execution.
//!
//! The `TestHarness` owns a temp directory plus the in-process backends a
//! service runs over, so tests can submit uploads and then inspect both the
//! job records and the stored vectors.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use context_engine::db::Database;
use context_engine::embedding::HashEmbedder;
use context_engine::jobs::{Job, JobManager, JobType, DEFAULT_KEY_PREFIX};
use context_engine::pipeline::{IngestionPipeline, PipelineConfig};
use context_engine::store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
use context_engine::vector::{MemoryVectorIndex, PayloadFilter, VectorPoint, VectorUpsertCoordinator};
use context_engine::{EngineBuilder, IngestionService, PdfTextExtractor};

pub const COLLECTION: &str = "harness_collection";
pub const DIMENSION: usize = 32;

pub struct TestHarness {
    temp_dir: TempDir,
    pub store: Arc<dyn RecordStore>,
    pub index: Arc<MemoryVectorIndex>,
    pub embedder: Arc<HashEmbedder>,
    pub pipeline_config: PipelineConfig,
    pub service: IngestionService,
}

impl TestHarness {
    /// Harness over an in-memory record store.
    pub fn new() -> Self {
        Self::build(None, small_chunks())
    }

    /// Harness over a SQLite file inside the temp directory.
    pub fn with_sqlite() -> Self {
        Self::build(Some("jobs.db"), small_chunks())
    }

    pub fn with_chunking(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::build(
            None,
            PipelineConfig {
                chunk_size,
                chunk_overlap,
            },
        )
    }

    fn build(sqlite_file: Option<&str>, pipeline_config: PipelineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let store: Arc<dyn RecordStore> = match sqlite_file {
            Some(name) => {
                let db = Database::open(&temp_dir.path().join(name))
                    .expect("Failed to open test database");
                Arc::new(SqliteRecordStore::new(db))
            }
            None => Arc::new(MemoryRecordStore::new()),
        };
        let index = Arc::new(MemoryVectorIndex::new());
        let embedder = Arc::new(HashEmbedder::new(DIMENSION));

        let service = EngineBuilder::new()
            .pipeline_config(pipeline_config.clone())
            .collection(COLLECTION)
            .record_store(Arc::clone(&store))
            .vector_index(index.clone())
            .embedder(embedder.clone())
            .extractor(Arc::new(PdfTextExtractor::new()))
            .build()
            .expect("Failed to build service");

        Self {
            temp_dir,
            store,
            index,
            embedder,
            pipeline_config,
            service,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.temp_dir.path().join("jobs.db")
    }

    /// Submit a CV upload and return the freshly created job.
    pub async fn submit(&self, bytes: Vec<u8>, filename: &str) -> Job {
        self.service
            .submit_job(JobType::CvIngestion, bytes, Some(filename))
            .await
            .expect("Failed to submit job")
    }

    /// Wait for every submitted run to finish.
    pub async fn finish(&self) {
        self.service.shutdown().await;
    }

    pub async fn job(&self, job_id: &str) -> Job {
        self.service.get_job(job_id).await.expect("Job should exist")
    }

    /// Points stored for a job, ordered by chunk index.
    pub fn points(&self, job_id: &str) -> Vec<VectorPoint> {
        self.index.points(COLLECTION, &PayloadFilter::source(job_id))
    }

    /// A standalone pipeline over the same store and index, for driving
    /// runs directly.
    pub fn pipeline(&self) -> IngestionPipeline {
        let jobs = Arc::new(JobManager::with_store(
            Arc::clone(&self.store),
            DEFAULT_KEY_PREFIX,
        ));
        let vectors = Arc::new(VectorUpsertCoordinator::new(
            self.index.clone(),
            COLLECTION,
            DIMENSION,
        ));
        IngestionPipeline::new(
            &self.pipeline_config,
            jobs,
            Arc::new(PdfTextExtractor::new()),
            self.embedder.clone(),
            vectors,
        )
        .expect("Failed to build pipeline")
    }
}

fn small_chunks() -> PipelineConfig {
    PipelineConfig {
        chunk_size: 60,
        chunk_overlap: 10,
    }
}
