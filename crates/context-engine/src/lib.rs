pub mod bootstrap;
pub mod chunking;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod vector;
pub mod worker;

pub use bootstrap::build_engine;
pub use chunking::TextSplitter;
pub use config::{load_config, Config};
pub use embedding::{Embedder, EmbeddingTask, HashEmbedder, LazyEmbedder};
pub use error::{ConfigError, EngineError, Result, WorkerError};
pub use extract::{PdfTextExtractor, TextExtractor};
pub use jobs::{generate_job_id, Job, JobError, JobManager, JobPatch, JobStage, JobStatus, JobType};
pub use pipeline::{IngestionPipeline, PipelineConfig, PipelineError};
pub use service::{EngineBuilder, IngestionService};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
pub use telemetry::init_logging;
pub use vector::{MemoryVectorIndex, QdrantIndex, VectorIndex, VectorUpsertCoordinator};
pub use worker::{IngestionRequest, IngestionResult, WorkerPool};
