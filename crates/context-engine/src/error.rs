use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] crate::jobs::JobError),

    #[error("Record store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] crate::vector::VectorStoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// A required collaborator was not supplied to the builder.
    #[error("Missing required handle: {0}")]
    MissingHandle(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Environment variable '{name}' is not set")]
    EnvVarNotSet { name: String },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed")]
    ChannelClosed,

    #[error("Failed to start worker: {0}")]
    SpawnFailed(String),
}
