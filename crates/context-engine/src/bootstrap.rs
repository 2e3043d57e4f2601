//! Builds a ready service from configuration.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, ConnectConfig, StoreBackend, VectorBackend};
use crate::db::Database;
use crate::embedding::{EmbeddingModel, HashEmbedder, LazyEmbedder};
use crate::error::{ConfigError, Result};
use crate::pipeline::PipelineConfig;
use crate::service::{EngineBuilder, IngestionService};
use crate::store::{MemoryRecordStore, RecordStore, SqliteRecordStore};
use crate::telemetry::init_logging;
use crate::vector::{MemoryVectorIndex, QdrantIndex, VectorIndex};

/// Runs `operation` until it succeeds or `policy.attempts` runs are used
/// up, sleeping `policy.wait_secs` between runs. Returns the last error.
pub async fn retry_connect<F, Fut, T, E>(
    what: &str,
    policy: &ConnectConfig,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let wait = Duration::from_secs(policy.wait_secs);
    let mut attempt = 1;

    loop {
        info!("Attempting to connect to {} (attempt {}/{})", what, attempt, attempts);
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(
                    "Connecting to {} failed: {}. Retrying in {}s",
                    what,
                    e,
                    wait.as_secs()
                );
                sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("Giving up connecting to {} after {} attempts: {}", what, attempts, e);
                return Err(e);
            }
        }
    }
}

/// Connects every backend named in `config` and starts the service.
///
/// Installs the global log subscriber with `config.logging.filter` unless
/// the host process already installed one. Must be called from within a
/// tokio runtime.
pub async fn build_engine(config: &Config) -> Result<IngestionService> {
    if let Err(e) = init_logging(&config.logging.filter) {
        debug!("Keeping existing log subscriber: {}", e);
    }

    let store = connect_store(config).await?;
    let index = connect_vector_index(config).await?;

    let dimension = config.embedding.dimension;
    let embedder = LazyEmbedder::new(dimension, move || {
        Ok(Arc::new(HashEmbedder::new(dimension)) as Arc<dyn EmbeddingModel>)
    });

    EngineBuilder::new()
        .pipeline_config(PipelineConfig::from_config(config))
        .key_prefix(&config.store.key_prefix)
        .collection(&config.vector_index.collection)
        .record_store(store)
        .vector_index(index)
        .embedder(Arc::new(embedder))
        .build()
}

async fn connect_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory job record store");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
        StoreBackend::Sqlite => {
            let path = config.store.database_path();
            let db = retry_connect("job record store", &config.connect, || {
                let path = path.clone();
                async move { Database::open(&path) }
            })
            .await?;
            Ok(Arc::new(SqliteRecordStore::new(db)))
        }
    }
}

async fn connect_vector_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    let settings = &config.vector_index;
    match settings.backend {
        VectorBackend::Memory => {
            info!("Using in-memory vector index");
            Ok(Arc::new(MemoryVectorIndex::new()))
        }
        VectorBackend::Qdrant => {
            let url = settings.url.as_deref().ok_or_else(|| ConfigError::Validation {
                message: "vectorIndex.url is required for the qdrant backend".to_string(),
            })?;
            let index = QdrantIndex::new(url, settings.resolve_api_key()?)?;

            retry_connect("Qdrant", &config.connect, || {
                index.collection_exists(&settings.collection)
            })
            .await?;
            info!("Connected to Qdrant at {}", index.base_url());

            Ok(Arc::new(index))
        }
    }
}
