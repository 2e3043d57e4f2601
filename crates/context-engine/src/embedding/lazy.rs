use std::sync::{Arc, OnceLock};

use super::{Embedder, EmbeddingError, EmbeddingModel, EmbeddingTask};

type Loader = Box<dyn Fn() -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> + Send + Sync>;

/// Loads the wrapped model on first use and reuses it afterwards.
///
/// A failed load is logged and retried on the next call. Two callers racing
/// on the first load may both run the loader; only one result is kept.
pub struct LazyEmbedder {
    dimension: usize,
    loader: Loader,
    model: OnceLock<Arc<dyn EmbeddingModel>>,
}

impl LazyEmbedder {
    pub fn new<F>(dimension: usize, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> + Send + Sync + 'static,
    {
        Self {
            dimension,
            loader: Box::new(loader),
            model: OnceLock::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn model(&self) -> Result<&Arc<dyn EmbeddingModel>, EmbeddingError> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let _span = tracing::info_span!("embedding.load_model").entered();
        let loaded = (self.loader)()?;
        if loaded.dimension() != self.dimension {
            return Err(EmbeddingError::ModelLoad(format!(
                "model produces {} dimensions, expected {}",
                loaded.dimension(),
                self.dimension
            )));
        }
        tracing::info!(dimension = self.dimension, "Embedding model loaded");

        Ok(self.model.get_or_init(|| loaded))
    }
}

impl Embedder for LazyEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, chunks: &[String], task: EmbeddingTask) -> Vec<Vec<f32>> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let model = match self.model() {
            Ok(model) => model,
            Err(e) => {
                tracing::error!("Embedding model unavailable: {}", e);
                return Vec::new();
            }
        };

        let vectors = match model.encode(chunks, task) {
            Ok(vectors) => vectors,
            Err(e) => {
                tracing::error!(chunks = chunks.len(), "Failed to embed chunks: {}", e);
                return Vec::new();
            }
        };

        if vectors.len() != chunks.len() || vectors.iter().any(|v| v.len() != self.dimension) {
            tracing::error!(
                chunks = chunks.len(),
                vectors = vectors.len(),
                "Embedding model returned malformed output"
            );
            return Vec::new();
        }

        vectors
    }
}
