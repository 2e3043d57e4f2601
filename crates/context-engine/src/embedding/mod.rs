pub mod hash;
pub mod lazy;

use thiserror::Error;

pub use hash::HashEmbedder;
pub use lazy::LazyEmbedder;

/// Dimension of the default embedding space.
pub const DEFAULT_DIMENSION: usize = 384;

/// What the vectors will be used for. Asymmetric models encode the two
/// sides of a retrieval differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Embedding inference failed: {0}")]
    Inference(String),
}

/// A loaded model that encodes text into vectors.
pub trait EmbeddingModel: Send + Sync {
    fn dimension(&self) -> usize;
    fn encode(&self, texts: &[String], task: EmbeddingTask)
        -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embeds chunks for the pipeline.
///
/// Returns one vector per input, or an empty vector when embedding failed
/// for any reason. Callers treat empty output as a failure.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;
    fn embed(&self, chunks: &[String], task: EmbeddingTask) -> Vec<Vec<f32>>;
}

pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
