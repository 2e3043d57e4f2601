//! FNV-1a bag-of-words embedder.
//!
//! Deterministic and dependency free. It captures lexical overlap only, so
//! it serves as the offline default and as the embedder in tests.

use super::{l2_normalize, Embedder, EmbeddingError, EmbeddingModel, EmbeddingTask};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Tokens shorter than this are ignored.
const MIN_TOKEN_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dimension: super::DEFAULT_DIMENSION,
        }
    }
}

impl HashEmbedder {
    /// A zero dimension is bumped to one.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        for token in tokenize(text) {
            let hash = fnv1a_hash(token.to_lowercase().as_bytes());
            let index = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 1 { 1.0 } else { -1.0 };
            embedding[index] += sign;
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl EmbeddingModel for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, chunks: &[String], _task: EmbeddingTask) -> Vec<Vec<f32>> {
        chunks.iter().map(|c| self.embed_one(c)).collect()
    }
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_TOKEN_LEN)
}
