//! Vector index abstraction and backends.

pub mod memory;
pub mod qdrant;
pub mod upsert;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryVectorIndex;
pub use qdrant::QdrantIndex;
pub use upsert::VectorUpsertCoordinator;

/// Payload key holding the id of the source a point was derived from.
pub const SOURCE_ID_KEY: &str = "source_id";
pub const TEXT_KEY: &str = "text";
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

pub type Payload = Map<String, Value>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Collection '{0}' does not exist")]
    CollectionMissing(String),

    #[error("Vector has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Got {embeddings} embeddings for {chunks} chunks")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("Vector index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vector index returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected vector index response: {0}")]
    InvalidResponse(String),

    #[error("Vector index lock poisoned")]
    LockPoisoned,
}

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// Exact-match condition on a single payload field.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadFilter {
    pub key: String,
    pub value: Value,
}

impl PayloadFilter {
    pub fn must_match(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// All points derived from `source_id`.
    pub fn source(source_id: &str) -> Self {
        Self::must_match(SOURCE_ID_KEY, source_id)
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        payload.get(&self.key) == Some(&self.value)
    }
}

/// The operations the ingestion pipeline needs from a vector database.
///
/// Writes return only after the index acknowledged them.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn collection_exists(&self, collection: &str) -> Result<bool, VectorStoreError>;

    /// Creates the collection unless it already exists. Losing a creation
    /// race to another caller counts as success.
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError>;

    async fn delete_points(
        &self,
        collection: &str,
        filter: &PayloadFilter,
    ) -> Result<(), VectorStoreError>;

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorStoreError>;

    async fn count_points(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
    ) -> Result<usize, VectorStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_filter_matches_only_its_source() {
        let filter = PayloadFilter::source("cv:1");
        let mut payload = Payload::new();
        payload.insert(SOURCE_ID_KEY.into(), json!("cv:1"));
        assert!(filter.matches(&payload));

        payload.insert(SOURCE_ID_KEY.into(), json!("cv:2"));
        assert!(!filter.matches(&payload));
        assert!(!filter.matches(&Payload::new()));
    }

    #[test]
    fn test_distance_serializes_as_qdrant_name() {
        assert_eq!(serde_json::to_value(Distance::Cosine).unwrap(), json!("Cosine"));
    }
}
