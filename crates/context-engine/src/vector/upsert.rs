//! Replaces every point derived from one source document in a single pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use super::{
    Distance, Payload, PayloadFilter, VectorIndex, VectorPoint, VectorStoreError, CHUNK_INDEX_KEY,
    SOURCE_ID_KEY, TEXT_KEY,
};

/// Replaces the full set of points derived from one source document.
pub struct VectorUpsertCoordinator {
    index: Arc<dyn VectorIndex>,
    collection: String,
    dimension: usize,
    collection_ready: AtomicBool,
}

impl VectorUpsertCoordinator {
    pub fn new(index: Arc<dyn VectorIndex>, collection: &str, dimension: usize) -> Self {
        Self {
            index,
            collection: collection.to_string(),
            dimension,
            collection_ready: AtomicBool::new(false),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        if self.collection_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.index
            .ensure_collection(&self.collection, self.dimension, Distance::Cosine)
            .await?;
        self.collection_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Deletes every point previously stored for `source_id`, then writes one
    /// point per chunk in a single batch.
    ///
    /// Each payload carries `metadata` plus `text`, `chunk_index` and
    /// `source_id`; those three keys win over same-named metadata entries.
    /// Inputs are validated before anything is deleted. Returns the number of
    /// points written.
    pub async fn replace_source(
        &self,
        source_id: &str,
        chunks: &[String],
        embeddings: Vec<Vec<f32>>,
        metadata: &Payload,
    ) -> Result<usize, VectorStoreError> {
        let span = tracing::info_span!(
            "vector.replace_source",
            source_id = %source_id,
            chunks = chunks.len(),
            collection = %self.collection,
        );

        async move {
            if chunks.len() != embeddings.len() {
                return Err(VectorStoreError::LengthMismatch {
                    chunks: chunks.len(),
                    embeddings: embeddings.len(),
                });
            }
            if let Some(bad) = embeddings.iter().find(|v| v.len() != self.dimension) {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: bad.len(),
                });
            }

            self.ensure_collection().await?;

            self.index
                .delete_points(&self.collection, &PayloadFilter::source(source_id))
                .await?;
            tracing::debug!("Deleted previous points for source");

            let points: Vec<VectorPoint> = chunks
                .iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, (text, vector))| {
                    let mut payload = metadata.clone();
                    payload.insert(TEXT_KEY.to_string(), Value::from(text.as_str()));
                    payload.insert(CHUNK_INDEX_KEY.to_string(), Value::from(i as u64));
                    payload.insert(SOURCE_ID_KEY.to_string(), Value::from(source_id));
                    VectorPoint {
                        id: uuid::Uuid::new_v4().to_string(),
                        vector,
                        payload,
                    }
                })
                .collect();

            let written = points.len();
            if written > 0 {
                self.index.upsert_points(&self.collection, points).await?;
            }

            tracing::info!(points = written, "Replaced vectors for source");
            Ok(written)
        }
        .instrument(span)
        .await
    }
}
