use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{Distance, PayloadFilter, VectorIndex, VectorPoint, VectorStoreError};

struct Collection {
    dimension: usize,
    distance: Distance,
    points: HashMap<String, VectorPoint>,
}

/// In-process vector index for tests and single-process runs.
#[derive(Default)]
pub struct MemoryVectorIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension and distance of a collection, if it exists.
    pub fn collection_config(&self, collection: &str) -> Option<(usize, Distance)> {
        let collections = self.collections.read().ok()?;
        collections
            .get(collection)
            .map(|c| (c.dimension, c.distance))
    }

    /// Points matching `filter`, ordered by their `chunk_index` payload.
    pub fn points(&self, collection: &str, filter: &PayloadFilter) -> Vec<VectorPoint> {
        let Ok(collections) = self.collections.read() else {
            return Vec::new();
        };
        let mut points: Vec<VectorPoint> = collections
            .get(collection)
            .map(|c| {
                c.points
                    .values()
                    .filter(|p| filter.matches(&p.payload))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        points.sort_by_key(|p| {
            p.payload
                .get(super::CHUNK_INDEX_KEY)
                .and_then(|v| v.as_u64())
                .unwrap_or(u64::MAX)
        });
        points
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn collection_exists(&self, collection: &str) -> Result<bool, VectorStoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| VectorStoreError::LockPoisoned)?;
        Ok(collections.contains_key(collection))
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VectorStoreError::LockPoisoned)?;
        collections
            .entry(collection.to_string())
            .or_insert_with(|| {
                tracing::info!(collection, dimension, "Created vector collection");
                Collection {
                    dimension,
                    distance,
                    points: HashMap::new(),
                }
            });
        Ok(())
    }

    async fn delete_points(
        &self,
        collection: &str,
        filter: &PayloadFilter,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VectorStoreError::LockPoisoned)?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::CollectionMissing(collection.to_string()))?;
        target.points.retain(|_, p| !filter.matches(&p.payload));
        Ok(())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VectorStoreError::LockPoisoned)?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::CollectionMissing(collection.to_string()))?;

        // Validate the whole batch before touching anything.
        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                expected: target.dimension,
                actual: bad.vector.len(),
            });
        }

        for point in points {
            target.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn count_points(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
    ) -> Result<usize, VectorStoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| VectorStoreError::LockPoisoned)?;
        let target = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::CollectionMissing(collection.to_string()))?;
        Ok(match filter {
            Some(f) => target.points.values().filter(|p| f.matches(&p.payload)).count(),
            None => target.points.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Payload, SOURCE_ID_KEY};
    use serde_json::json;

    fn point(id: &str, source: &str, dim: usize) -> VectorPoint {
        let mut payload = Payload::new();
        payload.insert(SOURCE_ID_KEY.into(), json!(source));
        VectorPoint {
            id: id.to_string(),
            vector: vec![0.5; dim],
            payload,
        }
    }

    #[tokio::test]
    async fn test_ensure_collection_is_idempotent() {
        let index = MemoryVectorIndex::new();
        assert!(!index.collection_exists("cvs").await.unwrap());

        index.ensure_collection("cvs", 4, Distance::Cosine).await.unwrap();
        index
            .upsert_points("cvs", vec![point("a", "s", 4)])
            .await
            .unwrap();
        index.ensure_collection("cvs", 4, Distance::Cosine).await.unwrap();

        assert!(index.collection_exists("cvs").await.unwrap());
        assert_eq!(index.count_points("cvs", None).await.unwrap(), 1);
        assert_eq!(index.collection_config("cvs"), Some((4, Distance::Cosine)));
    }

    #[tokio::test]
    async fn test_writes_to_missing_collection_fail() {
        let index = MemoryVectorIndex::new();
        let result = index.upsert_points("nope", vec![point("a", "s", 4)]).await;
        assert!(matches!(result, Err(VectorStoreError::CollectionMissing(_))));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejects_whole_batch() {
        let index = MemoryVectorIndex::new();
        index.ensure_collection("cvs", 4, Distance::Cosine).await.unwrap();
        let result = index
            .upsert_points("cvs", vec![point("a", "s", 4), point("b", "s", 3)])
            .await;
        assert!(matches!(
            result,
            Err(VectorStoreError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert_eq!(index.count_points("cvs", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_filter() {
        let index = MemoryVectorIndex::new();
        index.ensure_collection("cvs", 2, Distance::Cosine).await.unwrap();
        index
            .upsert_points(
                "cvs",
                vec![point("a", "one", 2), point("b", "one", 2), point("c", "two", 2)],
            )
            .await
            .unwrap();

        index
            .delete_points("cvs", &PayloadFilter::source("one"))
            .await
            .unwrap();

        let two = PayloadFilter::source("two");
        assert_eq!(index.count_points("cvs", None).await.unwrap(), 1);
        assert_eq!(index.count_points("cvs", Some(&two)).await.unwrap(), 1);
        assert_eq!(index.points("cvs", &two)[0].id, "c");
    }
}
