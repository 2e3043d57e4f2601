//! Qdrant backend over its REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

use super::{Distance, PayloadFilter, VectorIndex, VectorPoint, VectorStoreError};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Cap on error bodies carried into errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

pub struct QdrantIndex {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantIndex {
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, VectorStoreError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, VectorStoreError> {
        let response = self.authorized(request).send().await?;
        read_result(response).await
    }
}

async fn read_result(response: Response) -> Result<Value, VectorStoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(VectorStoreError::Api {
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    let body: Value = response.json().await?;
    body.get("result")
        .cloned()
        .ok_or_else(|| VectorStoreError::InvalidResponse("missing 'result' field".to_string()))
}

fn truncate(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", cut)
    } else {
        body.to_string()
    }
}

fn filter_body(filter: &PayloadFilter) -> Value {
    json!({
        "must": [
            { "key": filter.key, "match": { "value": filter.value } }
        ]
    })
}

fn create_collection_body(dimension: usize, distance: Distance) -> Value {
    json!({
        "vectors": { "size": dimension, "distance": distance }
    })
}

fn upsert_body(points: &[VectorPoint]) -> Value {
    json!({ "points": points })
}

fn count_body(filter: Option<&PayloadFilter>) -> Value {
    match filter {
        Some(f) => json!({ "filter": filter_body(f), "exact": true }),
        None => json!({ "exact": true }),
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn collection_exists(&self, collection: &str) -> Result<bool, VectorStoreError> {
        let url = self.url(&format!("/collections/{}/exists", collection));
        let result = self.send(self.client.get(url)).await?;
        result
            .get("exists")
            .and_then(Value::as_bool)
            .ok_or_else(|| VectorStoreError::InvalidResponse("missing 'exists' flag".to_string()))
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        if self.collection_exists(collection).await? {
            return Ok(());
        }

        let url = self.url(&format!("/collections/{}", collection));
        let request = self
            .client
            .put(url)
            .json(&create_collection_body(dimension, distance));
        let response = self.authorized(request).send().await?;

        if response.status() == StatusCode::CONFLICT {
            tracing::debug!(collection, "Collection created concurrently");
            return Ok(());
        }
        read_result(response).await?;

        tracing::info!(collection, dimension, "Created Qdrant collection");
        Ok(())
    }

    async fn delete_points(
        &self,
        collection: &str,
        filter: &PayloadFilter,
    ) -> Result<(), VectorStoreError> {
        let url = self.url(&format!("/collections/{}/points/delete?wait=true", collection));
        let body = json!({ "filter": filter_body(filter) });
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorStoreError> {
        let url = self.url(&format!("/collections/{}/points?wait=true", collection));
        self.send(self.client.put(url).json(&upsert_body(&points)))
            .await?;
        Ok(())
    }

    async fn count_points(
        &self,
        collection: &str,
        filter: Option<&PayloadFilter>,
    ) -> Result<usize, VectorStoreError> {
        let url = self.url(&format!("/collections/{}/points/count", collection));
        let result = self
            .send(self.client.post(url).json(&count_body(filter)))
            .await?;
        result
            .get("count")
            .and_then(Value::as_u64)
            .map(|c| c as usize)
            .ok_or_else(|| VectorStoreError::InvalidResponse("missing 'count' field".to_string()))
    }
}
