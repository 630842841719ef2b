//! Qdrant HTTP adapter.

use super::{VectorMatch, VectorRecord, VectorStore, VectorStoreError, ensure_success};
use crate::config::QdrantSettings;
use crate::http_client::{build_client, format_endpoint};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Lightweight HTTP client bound to one Qdrant collection.
pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
}

impl QdrantStore {
    /// Construct a client from Qdrant settings.
    pub fn new(settings: QdrantSettings, timeout_secs: Option<u64>) -> Result<Self, VectorStoreError> {
        let client = build_client("pdfchat/qdrant", timeout_secs)?;
        let base_url = normalize_base_url(&settings.url).map_err(VectorStoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            collection = %settings.collection_name,
            has_api_key = settings
                .api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            collection: settings.collection_name,
            api_key: settings.api_key,
        })
    }

    async fn collection_state(&self) -> Result<CollectionState, VectorStoreError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(CollectionState::Missing),
            StatusCode::OK => {
                let info: CollectionInfoResponse = response
                    .json()
                    .await
                    .map_err(|error| VectorStoreError::InvalidResponse(error.to_string()))?;
                Ok(CollectionState::Present {
                    vector_size: info.vector_size(),
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = VectorStoreError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    async fn create_collection(&self, vector_size: usize) -> Result<(), VectorStoreError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });
        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;
        tracing::info!(collection = %self.collection, vector_size, "Collection created");
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_ready(&self, dimension: usize) -> Result<(), VectorStoreError> {
        match self.collection_state().await? {
            CollectionState::Missing => self.create_collection(dimension).await,
            CollectionState::Present {
                vector_size: Some(actual),
            } if actual != dimension => Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual,
            }),
            CollectionState::Present { .. } => {
                tracing::debug!(collection = %self.collection, "Collection ready");
                Ok(())
            }
        }
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, VectorStoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let points: Vec<_> = records
            .into_iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "vector": record.values,
                    "payload": record.metadata,
                })
            })
            .collect();
        let point_count = points.len();

        let response = self
            .request(Method::PUT, &format!("collections/{}/points", self.collection))
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;
        ensure_success(response).await?;
        tracing::debug!(collection = %self.collection, points = point_count, "Points indexed");
        Ok(point_count)
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorStoreError> {
        let body = json!({
            "query": vector,
            "limit": top_k,
            "with_payload": true,
        });
        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let payload: QueryResponse = response
            .json()
            .await
            .map_err(|error| VectorStoreError::InvalidResponse(error.to_string()))?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        Ok(points
            .into_iter()
            .map(|point| VectorMatch {
                id: stringify_point_id(point.id),
                score: point.score,
                metadata: point.payload.unwrap_or_default(),
            })
            .collect())
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

enum CollectionState {
    Missing,
    Present { vector_size: Option<usize> },
}

#[derive(Deserialize)]
struct CollectionInfoResponse {
    result: Value,
}

impl CollectionInfoResponse {
    fn vector_size(&self) -> Option<usize> {
        self.result
            .pointer("/config/params/vectors/size")
            .and_then(Value::as_u64)
            .map(|size| size as usize)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
struct QueryPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}
