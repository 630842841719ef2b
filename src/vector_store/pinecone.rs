//! Pinecone REST adapter.

use super::{VectorMatch, VectorRecord, VectorStore, VectorStoreError, ensure_success};
use crate::config::PineconeSettings;
use crate::http_client::{build_client, format_endpoint};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

const UPSERT_BATCH_SIZE: usize = 100;
const DEFAULT_CONTROL_PLANE: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

/// Client for a single Pinecone index.
///
/// The data-plane host comes from `PINECONE_HOST` when configured; otherwise it is looked up
/// once through the control plane and cached for the life of the process.
pub struct PineconeStore {
    http: Client,
    settings: PineconeSettings,
    host: OnceCell<String>,
}

impl PineconeStore {
    /// Construct a client from Pinecone settings.
    pub fn new(
        settings: PineconeSettings,
        timeout_secs: Option<u64>,
    ) -> Result<Self, VectorStoreError> {
        let http = build_client("pdfchat/pinecone", timeout_secs)?;
        let host = OnceCell::new();
        if let Some(explicit) = settings.host.as_deref() {
            let _ = host.set(normalize_host(explicit)?);
        }
        tracing::debug!(
            index = %settings.index_name,
            environment = ?settings.environment,
            explicit_host = settings.host.is_some(),
            "Initialized Pinecone client"
        );
        Ok(Self {
            http,
            settings,
            host,
        })
    }

    fn describe_url(&self) -> String {
        let index = &self.settings.index_name;
        match (&self.settings.controller_url, &self.settings.environment) {
            (Some(base), Some(_)) => format_endpoint(base, &format!("databases/{index}")),
            (Some(base), None) => format_endpoint(base, &format!("indexes/{index}")),
            (None, Some(env)) => {
                format!("https://controller.{env}.pinecone.io/databases/{index}")
            }
            (None, None) => format_endpoint(DEFAULT_CONTROL_PLANE, &format!("indexes/{index}")),
        }
    }

    async fn describe_index(&self) -> Result<IndexDescription, VectorStoreError> {
        let response = self
            .authorized(Method::GET, self.describe_url())
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: DescribeIndexResponse = response
            .json()
            .await
            .map_err(|error| VectorStoreError::InvalidResponse(error.to_string()))?;
        Ok(body.into_description())
    }

    async fn data_plane_host(&self) -> Result<&str, VectorStoreError> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let description = self.describe_index().await?;
                let host = description.host.ok_or_else(|| {
                    VectorStoreError::InvalidResponse(format!(
                        "index '{}' description has no host",
                        self.settings.index_name
                    ))
                })?;
                normalize_host(&host)
            })
            .await?;
        Ok(host.as_str())
    }

    fn authorized(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Api-Key", &self.settings.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn upsert_batch(
        &self,
        host: &str,
        batch: &[VectorRecord],
    ) -> Result<usize, VectorStoreError> {
        let vectors: Vec<PineconeVector<'_>> = batch
            .iter()
            .map(|record| PineconeVector {
                id: &record.id,
                values: &record.values,
                metadata: &record.metadata,
            })
            .collect();
        let response = self
            .authorized(Method::POST, format_endpoint(host, "vectors/upsert"))
            .json(&UpsertRequest {
                vectors,
                namespace: self.settings.namespace.as_deref(),
            })
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: UpsertResponse = response
            .json()
            .await
            .map_err(|error| VectorStoreError::InvalidResponse(error.to_string()))?;
        Ok(body.upserted_count)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn ensure_ready(&self, dimension: usize) -> Result<(), VectorStoreError> {
        if self.settings.host.is_some() {
            tracing::debug!(
                index = %self.settings.index_name,
                "Using configured Pinecone host; skipping index description"
            );
            return Ok(());
        }

        let description = self.describe_index().await?;
        if let Some(actual) = description.dimension
            && actual != dimension
        {
            return Err(VectorStoreError::DimensionMismatch {
                expected: dimension,
                actual,
            });
        }
        if let Some(host) = description.host {
            let _ = self.host.set(normalize_host(&host)?);
        }
        tracing::info!(index = %self.settings.index_name, dimension, "Pinecone index ready");
        Ok(())
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, VectorStoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let host = self.data_plane_host().await?;
        let mut upserted = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            upserted += self.upsert_batch(host, batch).await?;
        }
        tracing::debug!(
            index = %self.settings.index_name,
            records = records.len(),
            upserted,
            "Vectors upserted"
        );
        Ok(upserted)
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorStoreError> {
        let host = self.data_plane_host().await?;
        let response = self
            .authorized(Method::POST, format_endpoint(host, "query"))
            .json(&QueryRequest {
                vector: &vector,
                top_k,
                include_metadata: true,
                include_values: false,
                namespace: self.settings.namespace.as_deref(),
            })
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|error| VectorStoreError::InvalidResponse(error.to_string()))?;

        Ok(body
            .matches
            .into_iter()
            .map(|hit| VectorMatch {
                id: hit.id,
                score: hit.score,
                metadata: hit.metadata.unwrap_or_default(),
            })
            .collect())
    }
}

fn normalize_host(host: &str) -> Result<String, VectorStoreError> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(VectorStoreError::InvalidUrl(host.to_string()));
    }
    let url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    reqwest::Url::parse(&url).map_err(|error| VectorStoreError::InvalidUrl(error.to_string()))?;
    Ok(url)
}

struct IndexDescription {
    host: Option<String>,
    dimension: Option<usize>,
}

/// Covers both the current control plane (`host`, `dimension` at the top level) and the legacy
/// per-environment controller (`database.dimension`, `status.host`).
#[derive(Deserialize)]
struct DescribeIndexResponse {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    database: Option<LegacyDatabase>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Deserialize)]
struct LegacyDatabase {
    #[serde(default)]
    dimension: Option<usize>,
}

#[derive(Deserialize)]
struct IndexStatus {
    #[serde(default)]
    host: Option<String>,
}

impl DescribeIndexResponse {
    fn into_description(self) -> IndexDescription {
        IndexDescription {
            host: self.host.or(self.status.and_then(|status| status.host)),
            dimension: self
                .dimension
                .or(self.database.and_then(|database| database.dimension)),
        }
    }
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Map<String, Value>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}
