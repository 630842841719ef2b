//! Vector store abstraction with Pinecone and Qdrant backends.
//!
//! A store is bound to the single configured index or collection. The service never creates
//! or administers Pinecone indexes; Qdrant collections are created when missing so a local
//! instance works out of the box.

mod pinecone;
mod qdrant;

pub use pinecone::PineconeStore;
pub use qdrant::QdrantStore;

use crate::config::VectorStoreConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with the vector store.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Base URL or host failed to parse.
    #[error("Invalid vector store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Store responded with an unexpected status code.
    #[error("Unexpected vector store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Store response could not be interpreted.
    #[error("Malformed vector store response: {0}")]
    InvalidResponse(String),
    /// Index dimension differs from the embedding dimension.
    #[error("Index dimension {actual} does not match embedding dimension {expected}")]
    DimensionMismatch {
        /// Configured embedding dimension.
        expected: usize,
        /// Dimension reported by the store.
        actual: usize,
    },
}

/// A chunk embedding ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Unique identifier of the entry.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Payload stored next to the vector; always carries the chunk `text`.
    pub metadata: Map<String, Value>,
}

/// A nearest-neighbour hit returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorMatch {
    /// Identifier of the stored entry.
    pub id: String,
    /// Similarity score, higher is closer.
    pub score: f32,
    /// Stored payload.
    pub metadata: Map<String, Value>,
}

impl VectorMatch {
    /// Chunk text stored with the entry, if any.
    pub fn text(&self) -> Option<&str> {
        self.metadata.get("text").and_then(Value::as_str)
    }
}

/// Storage backend supporting upserts and top-k similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Verify the backing index exists and accepts vectors of `dimension`.
    async fn ensure_ready(&self, dimension: usize) -> Result<(), VectorStoreError>;

    /// Write records, returning how many the store accepted.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, VectorStoreError>;

    /// Return the `top_k` entries most similar to `vector`, best first.
    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, VectorStoreError>;
}

/// Build the vector store selected by configuration.
pub fn build_vector_store(
    config: &VectorStoreConfig,
    timeout_secs: Option<u64>,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    let store: Box<dyn VectorStore> = match config {
        VectorStoreConfig::Pinecone(settings) => {
            Box::new(PineconeStore::new(settings.clone(), timeout_secs)?)
        }
        VectorStoreConfig::Qdrant(settings) => {
            Box::new(QdrantStore::new(settings.clone(), timeout_secs)?)
        }
    };
    Ok(store)
}

/// Turn a non-success response into [`VectorStoreError::UnexpectedStatus`].
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, VectorStoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(VectorStoreError::UnexpectedStatus { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn match_exposes_stored_text() {
        let metadata = json!({ "text": "chunk body", "page": 2 });
        let hit = VectorMatch {
            id: "a".into(),
            score: 0.9,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
        };
        assert_eq!(hit.text(), Some("chunk body"));
    }

    #[test]
    fn match_without_text_yields_none() {
        let hit = VectorMatch {
            id: "a".into(),
            score: 0.1,
            metadata: Map::new(),
        };
        assert_eq!(hit.text(), None);
    }
}
