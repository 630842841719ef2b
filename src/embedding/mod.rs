//! Embedding client abstraction and provider adapters.
//!
//! A single client is built from [`EmbeddingSettings`] and shared by ingestion and retrieval,
//! so stored chunks and incoming questions are always embedded by the same model.

mod huggingface;
mod ollama;
mod openai;

pub use huggingface::HuggingFaceEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// HTTP layer failed before a response arrived.
    #[error("Embedding provider unreachable: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("Embedding provider returned {status}: {body}")]
    GenerationFailed {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Response body, kept for diagnostics.
        body: String,
    },
    /// Provider response could not be interpreted.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Provider returned a different number of vectors than texts sent.
    #[error("Embedding provider returned {actual} vectors for {expected} inputs")]
    CountMismatch {
        /// Number of texts submitted.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured embedding dimension.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Build the embedding client selected by configuration.
pub fn build_embedding_client(
    settings: &EmbeddingSettings,
    timeout_secs: Option<u64>,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::info!(
        provider = ?settings.provider,
        model = %settings.model,
        dimension = settings.dimension,
        "Initializing embedding client"
    );
    let client: Box<dyn EmbeddingClient> = match settings.provider {
        EmbeddingProvider::HuggingFace => Box::new(HuggingFaceEmbeddingClient::new(
            &settings.api_url,
            &settings.model,
            settings.api_key.clone().unwrap_or_default(),
            timeout_secs,
        )?),
        EmbeddingProvider::OpenAI => Box::new(OpenAiEmbeddingClient::new(
            &settings.api_url,
            &settings.model,
            settings.api_key.clone().unwrap_or_default(),
            timeout_secs,
        )?),
        EmbeddingProvider::Ollama => Box::new(OllamaEmbeddingClient::new(
            &settings.api_url,
            &settings.model,
            timeout_secs,
        )?),
    };
    Ok(client)
}

/// Check that a provider returned one vector per input, each of the configured dimension.
pub fn validate_embeddings(
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<(), EmbeddingClientError> {
    if vectors.len() != expected_count {
        return Err(EmbeddingClientError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Decode a provider response, mapping error statuses and malformed bodies.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T, EmbeddingClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(provider, %status, "Embedding request failed");
        return Err(EmbeddingClientError::GenerationFailed { status, body });
    }
    response.json().await.map_err(|error| {
        EmbeddingClientError::InvalidResponse(format!("failed to decode {provider} response: {error}"))
    })
}
