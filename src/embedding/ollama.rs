//! Ollama `/api/embed` adapter.

use super::{EmbeddingClient, EmbeddingClientError, read_json};
use crate::http_client::{build_client, format_endpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Embedding client for a local Ollama runtime.
pub struct OllamaEmbeddingClient {
    http: Client,
    endpoint: String,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Create a client for `model` served by the runtime at `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: build_client("pdfchat/embeddings", timeout_secs)?,
            endpoint: format_endpoint(base_url, "api/embed"),
            model: model.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await?;
        let body: EmbedResponse = read_json("ollama", response).await?;
        Ok(body.embeddings)
    }
}
