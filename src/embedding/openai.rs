//! OpenAI `/v1/embeddings` adapter.

use super::{EmbeddingClient, EmbeddingClientError, read_json};
use crate::http_client::{build_client, format_endpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BATCH_SIZE: usize = 256;

/// Embedding client for the hosted OpenAI embeddings API.
pub struct OpenAiEmbeddingClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiEmbeddingClient {
    /// Create a client for `model` using the API rooted at `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        timeout_secs: Option<u64>,
    ) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: build_client("pdfchat/embeddings", timeout_secs)?,
            endpoint: format_endpoint(base_url, "v1/embeddings"),
            model: model.to_string(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let response = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&EmbeddingRequest {
                    model: &self.model,
                    input: batch,
                })
                .send()
                .await?;
            let mut body: EmbeddingResponse = read_json("openai", response).await?;
            body.data.sort_by_key(|item| item.index);
            vectors.extend(body.data.into_iter().map(|item| item.embedding));
        }
        Ok(vectors)
    }
}
