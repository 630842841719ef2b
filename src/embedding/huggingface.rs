//! Hugging Face Inference API feature-extraction adapter.

use super::{EmbeddingClient, EmbeddingClientError, read_json};
use crate::http_client::{build_client, format_endpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Texts sent per feature-extraction call.
const BATCH_SIZE: usize = 32;

/// Embedding client backed by the hosted feature-extraction pipeline.
pub struct HuggingFaceEmbeddingClient {
    http: Client,
    endpoint: String,
    api_token: String,
}

impl HuggingFaceEmbeddingClient {
    /// Create a client for `model` served under `base_url`.
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: String,
        timeout_secs: Option<u64>,
    ) -> Result<Self, EmbeddingClientError> {
        Ok(Self {
            http: build_client("pdfchat/embeddings", timeout_secs)?,
            endpoint: format_endpoint(base_url, &format!("pipeline/feature-extraction/{model}")),
            api_token,
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&json!({
                "inputs": batch,
                "options": { "wait_for_model": true }
            }))
            .send()
            .await?;

        let body: FeatureExtractionResponse = read_json("huggingface", response).await?;
        Ok(match body {
            FeatureExtractionResponse::Sentences(vectors) => vectors,
            FeatureExtractionResponse::Tokens(per_text) => {
                per_text.into_iter().map(mean_pool).collect()
            }
        })
    }
}

/// Sentence-transformer models answer with one vector per input; raw encoders answer with one
/// vector per token.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Sentences(Vec<Vec<f32>>),
    Tokens(Vec<Vec<Vec<f32>>>),
}

fn mean_pool(tokens: Vec<Vec<f32>>) -> Vec<f32> {
    let Some(width) = tokens.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut pooled = vec![0.0_f32; width];
    for token in &tokens {
        for (slot, value) in pooled.iter_mut().zip(token) {
            *slot += value;
        }
    }
    let count = tokens.len() as f32;
    for slot in &mut pooled {
        *slot /= count;
    }
    pooled
}

#[async_trait]
impl EmbeddingClient for HuggingFaceEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            tracing::debug!(batch = batch.len(), "Requesting Hugging Face embeddings");
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }
}
