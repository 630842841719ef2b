//! Hugging Face Inference API text-generation adapter.

use super::{GenerationClient, GenerationClientError, error_for_status};
use crate::config::GenerationSettings;
use crate::http_client::{build_client, format_endpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Client for a hosted text-generation model addressed by repository id.
pub struct HuggingFaceGenerationClient {
    http: Client,
    endpoint: String,
    settings: GenerationSettings,
}

impl HuggingFaceGenerationClient {
    /// Create a client for `settings.model` served under `settings.api_url`.
    pub fn new(
        settings: GenerationSettings,
        timeout_secs: Option<u64>,
    ) -> Result<Self, GenerationClientError> {
        Ok(Self {
            http: build_client("pdfchat/generation", timeout_secs)?,
            endpoint: format_endpoint(&settings.api_url, &format!("models/{}", settings.model)),
            settings,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

#[async_trait]
impl GenerationClient for HuggingFaceGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationClientError> {
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.settings.max_new_tokens,
                "temperature": self.settings.temperature,
                "top_k": self.settings.top_k,
                "repetition_penalty": self.settings.repetition_penalty,
            },
            "options": { "wait_for_model": true }
        });

        let mut request = self.http.post(&self.endpoint).json(&payload);
        if let Some(token) = self.settings.api_key.as_deref() {
            request = request.bearer_auth(token);
        }
        let response = error_for_status("huggingface", request.send().await?).await?;

        let body: GenerationResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Hugging Face response: {error}"
            ))
        })?;
        let generated = match body {
            GenerationResponse::Single(item) => item.generated_text,
            GenerationResponse::Batch(items) => items
                .into_iter()
                .next()
                .map(|item| item.generated_text)
                .ok_or_else(|| {
                    GenerationClientError::InvalidResponse("empty generation batch".into())
                })?,
        };

        // Text-generation endpoints echo the prompt unless `return_full_text` is disabled.
        Ok(match generated.strip_prefix(prompt) {
            Some(completion) => completion.to_string(),
            None => generated,
        })
    }
}
