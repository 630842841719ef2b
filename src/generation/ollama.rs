//! Ollama `/api/generate` adapter.

use super::{GenerationClient, GenerationClientError, error_for_status};
use crate::config::GenerationSettings;
use crate::http_client::{build_client, format_endpoint};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Client issuing non-streaming completions against a local Ollama runtime.
pub struct OllamaGenerationClient {
    http: Client,
    endpoint: String,
    settings: GenerationSettings,
}

impl OllamaGenerationClient {
    /// Create a client for `settings.model` served by the runtime at `settings.api_url`.
    pub fn new(
        settings: GenerationSettings,
        timeout_secs: Option<u64>,
    ) -> Result<Self, GenerationClientError> {
        Ok(Self {
            http: build_client("pdfchat/generation", timeout_secs)?,
            endpoint: format_endpoint(&settings.api_url, "api/generate"),
            settings,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerationClient for OllamaGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationClientError> {
        let payload = json!({
            "model": self.settings.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": self.settings.max_new_tokens,
                "temperature": self.settings.temperature,
                "top_k": self.settings.top_k,
                "repeat_penalty": self.settings.repetition_penalty,
            }
        });

        let response = self.http.post(&self.endpoint).json(&payload).send().await?;
        let response = error_for_status("ollama", response).await?;

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(GenerationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationProvider;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> OllamaGenerationClient {
        OllamaGenerationClient::new(
            GenerationSettings {
                provider: GenerationProvider::Ollama,
                model: "llama3".into(),
                api_url: server.base_url(),
                api_key: None,
                max_new_tokens: 128,
                temperature: 0.5,
                top_k: 30,
                repetition_penalty: 1.03,
            },
            None,
        )
        .expect("client")
    }

    #[tokio::test]
    async fn completion_is_returned() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate").json_body(json!({
                    "model": "llama3",
                    "prompt": "Say hi",
                    "stream": false,
                    "options": {
                        "num_predict": 128,
                        "temperature": 0.5,
                        "top_k": 30,
                        "repeat_penalty": 1.03
                    }
                }));
                then.status(200)
                    .json_body(json!({ "response": "hi", "done": true }));
            })
            .await;

        let answer = client(&server).generate("Say hi").await.expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, "hi");
    }

    #[tokio::test]
    async fn incomplete_response_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let error = client(&server).generate("Say hi").await.unwrap_err();

        assert!(matches!(error, GenerationClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client(&server).generate("Say hi").await.unwrap_err();

        assert!(matches!(
            error,
            GenerationClientError::GenerationFailed { status, .. } if status.as_u16() == 500
        ));
    }
}
