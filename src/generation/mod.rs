//! Text-generation clients used to answer questions from retrieved context.
//!
//! Sampling parameters are fixed per deployment and come from [`GenerationSettings`]; callers
//! only supply the fully assembled prompt.

mod huggingface;
mod ollama;
mod prompt;

pub use huggingface::HuggingFaceGenerationClient;
pub use ollama::OllamaGenerationClient;
pub use prompt::build_stuff_prompt;

use crate::config::{GenerationProvider, GenerationSettings};
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced while generating an answer.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// Provider was unreachable or the connection failed.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(#[from] reqwest::Error),
    /// Provider returned an error response.
    #[error("Generation provider returned {status}: {body}")]
    GenerationFailed {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Response body, kept for diagnostics.
        body: String,
    },
    /// Provider response could not be parsed.
    #[error("Malformed generation response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for `prompt` using the configured model and parameters.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationClientError>;
}

/// Build the generation client selected by configuration.
pub fn build_generation_client(
    settings: &GenerationSettings,
    timeout_secs: Option<u64>,
) -> Result<Box<dyn GenerationClient>, GenerationClientError> {
    tracing::info!(
        provider = ?settings.provider,
        model = %settings.model,
        "Initializing generation client"
    );
    let client: Box<dyn GenerationClient> = match settings.provider {
        GenerationProvider::HuggingFace => Box::new(HuggingFaceGenerationClient::new(
            settings.clone(),
            timeout_secs,
        )?),
        GenerationProvider::Ollama => {
            Box::new(OllamaGenerationClient::new(settings.clone(), timeout_secs)?)
        }
    };
    Ok(client)
}

async fn error_for_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(provider, %status, "Generation request failed");
    Err(GenerationClientError::GenerationFailed { status, body })
}
