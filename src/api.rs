//! HTTP front door for pdfchat.
//!
//! Every request goes through one catch-all handler that dispatches on method and content type:
//!
//! - `GET` (any path) – liveness greeting, `Hello World.`.
//! - `POST multipart/form-data` – the `file` field is staged to a temporary `.pdf`, ingested,
//!   and the staged copy is removed before the response is written.
//! - `POST application/json` – `{"userprompt": "..."}` is answered from the indexed chunks.
//! - `POST` with any other content type – configurable fallback (greeting or `400`).
//! - `GET /metrics` – pipeline counters as JSON.
//!
//! Requests are handled one at a time; a shared lock is held for the whole request.

use crate::config::FallbackResponse;
use crate::processing::{Answer, IngestError, QueryError, RagApi, UploadedDocument};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const GREETING: &str = "Hello World.\n";
const FALLBACK_GREETING: &str = "Hello World.";
const INGESTED: &str = "pdf data stored to the vector index, temp pdf deleted.\n";

/// Build the HTTP router around a shared pipeline service.
pub fn create_router<S>(service: Arc<S>, fallback: FallbackResponse) -> Router
where
    S: RagApi + 'static,
{
    let gate = Arc::new(Mutex::new(()));
    Router::new()
        .route("/metrics", get(get_metrics::<S>))
        .fallback(front_door::<S>)
        .layer(middleware::from_fn_with_state(gate, serialize_requests))
        .layer(DefaultBodyLimit::disable())
        .with_state(AppState { service, fallback })
}

struct AppState<S> {
    service: Arc<S>,
    fallback: FallbackResponse,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            fallback: self.fallback,
        }
    }
}

/// Request body for question answering.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Natural-language question.
    pub userprompt: String,
}

async fn serialize_requests(
    State(gate): State<Arc<Mutex<()>>>,
    request: Request,
    next: Next,
) -> Response {
    let _permit = gate.lock().await;
    next.run(request).await
}

async fn get_metrics<S>(State(state): State<AppState<S>>) -> Response
where
    S: RagApi,
{
    Json(state.service.metrics_snapshot()).into_response()
}

async fn front_door<S>(State(state): State<AppState<S>>, request: Request) -> Response
where
    S: RagApi,
{
    let method = request.method().clone();
    if method == Method::GET {
        return text_response(StatusCode::OK, GREETING);
    }
    if method != Method::POST {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let result = match RequestKind::from_headers(request.headers()) {
        RequestKind::Multipart => ingest_upload(&state, request).await,
        RequestKind::Json => answer_question(&state, request).await,
        RequestKind::Other => match state.fallback {
            FallbackResponse::Greeting => Ok(text_response(StatusCode::OK, FALLBACK_GREETING)),
            FallbackResponse::Reject => Err(ApiError::UnsupportedContentType),
        },
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

#[derive(Debug, PartialEq, Eq)]
enum RequestKind {
    Multipart,
    Json,
    Other,
}

impl RequestKind {
    fn from_headers(headers: &HeaderMap) -> Self {
        let media_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase());
        match media_type.as_deref() {
            Some("multipart/form-data") => Self::Multipart,
            Some("application/json") => Self::Json,
            _ => Self::Other,
        }
    }
}

async fn ingest_upload<S>(state: &AppState<S>, request: Request) -> Result<Response, ApiError>
where
    S: RagApi,
{
    let mut multipart = Multipart::from_request(request, &()).await.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected multipart request");
        ApiError::InvalidMultipart
    })?;

    let (staged, file_name) = loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::MissingFile),
            Err(error) => {
                tracing::debug!(error = %error, "Malformed multipart body");
                return Err(ApiError::InvalidMultipart);
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let staged = tempfile::Builder::new()
            .prefix("pdfchat-")
            .suffix(".pdf")
            .tempfile()?;
        let mut writer = tokio::fs::File::from_std(staged.as_file().try_clone()?);
        let mut written = 0usize;
        while let Some(bytes) = field.chunk().await.map_err(|error| {
            tracing::debug!(error = %error, "Upload stream interrupted");
            ApiError::InvalidMultipart
        })? {
            written += bytes.len();
            writer.write_all(&bytes).await?;
        }
        writer.flush().await?;
        tracing::debug!(path = %staged.path().display(), bytes = written, "Staged upload");
        break (staged, file_name);
    };

    let document = UploadedDocument::new(staged.path(), file_name);
    let result = state.service.ingest_pdf(&document).await;
    remove_staged(staged);
    let outcome = result?;

    tracing::info!(
        pages = outcome.pages,
        chunks = outcome.chunks_indexed,
        "Upload request completed"
    );
    Ok(text_response(StatusCode::OK, INGESTED))
}

fn remove_staged(staged: NamedTempFile) {
    let path = staged.path().to_path_buf();
    if let Err(error) = staged.close() {
        tracing::warn!(path = %path.display(), error = %error, "Failed to remove staged upload");
    }
}

async fn answer_question<S>(state: &AppState<S>, request: Request) -> Result<Response, ApiError>
where
    S: RagApi,
{
    let body = Bytes::from_request(request, &()).await.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Failed to read request body");
        ApiError::InvalidJson
    })?;
    let chat = parse_chat_request(&body)?;

    let answer = state.service.answer(&chat.userprompt).await?;
    Ok(match answer {
        Answer::Generated(text) => text_response(StatusCode::OK, text),
        Answer::Matches(matches) => Json(matches).into_response(),
    })
}

fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidJson)?;
    let chat: ChatRequest = serde_json::from_value(value).map_err(|_| ApiError::MissingPrompt)?;
    if chat.userprompt.trim().is_empty() {
        return Err(ApiError::EmptyPrompt);
    }
    Ok(chat)
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body.into(),
    )
        .into_response()
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("Invalid JSON format")]
    InvalidJson,
    #[error("Missing required field: userprompt")]
    MissingPrompt,
    #[error("Field userprompt must not be empty")]
    EmptyPrompt,
    #[error("Missing file field")]
    MissingFile,
    #[error("Invalid multipart form data")]
    InvalidMultipart,
    #[error("Unsupported content type")]
    UnsupportedContentType,
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidJson
            | Self::MissingPrompt
            | Self::EmptyPrompt
            | Self::MissingFile
            | Self::InvalidMultipart
            | Self::UnsupportedContentType => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Ingest(IngestError::Document(_)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Uploaded file is not a readable PDF".to_string(),
            ),
            Self::Ingest(IngestError::Embedding(_) | IngestError::VectorStore(_))
            | Self::Query(_) => (
                StatusCode::BAD_GATEWAY,
                "Upstream provider request failed".to_string(),
            ),
            Self::Ingest(IngestError::Chunking(_)) | Self::Io(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        text_response(status, message)
    }
}
