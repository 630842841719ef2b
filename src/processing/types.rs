//! Core data types and error definitions for the ingestion and question pipelines.

use crate::{
    document::{ChunkingError, DocumentError},
    embedding::EmbeddingClientError,
    generation::GenerationClientError,
    vector_store::{VectorMatch, VectorStoreError},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A PDF staged on local disk for the duration of one ingestion.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Location of the staged file.
    pub path: PathBuf,
    /// File name supplied by the client, if any.
    pub file_name: Option<String>,
}

impl UploadedDocument {
    /// Describe a staged file with an optional client-supplied name.
    pub fn new(path: impl Into<PathBuf>, file_name: Option<String>) -> Self {
        Self {
            path: path.into(),
            file_name,
        }
    }

    /// Name recorded as the `source` of every chunk cut from this document.
    pub fn source_name(&self) -> String {
        self.file_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| display_path(&self.path))
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Pages that contained extractable text.
    pub pages: usize,
    /// Entries written to the vector store.
    pub chunks_indexed: usize,
}

/// Result of the question-answering pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// Text produced by the generation model.
    Generated(String),
    /// Ranked matches returned without generation.
    Matches(Vec<VectorMatch>),
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Upload could not be read as a PDF.
    #[error("Failed to read document: {0}")]
    Document(#[from] DocumentError),
    /// Page text could not be chunked.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed or returned unusable vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store rejected the write.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors emitted by the question-answering pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Embedding provider failed or returned an unusable vector.
    #[error("Failed to embed question: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Similarity search failed.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] VectorStoreError),
    /// Generation provider failed.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] GenerationClientError),
}

/// Errors raised while constructing provider clients at startup.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Embedding client could not be built.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector store client could not be built.
    #[error("Failed to initialize vector store client: {0}")]
    VectorStore(#[from] VectorStoreError),
    /// Generation client could not be built.
    #[error("Failed to initialize generation client: {0}")]
    Generation(#[from] GenerationClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_prefers_client_file_name() {
        let document = UploadedDocument::new("/tmp/.tmpA1b2.pdf", Some("handbook.pdf".into()));
        assert_eq!(document.source_name(), "handbook.pdf");
    }

    #[test]
    fn source_falls_back_to_staged_path() {
        let document = UploadedDocument::new("/tmp/.tmpA1b2.pdf", Some("  ".into()));
        assert_eq!(document.source_name(), "/tmp/.tmpA1b2.pdf");
    }
}
