//! RAG service coordinating PDF parsing, chunking, embedding, storage and generation.

use crate::{
    config::{AnswerMode, ChunkingSettings, Config},
    document::{chunk_pages, load_pages},
    embedding::{EmbeddingClient, EmbeddingClientError, build_embedding_client, validate_embeddings},
    generation::{GenerationClient, build_generation_client, build_stuff_prompt},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        records::{build_record, current_timestamp_rfc3339},
        types::{Answer, IngestError, IngestOutcome, QueryError, ServiceInitError, UploadedDocument},
    },
    vector_store::{VectorMatch, VectorStore, VectorStoreError, build_vector_store},
};
use async_trait::async_trait;

/// Abstraction over the pipelines used by the HTTP front door and the CLI.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Parse, chunk, embed and index an uploaded PDF.
    async fn ingest_pdf(&self, document: &UploadedDocument) -> Result<IngestOutcome, IngestError>;

    /// Answer a question from the indexed chunks.
    async fn answer(&self, question: &str) -> Result<Answer, QueryError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Pipeline parameters fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Chunk size and overlap, in characters.
    pub chunking: ChunkingSettings,
    /// Dimension every embedding must have.
    pub embedding_dimension: usize,
    /// Number of matches retrieved per question.
    pub top_k: usize,
    /// Whether questions are answered by generation or by raw matches.
    pub answer_mode: AnswerMode,
    /// Trim whitespace around generated answers.
    pub trim_answer: bool,
}

impl PipelineSettings {
    /// Extract pipeline parameters from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking: config.chunking,
            embedding_dimension: config.embedding.dimension,
            top_k: config.retrieval_top_k,
            answer_mode: config.answer_mode,
            trim_answer: config.trim_answer,
        }
    }
}

/// Owns the provider clients and runs both pipelines.
///
/// One embedding client serves ingestion and retrieval, so stored chunks and questions always
/// land in the same vector space. Build the service once at startup and share it via `Arc`.
pub struct RagService {
    embedding_client: Box<dyn EmbeddingClient>,
    vector_store: Box<dyn VectorStore>,
    generation_client: Box<dyn GenerationClient>,
    settings: PipelineSettings,
    metrics: PipelineMetrics,
}

impl RagService {
    /// Assemble a service from already-built clients.
    pub fn new(
        embedding_client: Box<dyn EmbeddingClient>,
        vector_store: Box<dyn VectorStore>,
        generation_client: Box<dyn GenerationClient>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedding_client,
            vector_store,
            generation_client,
            settings,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Build every provider client described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        let timeout = config.provider_timeout_secs;
        let embedding_client = build_embedding_client(&config.embedding, timeout)?;
        let vector_store = build_vector_store(&config.vector_store, timeout)?;
        let generation_client = build_generation_client(&config.generation, timeout)?;
        Ok(Self::new(
            embedding_client,
            vector_store,
            generation_client,
            PipelineSettings::from_config(config),
        ))
    }

    /// Check that the vector store is reachable and sized for the configured embeddings.
    pub async fn ensure_ready(&self) -> Result<(), VectorStoreError> {
        self.vector_store
            .ensure_ready(self.settings.embedding_dimension)
            .await
    }

    async fn run_ingest(&self, document: &UploadedDocument) -> Result<IngestOutcome, IngestError> {
        let source = document.source_name();
        tracing::info!(source = %source, "Processing document");

        let pages = load_pages(&document.path).await?;
        let chunks = chunk_pages(&pages, self.settings.chunking)?;
        tracing::debug!(
            pages = pages.len(),
            chunks = chunks.len(),
            chunk_size = self.settings.chunking.chunk_size,
            overlap = self.settings.chunking.chunk_overlap,
            "Document chunked"
        );
        if chunks.is_empty() {
            tracing::warn!(source = %source, "Document has no extractable text; nothing indexed");
            return Ok(IngestOutcome {
                pages: pages.len(),
                chunks_indexed: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedding_client.generate_embeddings(texts).await?;
        validate_embeddings(&vectors, chunks.len(), self.settings.embedding_dimension)?;

        let ingested_at = current_timestamp_rfc3339();
        let records = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, values)| build_record(chunk, values, &source, &ingested_at))
            .collect();
        let chunks_indexed = self.vector_store.upsert(records).await?;

        tracing::info!(source = %source, pages = pages.len(), chunks = chunks_indexed, "Document indexed");
        Ok(IngestOutcome {
            pages: pages.len(),
            chunks_indexed,
        })
    }

    async fn run_query(&self, question: &str) -> Result<Answer, QueryError> {
        let vector = self
            .embedding_client
            .generate_embeddings(vec![question.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingClientError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;
        validate_embeddings(
            std::slice::from_ref(&vector),
            1,
            self.settings.embedding_dimension,
        )?;

        let matches = self.vector_store.query(vector, self.settings.top_k).await?;
        tracing::debug!(matches = matches.len(), top_k = self.settings.top_k, "Retrieved context");

        match self.settings.answer_mode {
            AnswerMode::Matches => Ok(Answer::Matches(matches)),
            AnswerMode::Generate => {
                let contexts: Vec<&str> = matches.iter().filter_map(VectorMatch::text).collect();
                let prompt = build_stuff_prompt(&contexts, question);
                let generated = self.generation_client.generate(&prompt).await?;
                let answer = if self.settings.trim_answer {
                    generated.trim().to_string()
                } else {
                    generated
                };
                Ok(Answer::Generated(answer))
            }
        }
    }
}

#[async_trait]
impl RagApi for RagService {
    async fn ingest_pdf(&self, document: &UploadedDocument) -> Result<IngestOutcome, IngestError> {
        let result = self.run_ingest(document).await;
        match &result {
            Ok(outcome) => self.metrics.record_document(outcome.chunks_indexed as u64),
            Err(error) => {
                tracing::error!(error = %error, "Document ingestion failed");
                self.metrics.record_failure();
            }
        }
        result
    }

    async fn answer(&self, question: &str) -> Result<Answer, QueryError> {
        let result = self.run_query(question).await;
        match &result {
            Ok(_) => self.metrics.record_answer(),
            Err(error) => {
                tracing::error!(error = %error, "Question answering failed");
                self.metrics.record_failure();
            }
        }
        result
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
