//! Ingestion and question-answering pipelines.

mod records;
mod service;
mod types;

pub use service::{PipelineSettings, RagApi, RagService};
pub use types::{
    Answer, IngestError, IngestOutcome, QueryError, ServiceInitError, UploadedDocument,
};
