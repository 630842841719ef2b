//! Vector record construction for ingested chunks.

use crate::document::DocumentChunk;
use crate::vector_store::VectorRecord;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// Build the record stored for one chunk.
///
/// Every record gets a fresh UUID, so ingesting the same PDF twice yields two entries per
/// chunk that share a `chunk_hash`.
pub(crate) fn build_record(
    chunk: DocumentChunk,
    values: Vec<f32>,
    source: &str,
    ingested_at: &str,
) -> VectorRecord {
    let mut metadata = Map::new();
    metadata.insert("chunk_hash".into(), Value::String(compute_chunk_hash(&chunk.text)));
    metadata.insert("source".into(), Value::String(source.to_string()));
    metadata.insert("page".into(), Value::from(chunk.page));
    metadata.insert("chunk_index".into(), Value::from(chunk.chunk_index));
    metadata.insert("ingested_at".into(), Value::String(ingested_at.to_string()));
    metadata.insert("text".into(), Value::String(chunk.text));

    VectorRecord {
        id: Uuid::new_v4().to_string(),
        values,
        metadata,
    }
}

/// Deterministic SHA-256 hash of the chunk text.
pub(crate) fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for record metadata.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
