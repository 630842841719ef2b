//! PDF loading and page chunking.
//!
//! Uploaded PDFs are read page by page and every page is split into overlapping, size-bounded
//! chunks. Chunks never span two pages, so each one can be traced back to the page it came from.

mod chunking;
#[cfg(test)]
pub(crate) mod fixtures;
mod pdf;

pub use chunking::chunk_pages;
pub use pdf::load_pages;

use thiserror::Error;

/// Text extracted from one PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page index within the document.
    pub number: u32,
    /// Extracted text content.
    pub text: String,
}

/// A contiguous slice of page text, sized for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    /// Chunk content, including any overlap carried from the previous chunk.
    pub text: String,
    /// Page the chunk was cut from.
    pub page: u32,
    /// Position of the chunk within its page.
    pub chunk_index: usize,
}

/// Errors raised while reading an uploaded PDF.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// File could not be opened or read.
    #[error("Failed to read PDF file: {0}")]
    Unreadable(#[from] std::io::Error),
    /// File is not a well-formed PDF.
    #[error("Failed to parse PDF: {0}")]
    Corrupt(#[from] lopdf::Error),
    /// PDF is encrypted and cannot be read without a password.
    #[error("PDF is encrypted")]
    Encrypted,
    /// Blocking parse task was cancelled or panicked.
    #[error("PDF parsing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors produced while turning page text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunking was configured with an impossible size budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

