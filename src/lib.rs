#![deny(missing_docs)]

//! Core library for pdfchat, a PDF question-answering service.

/// HTTP routing and the request front door.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text extraction and chunking.
pub mod document;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text-generation client abstraction and adapters.
pub mod generation;
mod http_client;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Ingestion and question-answering pipelines.
pub mod processing;
/// Vector store abstraction and backends.
pub mod vector_store;
