//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::extract`](crate::rag::extract) - Plain text from PDF, DOCX, TXT and XLSX files
//! - [`rag::chunker`](crate::rag::chunker) - Fixed-width character chunking
//! - [`rag::embeddings`](crate::rag::embeddings) - Hosted embedding API client
//! - [`rag::ingest`](crate::rag::ingest) - Upload → index pipeline
//! - [`rag::query`](crate::rag::query) - Question → answer pipeline
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are extracted, chunked and embedded
//! 2. **Storage** - One vector per chunk, upserted under a deterministic id
//! 3. **Retrieval** - The question is embedded and the nearest chunks fetched
//! 4. **Generation** - The chat model answers with the chunks as context

pub mod chunker;
pub mod embeddings;
pub mod extract;
pub mod ingest;
pub mod query;

pub use chunker::TextChunker;
pub use embeddings::{EmbeddingClient, OpenAIEmbeddings};
pub use ingest::{IngestReport, IngestionPipeline};
pub use query::{Answer, QueryPipeline};
