//! # ragline - Retrieval-augmented question answering over uploaded documents
//!
//! Documents (PDF, DOCX, TXT, XLSX) are uploaded over HTTP, split into
//! fixed-width chunks, embedded with a hosted embedding model and stored in a
//! Pinecone index. Questions are answered by a chat model using the
//! best-matching chunks as context, either as one JSON response or as a
//! streamed plain-text body.
//!
//! ## Overview
//!
//! ragline can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `ragline-server` binary
//! 2. **As a library** - Build the pipelines and router yourself
//!
//! ### Library Example
//!
//! ```rust,ignore
//! use ragline::{build_app, AppState};
//! use ragline::db::{InMemoryVectorStore, UploadLog};
//! use std::sync::Arc;
//!
//! let log = UploadLog::open("./data").await?;
//! let state = AppState::new(embedder, Arc::new(InMemoryVectorStore::new(1536)), llm, log, &config.rag);
//! let app = build_app(state, config.server.max_upload_bytes);
//! axum::serve(listener, app).await?;
//! ```
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`db`] - Vector stores and the upload log
//! - [`llm`] - Chat completion clients
//! - [`rag`] - Extraction, chunking, embeddings and the two pipelines
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Vector stores and the upload log.
pub mod db;
/// Chat completion clients.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

use crate::db::{UploadLog, VectorStore};
use crate::llm::LLMClient;
use crate::rag::{EmbeddingClient, IngestionPipeline, QueryPipeline, TextChunker};
use crate::utils::config::RagConfig;
use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types
pub use types::{AppError, Result};
pub use utils::Config;

/// Shared handles available to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionPipeline>,
    pub query: Arc<QueryPipeline>,
    pub upload_log: UploadLog,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub vector_store: Arc<dyn VectorStore>,
}

impl AppState {
    /// Wire both pipelines over the given clients.
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMClient>,
        upload_log: UploadLog,
        rag: &RagConfig,
    ) -> Self {
        let mut ingestion = IngestionPipeline::new(
            embedder.clone(),
            vector_store.clone(),
            upload_log.clone(),
            TextChunker::new(rag.chunk_size),
        );
        if let Some(dir) = &rag.spool_dir {
            ingestion = ingestion.with_spool_dir(dir);
        }
        let query = QueryPipeline::new(embedder.clone(), vector_store.clone(), llm, rag.top_k);

        Self {
            ingestion: Arc::new(ingestion),
            query: Arc::new(query),
            upload_log,
            embedder,
            vector_store,
        }
    }
}

/// The complete HTTP application: routes, request tracing, permissive CORS
/// and the upload size limit.
pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    api::routes::create_router()
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
