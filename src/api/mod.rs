//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Documents
//! - `POST /upload` - Upload a document (multipart field `file`) and index it
//! - `GET /files` - Uploaded filenames
//! - `GET /files/details` - Uploaded filenames with chunk counts
//! - `GET /files/indexed` - Sources present in the vector index
//!
//! ## Questions
//! - `POST /ask` - Answer a question (JSON, or streamed with `"stream": true`)
//! - `POST /stream` - Answer a question as a streamed plain-text body
//! - `POST /sources` - Sources that would answer a question
//!
//! ## Health
//! - `GET /healthcheck` - Embedding API and vector index reachability
//!
//! # OpenAPI Documentation
//!
//! The OpenAPI document is served at `/api-docs/openapi.json`.

use crate::types::{
    AskRequest, AskResponse, FileDetail, FilesResponse, HealthErrorResponse, HealthResponse,
    SourcesResponse, UploadForm, UploadResponse,
};
use utoipa::OpenApi;

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::upload::upload,
        handlers::files::list_files,
        handlers::files::file_details,
        handlers::files::indexed_files,
        handlers::ask::ask,
        handlers::ask::stream,
        handlers::ask::sources,
        handlers::health::healthcheck,
    ),
    components(schemas(
        UploadForm,
        UploadResponse,
        FilesResponse,
        FileDetail,
        AskRequest,
        AskResponse,
        SourcesResponse,
        HealthResponse,
        HealthErrorResponse,
    )),
    tags(
        (name = "documents", description = "Document upload and listing"),
        (name = "questions", description = "Retrieval-augmented question answering"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
