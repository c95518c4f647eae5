use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Multipart body of `POST /upload`, for the OpenAPI document only.
#[derive(ToSchema)]
pub struct UploadForm {
    /// The document (.pdf, .docx, .txt or .xlsx)
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Response body of a successful `POST /upload`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub chunks: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FilesResponse {
    pub files: Vec<String>,
}

/// One entry of `GET /files/details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileDetail {
    pub filename: String,
    pub chunks: usize,
}

/// Body of `POST /ask`, `POST /stream` and `POST /sources`.
///
/// `question` defaults to empty so that `{}` reaches the handler and is
/// rejected with a JSON error instead of a deserialization failure.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SourcesResponse {
    pub sources: Vec<String>,
}

/// Body of a failed `GET /healthcheck`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthErrorResponse {
    pub status: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub vector_store: String,
    pub dimension: usize,
    pub total_vector_count: u64,
}

// ============= RAG Types =============

/// Metadata stored next to every chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub text: String,
    /// Original filename. Records written by other tools may lack it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A record in the vector index. Re-upserting the same `id` replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One nearest-neighbour match returned by a vector store query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<ChunkMetadata>,
}

/// Summary statistics of a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub dimension: usize,
    pub total_vector_count: u64,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File is empty or failed to extract any text: {0}")]
    EmptyExtraction(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Upload log error: {0}")]
    LogIo(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status the error maps to at the request boundary.
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::EmptyExtraction(_) | AppError::Extraction(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Embedding(_)
            | AppError::VectorStore(_)
            | AppError::Completion(_)
            | AppError::LogIo(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_validation_errors_are_client_errors() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UnsupportedFileType(".csv".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            AppError::EmptyExtraction("a.txt".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_service_errors_are_server_errors() {
        for err in [
            AppError::Embedding("down".into()),
            AppError::VectorStore("down".into()),
            AppError::Completion("down".into()),
            AppError::LogIo("disk".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_ask_request_defaults() {
        let req: AskRequest = serde_json::from_str("{}").unwrap();
        assert!(req.question.is_empty());
        assert!(!req.stream);
    }

    #[test]
    fn test_query_match_without_metadata() {
        let m: QueryMatch = serde_json::from_str(r#"{"id":"a-0","score":0.5}"#).unwrap();
        assert!(m.metadata.is_none());
    }
}
