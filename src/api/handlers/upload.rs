use crate::{
    types::{AppError, Result, UploadForm, UploadResponse},
    AppState,
};
use axum::{
    extract::{Multipart, State},
    Json,
};

/// Upload a document and index its chunks.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document indexed", body = UploadResponse),
        (status = 400, description = "No file or empty filename"),
        (status = 415, description = "Unsupported file type"),
        (status = 422, description = "No text could be extracted"),
        (status = 500, description = "Embedding, vector store or log failure")
    ),
    tag = "documents"
)]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {}", e.body_text())))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Malformed upload: {}", e.body_text())))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;
    if filename.trim().is_empty() {
        return Err(AppError::InvalidInput("Empty filename".to_string()));
    }

    let report = state
        .ingestion
        .ingest_upload(&filename, bytes.to_vec())
        .await?;

    Ok(Json(UploadResponse {
        message: format!(
            "Uploaded and indexed {} chunks from {}.",
            report.chunks, report.filename
        ),
        filename: report.filename,
        chunks: report.chunks,
    }))
}
