use crate::{
    rag::query::DEFAULT_INDEXED_SOURCES_LIMIT,
    types::{FileDetail, FilesResponse, Result},
    AppState,
};
use axum::{extract::State, Json};

/// Filenames recorded in the upload log, sorted.
#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "Uploaded filenames", body = FilesResponse)
    ),
    tag = "documents"
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FilesResponse>> {
    let files = state.upload_log.files().await?;
    Ok(Json(FilesResponse { files }))
}

/// Uploaded filenames with the chunk count of their latest ingestion.
#[utoipa::path(
    get,
    path = "/files/details",
    responses(
        (status = 200, description = "Filenames and chunk counts", body = [FileDetail])
    ),
    tag = "documents"
)]
pub async fn file_details(State(state): State<AppState>) -> Result<Json<Vec<FileDetail>>> {
    let details = state.upload_log.details().await?;
    Ok(Json(details))
}

/// Distinct sources found in the vector index itself.
#[utoipa::path(
    get,
    path = "/files/indexed",
    responses(
        (status = 200, description = "Sources present in the index", body = FilesResponse),
        (status = 500, description = "Vector store failure")
    ),
    tag = "documents"
)]
pub async fn indexed_files(State(state): State<AppState>) -> Result<Json<FilesResponse>> {
    let files = state
        .query
        .indexed_sources(DEFAULT_INDEXED_SOURCES_LIMIT)
        .await?;
    Ok(Json(FilesResponse { files }))
}
