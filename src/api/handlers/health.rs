use crate::{
    types::{HealthErrorResponse, HealthResponse, IndexStats, Result},
    AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

async fn check_dependencies(state: &AppState) -> Result<IndexStats> {
    state.embedder.embed("healthcheck").await?;
    state.vector_store.stats().await
}

/// Check that the embedding API and the vector index are reachable.
#[utoipa::path(
    get,
    path = "/healthcheck",
    responses(
        (status = 200, description = "All dependencies reachable", body = HealthResponse),
        (status = 500, description = "A dependency failed", body = HealthErrorResponse)
    ),
    tag = "health"
)]
pub async fn healthcheck(State(state): State<AppState>) -> Response {
    match check_dependencies(&state).await {
        Ok(stats) => Json(HealthResponse {
            status: "ok".to_string(),
            vector_store: state.vector_store.provider_name().to_string(),
            dimension: stats.dimension,
            total_vector_count: stats.total_vector_count,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthErrorResponse {
                    status: "error".to_string(),
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
