use crate::api::ApiDoc;
use crate::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

pub fn create_router() -> Router<AppState> {
    let document_routes = Router::new()
        .route("/upload", post(crate::api::handlers::upload::upload))
        .route("/files", get(crate::api::handlers::files::list_files))
        .route(
            "/files/details",
            get(crate::api::handlers::files::file_details),
        )
        .route(
            "/files/indexed",
            get(crate::api::handlers::files::indexed_files),
        );

    let question_routes = Router::new()
        .route("/ask", post(crate::api::handlers::ask::ask))
        .route("/stream", post(crate::api::handlers::ask::stream))
        .route("/sources", post(crate::api::handlers::ask::sources));

    let service_routes = Router::new()
        .route(
            "/healthcheck",
            get(crate::api::handlers::health::healthcheck),
        )
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );

    document_routes.merge(question_routes).merge(service_routes)
}
