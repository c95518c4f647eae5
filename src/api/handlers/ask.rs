use crate::{
    llm::TextStream,
    types::{AppError, AskRequest, AskResponse, Result, SourcesResponse},
    AppState,
};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use std::convert::Infallible;

fn parse_request(payload: std::result::Result<Json<AskRequest>, JsonRejection>) -> Result<AskRequest> {
    payload
        .map(|Json(request)| request)
        .map_err(|e| AppError::InvalidInput(e.body_text()))
}

/// Plain-text body fed by the completion stream.
///
/// A failure after the first fragment cannot change the status any more, so
/// it is reported in-band as a final `[error]` line.
fn stream_response(mut fragments: TextStream) -> Response {
    let body = async_stream::stream! {
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => yield Ok::<_, Infallible>(text),
                Err(e) => {
                    tracing::error!(error = %e, "answer stream failed");
                    yield Ok(format!("\n[error] {}", e));
                    break;
                }
            }
        }
    };

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response()
}

async fn respond(state: &AppState, request: AskRequest, stream: bool) -> Result<Response> {
    if stream {
        let fragments = state.query.answer_stream(&request.question).await?;
        return Ok(stream_response(fragments));
    }

    let answer = state.query.answer(&request.question).await?;
    Ok(Json(AskResponse {
        question: answer.question,
        answer: answer.answer,
        sources: answer.sources,
    })
    .into_response())
}

/// Answer a question from the indexed documents.
///
/// With `"stream": true` the answer is sent as `text/plain` fragments.
#[utoipa::path(
    post,
    path = "/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer with sources, or the streamed answer text", content(
            (AskResponse = "application/json"),
            (String = "text/plain")
        )),
        (status = 400, description = "No question provided"),
        (status = 500, description = "Embedding, vector store or completion failure")
    ),
    tag = "questions"
)]
pub async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Response> {
    let request = parse_request(payload)?;
    let stream = request.stream;
    respond(&state, request, stream).await
}

/// Stream the answer to a question as plain text.
#[utoipa::path(
    post,
    path = "/stream",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Streamed answer", body = String, content_type = "text/plain"),
        (status = 400, description = "No question provided"),
        (status = 500, description = "Embedding, vector store or completion failure")
    ),
    tag = "questions"
)]
pub async fn stream(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Response> {
    let request = parse_request(payload)?;
    respond(&state, request, true).await
}

/// Sources of the chunks that would answer a question.
#[utoipa::path(
    post,
    path = "/sources",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Matching sources", body = SourcesResponse),
        (status = 400, description = "No question provided"),
        (status = 500, description = "Embedding or vector store failure")
    ),
    tag = "questions"
)]
pub async fn sources(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<SourcesResponse>> {
    let request = parse_request(payload)?;
    let sources = state.query.sources(&request.question).await?;
    Ok(Json(SourcesResponse { sources }))
}
