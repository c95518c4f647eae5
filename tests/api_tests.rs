mod common;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use common::mocks::{MockEmbeddingClient, MockLLMClient};
use common::{test_context, three_chunk_text, TestContext};
use ragline::build_app;
use ragline::types::{AskResponse, FileDetail, UploadResponse};
use serde_json::json;

const ANSWER: &str = "The report is due on Friday.";

async fn create_test_server(llm: MockLLMClient, embedder: MockEmbeddingClient) -> (TestServer, TestContext) {
    let ctx = test_context(llm, embedder).await;
    let app = build_app(ctx.state.clone(), 1024 * 1024);
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, ctx)
}

async fn default_server() -> (TestServer, TestContext) {
    create_test_server(MockLLMClient::new(ANSWER), MockEmbeddingClient::new()).await
}

fn file_form(filename: &str, content: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content.to_vec())
            .file_name(filename)
            .mime_type("application/octet-stream"),
    )
}

// ============= Upload Tests =============

#[tokio::test]
async fn test_upload_txt_indexes_chunks() {
    let (server, ctx) = default_server().await;

    let response = server
        .post("/upload")
        .multipart(file_form("notes.txt", three_chunk_text().as_bytes()))
        .await;

    response.assert_status_ok();
    let body: UploadResponse = response.json();
    assert_eq!(body.filename, "notes.txt");
    assert_eq!(body.chunks, 3);
    assert_eq!(body.message, "Uploaded and indexed 3 chunks from notes.txt.");

    assert_eq!(ctx.store.ids(), vec!["notes.txt-0", "notes.txt-1", "notes.txt-2"]);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (server, _ctx) = default_server().await;

    let response = server
        .post("/upload")
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("No file uploaded"));
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let (server, _ctx) = default_server().await;

    let response = server
        .post("/upload")
        .multipart(file_form("", b"some text"))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Empty filename"));
}

#[tokio::test]
async fn test_upload_unsupported_type() {
    let (server, ctx) = default_server().await;

    let response = server
        .post("/upload")
        .multipart(file_form("table.csv", b"a,b\n1,2\n"))
        .await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains(".csv"));
    assert_eq!(ctx.embedder.calls(), 0);
}

#[tokio::test]
async fn test_upload_blank_text_is_rejected() {
    let (server, ctx) = default_server().await;

    let response = server
        .post("/upload")
        .multipart(file_form("blank.txt", b"   \n\t  "))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert!(ctx.store.ids().is_empty());

    let files = server.get("/files").await;
    files.assert_json(&json!({ "files": [] }));
}

#[tokio::test]
async fn test_upload_embedding_failure_is_server_error() {
    let (server, _ctx) =
        create_test_server(MockLLMClient::new(ANSWER), MockEmbeddingClient::failing()).await;

    let response = server
        .post("/upload")
        .multipart(file_form("notes.txt", b"hello world"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Mock embedding failure"));
}

// ============= File Listing Tests =============

#[tokio::test]
async fn test_files_listing_after_uploads() {
    let (server, _ctx) = default_server().await;

    server
        .post("/upload")
        .multipart(file_form("zeta.txt", b"zzz"))
        .await
        .assert_status_ok();
    server
        .post("/upload")
        .multipart(file_form("alpha.txt", three_chunk_text().as_bytes()))
        .await
        .assert_status_ok();
    server
        .post("/upload")
        .multipart(file_form("zeta.txt", b"zzz again"))
        .await
        .assert_status_ok();

    let response = server.get("/files").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "files": ["alpha.txt", "zeta.txt"] }));

    let response = server.get("/files/details").await;
    response.assert_status_ok();
    let details: Vec<FileDetail> = response.json();
    assert_eq!(
        details,
        vec![
            FileDetail {
                filename: "alpha.txt".into(),
                chunks: 3
            },
            FileDetail {
                filename: "zeta.txt".into(),
                chunks: 1
            },
        ]
    );

    let response = server.get("/files/indexed").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "files": ["alpha.txt", "zeta.txt"] }));
}

#[tokio::test]
async fn test_files_empty_initially() {
    let (server, _ctx) = default_server().await;

    server.get("/files").await.assert_json(&json!({ "files": [] }));
    server.get("/files/details").await.assert_json(&json!([]));
}

// ============= Question Tests =============

#[tokio::test]
async fn test_ask_without_question() {
    let (server, ctx) = default_server().await;

    let response = server.post("/ask").json(&json!({})).await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("No question provided"));
    assert!(ctx.llm.last_call().is_none());
}

#[tokio::test]
async fn test_ask_with_blank_question() {
    let (server, _ctx) = default_server().await;

    let response = server.post("/ask").json(&json!({ "question": "   " })).await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_ask_with_invalid_body() {
    let (server, _ctx) = default_server().await;

    let response = server.post("/ask").text("question?").await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_ask_returns_answer_and_sources() {
    let (server, ctx) = default_server().await;

    server
        .post("/upload")
        .multipart(file_form("notes.txt", three_chunk_text().as_bytes()))
        .await
        .assert_status_ok();
    server
        .post("/upload")
        .multipart(file_form("other.txt", b"xyz xyz"))
        .await
        .assert_status_ok();

    let response = server
        .post("/ask")
        .json(&json!({ "question": "cc cc cc?" }))
        .await;

    response.assert_status_ok();
    let body: AskResponse = response.json();
    assert_eq!(body.question, "cc cc cc?");
    assert_eq!(body.answer, ANSWER);
    assert_eq!(body.sources.first().map(String::as_str), Some("notes.txt"));
    assert!(body.sources.contains(&"other.txt".to_string()));

    let (system, prompt) = ctx.llm.last_call().unwrap();
    assert!(system.contains("provided context"));
    assert!(prompt.starts_with(&format!("Context:\n{}\n", "c".repeat(200))));
    assert!(prompt.ends_with("\n\nQuestion: cc cc cc?"));
}

#[tokio::test]
async fn test_ask_streaming_matches_plain_answer() {
    let (server, _ctx) = default_server().await;

    let response = server
        .post("/ask")
        .json(&json!({ "question": "When is it due?", "stream": true }))
        .await;

    response.assert_status_ok();
    assert!(response
        .header(header::CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(response.text(), ANSWER);

    let response = server.post("/stream").json(&json!({ "question": "When?" })).await;
    response.assert_status_ok();
    assert_eq!(response.text(), ANSWER);
}

#[tokio::test]
async fn test_stream_failure_mid_answer_is_reported_in_body() {
    let (server, _ctx) = create_test_server(
        MockLLMClient::failing_mid_stream("Partial answer text"),
        MockEmbeddingClient::new(),
    )
    .await;

    let response = server.post("/stream").json(&json!({ "question": "Why?" })).await;

    response.assert_status_ok();
    let text = response.text();
    assert!(text.starts_with("Parti"));
    assert!(text.contains("\n[error] "));
    assert!(text.contains("Mock stream interrupted"));
}

#[tokio::test]
async fn test_ask_completion_failure() {
    let (server, _ctx) =
        create_test_server(MockLLMClient::failing(), MockEmbeddingClient::new()).await;

    let response = server.post("/ask").json(&json!({ "question": "Why?" })).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let response = server
        .post("/ask")
        .json(&json!({ "question": "Why?", "stream": true }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_sources_endpoint() {
    let (server, ctx) = default_server().await;

    server
        .post("/upload")
        .multipart(file_form("notes.txt", three_chunk_text().as_bytes()))
        .await
        .assert_status_ok();

    let response = server.post("/sources").json(&json!({ "question": "bbb" })).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "sources": ["notes.txt"] }));
    assert!(ctx.llm.last_call().is_none());

    server
        .post("/sources")
        .json(&json!({}))
        .await
        .assert_status_bad_request();
}

// ============= Health & Docs Tests =============

#[tokio::test]
async fn test_healthcheck_ok() {
    let (server, _ctx) = default_server().await;

    server
        .post("/upload")
        .multipart(file_form("notes.txt", b"hello"))
        .await
        .assert_status_ok();

    let response = server.get("/healthcheck").await;
    response.assert_status_ok();
    response.assert_json(&json!({
        "status": "ok",
        "vector_store": "in-memory",
        "dimension": 26,
        "total_vector_count": 1
    }));
}

#[tokio::test]
async fn test_healthcheck_reports_failure() {
    let (server, _ctx) =
        create_test_server(MockLLMClient::new(ANSWER), MockEmbeddingClient::failing()).await;

    let response = server.get("/healthcheck").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("Mock embedding failure"));
}

#[tokio::test]
async fn test_openapi_document() {
    let (server, _ctx) = default_server().await;

    let response = server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();
    let doc: serde_json::Value = response.json();
    for route in ["/upload", "/files", "/files/details", "/ask", "/stream", "/sources", "/healthcheck"] {
        assert!(doc["paths"][route].is_object(), "missing {}", route);
    }
}

#[tokio::test]
async fn test_cors_is_permissive() {
    let (server, _ctx) = default_server().await;

    let response = server
        .get("/files")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://example.com"))
        .await;
    response.assert_status_ok();
    assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
}

#[tokio::test]
async fn test_upload_over_body_limit_is_rejected() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let ctx = test_context(MockLLMClient::new(ANSWER), MockEmbeddingClient::new()).await;
    let app = build_app(ctx.state.clone(), 1024);

    let boundary = "ragline-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n{payload}\r\n--{b}--\r\n",
        b = boundary,
        payload = "x".repeat(4096)
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
    assert!(ctx.store.ids().is_empty());
}
