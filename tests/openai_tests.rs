//! OpenAI client tests against a wiremock server.

use futures::StreamExt;
use ragline::llm::{LLMClient, OpenAIClient};
use ragline::rag::{EmbeddingClient, OpenAIEmbeddings};
use ragline::types::AppError;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn embeddings(server: &MockServer) -> OpenAIEmbeddings {
    OpenAIEmbeddings::new(
        reqwest::Client::new(),
        "sk-test".to_string(),
        format!("{}/v1/", server.uri()),
        "text-embedding-ada-002".to_string(),
        3,
    )
}

fn chat(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new(
        reqwest::Client::new(),
        "sk-test".to_string(),
        format!("{}/v1", server.uri()),
        "gpt-3.5-turbo".to_string(),
    )
}

fn embedding_response(data: Value) -> Value {
    json!({
        "object": "list",
        "data": data,
        "model": "text-embedding-ada-002",
        "usage": { "prompt_tokens": 2, "total_tokens": 2 }
    })
}

fn completion_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12 }
    })
}

fn api_error(message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": "invalid_request_error",
            "param": null,
            "code": null
        }
    })
}

// ============= Embeddings =============

#[tokio::test]
async fn test_embed_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-ada-002",
            "input": "hello world"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_response(json!([
            { "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3] }
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let client = embeddings(&server);
    let vector = client.embed("hello world").await.unwrap();

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    assert_eq!(client.dimensions(), 3);
    assert_eq!(client.model_name(), "text-embedding-ada-002");
}

#[tokio::test]
async fn test_embed_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(api_error("Incorrect API key provided")),
        )
        .mount(&server)
        .await;

    let err = embeddings(&server).embed("hello").await.unwrap_err();

    assert!(matches!(err, AppError::Embedding(_)));
    assert!(err.to_string().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn test_embed_empty_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_response(json!([]))))
        .mount(&server)
        .await;

    let err = embeddings(&server).embed("hello").await.unwrap_err();
    assert!(err.to_string().contains("No embedding returned"));
}

// ============= Chat completions =============

#[tokio::test]
async fn test_generate_with_system() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Context:\nx\n\n\nQuestion: Why?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_response("Because.")))
        .expect(1)
        .mount(&server)
        .await;

    let answer = chat(&server)
        .generate_with_system("Be brief.", "Context:\nx\n\n\nQuestion: Why?")
        .await
        .unwrap();

    assert_eq!(answer, "Because.");
}

#[tokio::test]
async fn test_generate_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(api_error("This model's maximum context length is 4097 tokens")),
        )
        .mount(&server)
        .await;

    let err = chat(&server).generate("Hi").await.unwrap_err();

    assert!(matches!(err, AppError::Completion(_)));
    assert!(err.to_string().contains("maximum context length"));
}

#[tokio::test]
async fn test_generate_without_choices() {
    let server = MockServer::start().await;

    let mut body = completion_response("");
    body["choices"] = json!([]);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = chat(&server).generate("Hi").await.unwrap_err();
    assert!(err.to_string().contains("No response from OpenAI"));
}

// ============= Streaming =============

fn chunk(delta: Value) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": "gpt-3.5-turbo",
        "choices": [{ "index": 0, "delta": delta, "finish_reason": null }]
    })
    .to_string()
}

fn sse(events: &[String]) -> String {
    events
        .iter()
        .map(|data| format!("data: {}\n\n", data))
        .collect()
}

#[tokio::test]
async fn test_stream_fragments_concatenate() {
    let server = MockServer::start().await;

    let body = sse(&[
        chunk(json!({ "role": "assistant", "content": "" })),
        chunk(json!({ "content": "The report " })),
        chunk(json!({ "content": "is due " })),
        chunk(json!({ "content": "Friday." })),
        chunk(json!({})),
        "[DONE]".to_string(),
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let mut stream = chat(&server)
        .stream_with_system("Be brief.", "When?")
        .await
        .unwrap();

    let mut fragments = Vec::new();
    while let Some(fragment) = stream.next().await {
        fragments.push(fragment.unwrap());
    }

    assert_eq!(fragments, vec!["The report ", "is due ", "Friday."]);
    assert_eq!(fragments.concat(), "The report is due Friday.");
}

#[tokio::test]
async fn test_stream_ends_after_bad_chunk() {
    let server = MockServer::start().await;

    let body = sse(&[
        chunk(json!({ "content": "Partial" })),
        json!({ "error": { "message": "The server is overloaded" } }).to_string(),
        chunk(json!({ "content": "never seen" })),
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let stream = chat(&server).stream("Hi").await.unwrap();
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "Partial");
    assert!(matches!(items[1], Err(AppError::Completion(_))));
}

#[tokio::test]
async fn test_stream_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(api_error("Invalid API key")))
        .mount(&server)
        .await;

    // Depending on when the status is seen, the failure surfaces either from
    // the call itself or as the first and only stream item.
    match chat(&server).stream("Hi").await {
        Err(err) => assert!(matches!(err, AppError::Completion(_))),
        Ok(stream) => {
            let items: Vec<_> = stream.collect().await;
            assert_eq!(items.len(), 1);
            assert!(matches!(items[0], Err(AppError::Completion(_))));
        }
    }
}
