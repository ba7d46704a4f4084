//! OpenAI providers against a local stub of the HTTP API.

#![cfg(feature = "openai")]

use axum::{Json, Router, http::StatusCode, routing::post};
use finops_rag::openai::{OpenAIChatProvider, OpenAIEmbeddingProvider};
use finops_rag::{CompletionProvider, EmbeddingProvider, RagError};
use serde_json::{Value, json};

fn inputs(body: &Value) -> Vec<String> {
    body["input"]
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Embeds input `i` as `[i, len]`, listed in reverse order.
async fn reversed_embeddings(Json(body): Json<Value>) -> Json<Value> {
    let data: Vec<Value> = inputs(&body)
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| json!({"index": i, "embedding": [i as f32, text.len() as f32]}))
        .collect();
    Json(json!({"object": "list", "data": data}))
}

/// Drops the last embedding of the batch.
async fn short_embeddings(Json(body): Json<Value>) -> Json<Value> {
    let count = inputs(&body).len().saturating_sub(1);
    let data: Vec<Value> =
        (0..count).map(|i| json!({"index": i, "embedding": [1.0, 0.0]})).collect();
    Json(json!({"data": data}))
}

async fn rate_limited() -> (StatusCode, Json<Value>) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({"error": {"message": "Rate limit reached", "type": "requests"}})),
    )
}

async fn chat_reply(Json(body): Json<Value>) -> Json<Value> {
    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
    let content = format!("echo: {prompt}");
    Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]}))
}

async fn chat_null_content() -> Json<Value> {
    Json(json!({"choices": [{"message": {"role": "assistant", "content": null}}]}))
}

async fn chat_no_choices() -> Json<Value> {
    Json(json!({"choices": []}))
}

async fn spawn_stub() -> (String, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/ok/embeddings", post(reversed_embeddings))
        .route("/short/embeddings", post(short_embeddings))
        .route("/limited/embeddings", post(rate_limited))
        .route("/ok/chat/completions", post(chat_reply))
        .route("/null/chat/completions", post(chat_null_content))
        .route("/empty/chat/completions", post(chat_no_choices))
        .route("/limited/chat/completions", post(rate_limited));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    (format!("http://{addr}"), handle)
}

fn embedder(base: &str, prefix: &str) -> OpenAIEmbeddingProvider {
    OpenAIEmbeddingProvider::new("sk-test")
        .unwrap()
        .with_base_url(format!("{base}/{prefix}"))
        .with_dimensions(2)
}

fn chat(base: &str, prefix: &str) -> OpenAIChatProvider {
    OpenAIChatProvider::new("sk-test").unwrap().with_base_url(format!("{base}/{prefix}/"))
}

#[tokio::test]
async fn batch_is_reordered_by_index() {
    let (base, handle) = spawn_stub().await;

    let vectors = embedder(&base, "ok").embed_batch(&["a", "bb", "ccc"]).await.unwrap();
    assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 2.0], vec![2.0, 3.0]]);

    let single = embedder(&base, "ok").embed("tagging").await.unwrap();
    assert_eq!(single, vec![0.0, 7.0]);

    handle.abort();
}

#[tokio::test]
async fn short_batch_is_an_embedding_error() {
    let (base, handle) = spawn_stub().await;

    let err = embedder(&base, "short").embed_batch(&["a", "b"]).await.unwrap_err();
    match err {
        RagError::EmbeddingError { message, .. } => {
            assert!(message.contains("expected 2 embeddings"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }

    handle.abort();
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let (base, handle) = spawn_stub().await;

    let err = embedder(&base, "limited").embed("q").await.unwrap_err();
    match err {
        RagError::EmbeddingError { provider, message } => {
            assert_eq!(provider, "OpenAI");
            assert!(message.contains("429"), "{message}");
            assert!(message.contains("Rate limit reached"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = chat(&base, "limited").complete("q", 0.2).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::CompletionError { ref message, .. } if message.contains("Rate limit reached")
    ));

    handle.abort();
}

#[tokio::test]
async fn chat_returns_first_choice() {
    let (base, handle) = spawn_stub().await;

    let text = chat(&base, "ok").complete("hello", 0.2).await.unwrap();
    assert_eq!(text, "echo: hello");

    handle.abort();
}

#[tokio::test]
async fn null_content_and_empty_choices_are_completion_errors() {
    let (base, handle) = spawn_stub().await;

    let err = chat(&base, "null").complete("q", 0.2).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::CompletionError { ref message, .. } if message.contains("no content")
    ));

    let err = chat(&base, "empty").complete("q", 0.2).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::CompletionError { ref message, .. } if message.contains("no choices")
    ));

    handle.abort();
}
