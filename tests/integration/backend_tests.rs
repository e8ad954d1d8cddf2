//! Workers AI client tests against a local stub server.
//!
//! Tests verify:
//! - Request shape (URL, bearer token, JSON body)
//! - Raw image and base64 JSON responses
//! - Non-success statuses and unexpected payloads
//! - Connection failures

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use base64::Engine;
use tokio::sync::RwLock;

use image_relay::backend::{GenerationRequest, ImageGenerator, WorkersAiGenerator};
use image_relay::dimensions::ResolvedDimensions;
use image_relay::error::GenerateError;

use super::test_utils::FAKE_PNG;

// =============================================================================
// Stub Server
// =============================================================================

/// What the stub answers with.
#[derive(Clone)]
enum StubReply {
    Png,
    Base64Json,
    Status(StatusCode, &'static str),
    Html,
}

/// A request captured by the stub.
#[derive(Clone, Debug)]
struct Captured {
    path: String,
    authorization: Option<String>,
    body: serde_json::Value,
}

#[derive(Clone)]
struct StubState {
    reply: StubReply,
    captured: Arc<RwLock<Vec<Captured>>>,
}

async fn stub_handler(
    State(state): State<StubState>,
    Path((account, model)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.captured.write().await.push(Captured {
        path: format!("{}/{}", account, model),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    match state.reply {
        StubReply::Png => ([(header::CONTENT_TYPE, "image/png")], FAKE_PNG).into_response(),
        StubReply::Base64Json => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(FAKE_PNG);
            axum::Json(serde_json::json!({
                "result": { "image": encoded },
                "success": true
            }))
            .into_response()
        }
        StubReply::Status(status, message) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            message,
        )
            .into_response(),
        StubReply::Html => {
            ([(header::CONTENT_TYPE, "text/html")], "<html></html>").into_response()
        }
    }
}

/// Start a stub Workers AI server; returns its base URL and capture log.
async fn start_stub(reply: StubReply) -> (String, Arc<RwLock<Vec<Captured>>>) {
    let captured = Arc::new(RwLock::new(Vec::new()));
    let state = StubState {
        reply,
        captured: Arc::clone(&captured),
    };

    let app = Router::new()
        .route("/accounts/{account}/ai/run/{*model}", post(stub_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), captured)
}

fn request(prompt: &str, width: u32, height: u32) -> GenerationRequest {
    GenerationRequest::new(prompt, ResolvedDimensions { width, height })
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_png_response() {
    let (base_url, captured) = start_stub(StubReply::Png).await;
    let generator = WorkersAiGenerator::new("acct-1", "cf-token").with_base_url(base_url);

    let data = generator
        .generate(
            "@cf/stabilityai/stable-diffusion-xl-base-1.0",
            &request("a harbor at night", 1024, 576),
        )
        .await
        .unwrap();
    assert_eq!(&data[..], FAKE_PNG);

    let captured = captured.read().await;
    assert_eq!(captured.len(), 1);
    assert_eq!(
        captured[0].path,
        "acct-1/@cf/stabilityai/stable-diffusion-xl-base-1.0"
    );
    assert_eq!(captured[0].authorization.as_deref(), Some("Bearer cf-token"));
    assert_eq!(
        captured[0].body,
        serde_json::json!({"prompt": "a harbor at night", "width": 1024, "height": 576})
    );
}

#[tokio::test]
async fn test_base64_json_response() {
    let (base_url, _) = start_stub(StubReply::Base64Json).await;
    let generator = WorkersAiGenerator::new("acct", "token").with_base_url(base_url);

    let data = generator
        .generate("@cf/black-forest-labs/flux-1-schnell", &request("p", 512, 512))
        .await
        .unwrap();
    assert_eq!(&data[..], FAKE_PNG);
}

#[tokio::test]
async fn test_error_status() {
    let (base_url, _) = start_stub(StubReply::Status(
        StatusCode::BAD_REQUEST,
        r#"{"errors":[{"message":"bad input"}]}"#,
    ))
    .await;
    let generator = WorkersAiGenerator::new("acct", "token").with_base_url(base_url);

    let err = generator
        .generate("m", &request("p", 1024, 1024))
        .await
        .unwrap_err();

    match err {
        GenerateError::Api { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("bad input"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unexpected_content_type() {
    let (base_url, _) = start_stub(StubReply::Html).await;
    let generator = WorkersAiGenerator::new("acct", "token").with_base_url(base_url);

    let err = generator
        .generate("m", &request("p", 1024, 1024))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::MalformedOutput(_)));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then drop to get a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let generator =
        WorkersAiGenerator::new("acct", "token").with_base_url(format!("http://{}", addr));

    let err = generator
        .generate("m", &request("p", 1024, 1024))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::Network(_)));
}
