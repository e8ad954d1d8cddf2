//! API integration tests for image generation and error handling.
//!
//! Tests verify:
//! - Successful generation with resolved dimensions and response headers
//! - Method, path, media type and body validation errors
//! - Model allow-list fallback
//! - Backend failures and timeouts collapsing into a generic 500
//! - CORS and security headers on every response

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use image_relay::error::GenerateError;
use image_relay::request::{ModelAllowList, DEFAULT_MODEL};
use image_relay::RouterConfig;

use super::test_utils::{
    body_bytes, error_message, generate_request, test_router, test_router_with,
    MockImageGenerator, FAKE_PNG, TEST_API_KEY,
};

// =============================================================================
// Successful Generation
// =============================================================================

#[tokio::test]
async fn test_generate_success() {
    let generator = MockImageGenerator::new();
    let router = test_router(generator.clone());

    let response = router
        .oneshot(generate_request(
            r#"{"prompt": "a lighthouse at dusk", "width": 1920, "height": 1080}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "inline; filename=\"image-1920x1080.png\""
    );

    let body = body_bytes(response).await;
    assert_eq!(&body[..], FAKE_PNG);

    let calls = generator.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "a lighthouse at dusk");
    assert_eq!(calls[0].model, DEFAULT_MODEL);
    assert_eq!((calls[0].width, calls[0].height), (1920, 1080));
}

#[tokio::test]
async fn test_generate_resolves_dimensions() {
    let cases = [
        (r#"{"prompt": "p"}"#, (1024, 1024)),
        (r#"{"prompt": "p", "aspectRatio": "16:9"}"#, (1024, 576)),
        (r#"{"prompt": "p", "aspectRatio": "9:16"}"#, (576, 1024)),
        (
            r#"{"prompt": "p", "aspectRatio": "16:9", "longEdge": 1920}"#,
            (1920, 1080),
        ),
        (r#"{"prompt": "p", "width": 100}"#, (256, 256)),
        (r#"{"prompt": "p", "width": 5000, "height": 5000}"#, (2048, 2048)),
        (r#"{"prompt": "p", "aspectRatio": "banana"}"#, (1024, 1024)),
    ];

    for (body, expected) in cases {
        let generator = MockImageGenerator::new();
        let router = test_router(generator.clone());

        let response = router.oneshot(generate_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "body {}", body);

        let calls = generator.calls().await;
        assert_eq!((calls[0].width, calls[0].height), expected, "body {}", body);

        let disposition = format!("inline; filename=\"image-{}x{}.png\"", expected.0, expected.1);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            disposition.as_str()
        );
    }
}

#[tokio::test]
async fn test_out_of_range_sizing_uses_defaults() {
    let cases = [
        (r#"{"prompt": "x", "width": 1e400}"#, (1024, 1024)),
        (r#"{"prompt": "x", "longEdge": 1e400}"#, (1024, 1024)),
        (
            r#"{"prompt": "x", "aspectRatio": "9:16", "longEdge": 1e400}"#,
            (576, 1024),
        ),
    ];

    for (body, expected) in cases {
        let generator = MockImageGenerator::new();
        let router = test_router(generator.clone());

        let response = router.oneshot(generate_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "body {}", body);

        let calls = generator.calls().await;
        assert_eq!((calls[0].width, calls[0].height), expected, "body {}", body);
    }
}

#[tokio::test]
async fn test_generate_unaligned_router() {
    let generator = MockImageGenerator::new();
    let router = test_router_with(
        generator.clone(),
        RouterConfig::new(TEST_API_KEY).with_alignment(1),
    );

    let response = router
        .oneshot(generate_request(r#"{"prompt": "p", "width": 1001, "height": 333}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = generator.calls().await;
    assert_eq!((calls[0].width, calls[0].height), (1001, 333));
}

#[tokio::test]
async fn test_charset_content_type_accepted() {
    let router = test_router(MockImageGenerator::new());

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::AUTHORIZATION, format!("Bearer {}", TEST_API_KEY))
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(r#"{"prompt": "p"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Model Selection
// =============================================================================

#[tokio::test]
async fn test_allowed_model_is_used() {
    let generator = MockImageGenerator::new();
    let router = test_router(generator.clone());

    let response = router
        .oneshot(generate_request(
            r#"{"prompt": "p", "model": "@cf/black-forest-labs/flux-1-schnell"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = generator.calls().await;
    assert_eq!(calls[0].model, "@cf/black-forest-labs/flux-1-schnell");
}

#[tokio::test]
async fn test_unknown_model_falls_back_to_default() {
    for model in [r#""@cf/not/a-model""#, "42", "null", r#""""#] {
        let generator = MockImageGenerator::new();
        let router = test_router(generator.clone());

        let body = format!(r#"{{"prompt": "p", "model": {}}}"#, model);
        let response = router.oneshot(generate_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "model {}", model);

        let calls = generator.calls().await;
        assert_eq!(calls[0].model, DEFAULT_MODEL, "model {}", model);
    }
}

#[tokio::test]
async fn test_custom_allow_list() {
    let generator = MockImageGenerator::new();
    let config = RouterConfig::new(TEST_API_KEY)
        .with_models(ModelAllowList::new(["model-a", "model-b"], "model-a"));
    let router = test_router_with(generator.clone(), config);

    let response = router
        .clone()
        .oneshot(generate_request(r#"{"prompt": "p", "model": "model-b"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(generate_request(
            r#"{"prompt": "p", "model": "@cf/stabilityai/stable-diffusion-xl-base-1.0"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let models: Vec<String> = generator
        .calls()
        .await
        .into_iter()
        .map(|call| call.model)
        .collect();
    assert_eq!(models, vec!["model-b", "model-a"]);
}

// =============================================================================
// Method and Path
// =============================================================================

#[tokio::test]
async fn test_preflight_returns_no_content() {
    let generator = MockImageGenerator::new();
    let router = test_router(generator.clone());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap(),
        "POST, OPTIONS"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
            .unwrap(),
        "Authorization, Content-Type"
    );
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(generator.call_count().await, 0);
}

#[tokio::test]
async fn test_wrong_method_returns_405() {
    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let router = test_router(MockImageGenerator::new());

        let request = Request::builder()
            .method(method)
            .uri("/")
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_API_KEY))
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "method {}",
            method
        );
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST, OPTIONS");
        assert_eq!(error_message(response).await, "Method not allowed");
    }
}

#[tokio::test]
async fn test_unknown_path_returns_405() {
    for (method, uri) in [("POST", "/generate"), ("GET", "/health"), ("OPTIONS", "/x")] {
        let generator = MockImageGenerator::new();
        let router = test_router(generator.clone());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_API_KEY))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"prompt": "p"}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{} {}",
            method,
            uri
        );
        assert_eq!(generator.call_count().await, 0);
    }
}

// =============================================================================
// Body Validation
// =============================================================================

#[tokio::test]
async fn test_wrong_content_type_returns_415() {
    for content_type in [Some("text/plain"), Some("multipart/form-data"), None] {
        let generator = MockImageGenerator::new();
        let router = test_router(generator.clone());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::AUTHORIZATION, format!("Bearer {}", TEST_API_KEY));
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(r#"{"prompt": "p"}"#)).unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "content type {:?}",
            content_type
        );
        assert_eq!(
            error_message(response).await,
            "Content-Type must be application/json"
        );
        assert_eq!(generator.call_count().await, 0);
    }
}

#[tokio::test]
async fn test_invalid_json_returns_400() {
    for body in ["{not json", "", r#"{"prompt": "p""#] {
        let router = test_router(MockImageGenerator::new());

        let response = router.oneshot(generate_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(error_message(response).await, "Invalid JSON body");
    }
}

#[tokio::test]
async fn test_missing_prompt_returns_400() {
    for body in [
        "{}",
        r#"{"prompt": ""}"#,
        r#"{"prompt": "   \n\t "}"#,
        r#"{"prompt": 42}"#,
        r#"{"prompt": null}"#,
        "[]",
        r#""just a string""#,
    ] {
        let generator = MockImageGenerator::new();
        let router = test_router(generator.clone());

        let response = router.oneshot(generate_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
        assert_eq!(error_message(response).await, "Prompt is required");
        assert_eq!(generator.call_count().await, 0);
    }
}

#[tokio::test]
async fn test_prompt_too_long_returns_413() {
    let generator = MockImageGenerator::new();
    let router = test_router(generator.clone());

    let body = serde_json::json!({ "prompt": "a".repeat(801) }).to_string();
    let response = router.oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_message(response).await, "Prompt exceeds 800 characters");
    assert_eq!(generator.call_count().await, 0);
}

#[tokio::test]
async fn test_prompt_at_limit_is_accepted() {
    let generator = MockImageGenerator::new();
    let router = test_router(generator.clone());

    // 800 multi-byte characters still count as 800
    let body = serde_json::json!({ "prompt": "é".repeat(800) }).to_string();
    let response = router.oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(generator.call_count().await, 1);
}

#[tokio::test]
async fn test_prompt_is_trimmed() {
    let generator = MockImageGenerator::new();
    let router = test_router(generator.clone());

    let response = router
        .oneshot(generate_request(r#"{"prompt": "  a red fox  "}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(generator.calls().await[0].prompt, "a red fox");
}

#[tokio::test]
async fn test_oversized_body_returns_413() {
    let generator = MockImageGenerator::new();
    let router = test_router_with(
        generator.clone(),
        RouterConfig::new(TEST_API_KEY).with_max_body_bytes(4096),
    );

    let body = serde_json::json!({ "prompt": "p", "padding": "x".repeat(8192) }).to_string();
    let response = router.oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_message(response).await, "Request body too large");
    assert_eq!(generator.call_count().await, 0);
}

// =============================================================================
// Backend Failures
// =============================================================================

#[tokio::test]
async fn test_backend_failure_returns_generic_500() {
    let errors = [
        GenerateError::Api {
            status: 400,
            message: "secret upstream detail: account 1234".to_string(),
        },
        GenerateError::Network("connection reset by peer".to_string()),
        GenerateError::MalformedOutput("unexpected content type 'text/html'".to_string()),
    ];

    for err in errors {
        let router = test_router(MockImageGenerator::failing(err.clone()));

        let response = router
            .oneshot(generate_request(r#"{"prompt": "p"}"#))
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "error {}",
            err
        );
        let body = body_bytes(response).await;
        let text = String::from_utf8_lossy(&body);
        assert_eq!(text, r#"{"error":"Image generation failed"}"#);
    }
}

#[tokio::test]
async fn test_backend_timeout_returns_500() {
    let generator = MockImageGenerator::hanging(Duration::from_secs(30));
    let router = test_router_with(
        generator.clone(),
        RouterConfig::new(TEST_API_KEY).with_generate_timeout(Duration::from_millis(50)),
    );

    let response = router
        .oneshot(generate_request(r#"{"prompt": "p"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(response).await, "Image generation failed");
    assert_eq!(generator.call_count().await, 1);
}

// =============================================================================
// Response Headers
// =============================================================================

#[tokio::test]
async fn test_headers_on_every_response() {
    let requests = vec![
        generate_request(r#"{"prompt": "p"}"#),
        generate_request("{bad"),
        Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap(),
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"prompt": "p"}"#))
            .unwrap(),
        Request::builder()
            .method("OPTIONS")
            .uri("/")
            .body(Body::empty())
            .unwrap(),
    ];

    for request in requests {
        let router = test_router(MockImageGenerator::new());
        let label = format!("{} {}", request.method(), request.uri());

        let response = router.oneshot(request).await.unwrap();
        let headers = response.headers();

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*",
            "{}",
            label
        );
        assert_eq!(
            headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff",
            "{}",
            label
        );
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY", "{}", label);
        assert_eq!(
            headers.get(header::REFERRER_POLICY).unwrap(),
            "no-referrer",
            "{}",
            label
        );
        assert!(
            headers.contains_key(header::CONTENT_SECURITY_POLICY),
            "{}",
            label
        );
    }
}

#[tokio::test]
async fn test_configured_cors_origin() {
    let router = test_router_with(
        MockImageGenerator::new(),
        RouterConfig::new(TEST_API_KEY).with_cors_origin("https://app.example.com"),
    );

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://app.example.com"
    );
}
