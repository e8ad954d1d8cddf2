//! Router configuration for the image relay.
//!
//! # Route Structure
//!
//! ```text
//! POST    /     - Generate an image (bearer auth)
//! OPTIONS /     - CORS pre-flight (public, 204)
//! *       *     - 405 with `Allow: POST, OPTIONS`
//! ```
//!
//! Checks run in a fixed order: method and path first (routing), then the
//! bearer token (middleware on the POST route only), then the body
//! (handler).
//!
//! # Example
//!
//! ```ignore
//! use image_relay::backend::WorkersAiGenerator;
//! use image_relay::server::routes::{create_router, RouterConfig};
//!
//! let generator = WorkersAiGenerator::new("account-id", "api-token");
//! let config = RouterConfig::new("my-secret-key")
//!     .with_cors_origin("https://example.com");
//!
//! let router = create_router(generator, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    middleware,
    routing::{post, MethodRouter},
    Router,
};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE,
};
use http::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::auth::{auth_middleware, BearerAuth};
use super::handlers::{
    generate_handler, method_not_allowed_handler, preflight_handler, AppState, ALLOWED_METHODS,
    DEFAULT_GENERATE_TIMEOUT, DEFAULT_MAX_BODY_BYTES,
};
use crate::backend::ImageGenerator;
use crate::dimensions::DimensionResolver;
use crate::request::ModelAllowList;

/// Request headers callers may send cross-origin.
pub const CORS_ALLOW_HEADERS: &str = "Authorization, Content-Type";

/// Pre-flight cache lifetime in seconds.
pub const CORS_MAX_AGE_SECS: u32 = 600;

/// Fixed security headers attached to every response.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'",
    ),
];

// =============================================================================
// Router Configuration
// =============================================================================

/// Immutable configuration for the HTTP router.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Shared secret callers present as a bearer token
    pub api_key: String,

    /// Models callers may select
    pub models: ModelAllowList,

    /// Dimension resolution policy
    pub resolver: DimensionResolver,

    /// Allowed CORS origin (None = any origin)
    pub cors_origin: Option<String>,

    /// Deadline for one backend call
    pub generate_timeout: Duration,

    /// Maximum accepted request body size
    pub max_body_bytes: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given API key.
    ///
    /// By default:
    /// - The built-in model allow-list is used
    /// - Dimensions are aligned to multiples of 8
    /// - CORS allows any origin
    /// - Backend calls time out after 60 seconds
    /// - Bodies are limited to 64 KiB
    /// - Tracing is enabled
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            models: ModelAllowList::default(),
            resolver: DimensionResolver::default(),
            cors_origin: None,
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            enable_tracing: true,
        }
    }

    /// Set the model allow-list.
    pub fn with_models(mut self, models: ModelAllowList) -> Self {
        self.models = models;
        self
    }

    /// Set the dimension alignment (1 disables alignment).
    pub fn with_alignment(mut self, alignment: u32) -> Self {
        self.resolver = DimensionResolver::new(alignment);
        self
    }

    /// Restrict CORS to a single origin.
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origin = None;
        self
    }

    /// Set the backend deadline.
    pub fn with_generate_timeout(mut self, timeout: Duration) -> Self {
        self.generate_timeout = timeout;
        self
    }

    /// Set the request body limit in bytes.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// The returned router has no routes besides `/`; every other path answers
/// 405. CORS and security headers are attached to every response,
/// including errors and pre-flights.
pub fn create_router<G: ImageGenerator>(generator: G, config: RouterConfig) -> Router {
    let state = AppState::new(generator)
        .with_models(config.models.clone())
        .with_resolver(config.resolver)
        .with_generate_timeout(config.generate_timeout)
        .with_max_body_bytes(config.max_body_bytes);

    let auth = BearerAuth::new(&config.api_key);

    let router = Router::new()
        .route("/", build_endpoint::<G>(auth))
        .fallback(method_not_allowed_handler)
        .with_state(state);

    let router = response_headers(&config)
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(name, value))
        });

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// The `/` endpoint. Auth wraps only the POST handler, so pre-flights and
/// wrong methods never reach it.
fn build_endpoint<G: ImageGenerator>(auth: BearerAuth) -> MethodRouter<AppState<G>> {
    post(generate_handler::<G>)
        .route_layer(middleware::from_fn_with_state(auth, auth_middleware))
        .options(preflight_handler)
        .fallback(method_not_allowed_handler)
}

/// Headers attached to every response: CORS, then the fixed security set.
fn response_headers(config: &RouterConfig) -> Vec<(HeaderName, HeaderValue)> {
    let origin = match &config.cors_origin {
        None => HeaderValue::from_static("*"),
        Some(origin) => HeaderValue::from_str(origin).unwrap_or_else(|_| {
            warn!(origin = %origin, "Invalid CORS origin, allowing any origin");
            HeaderValue::from_static("*")
        }),
    };

    let mut headers = vec![
        (ACCESS_CONTROL_ALLOW_ORIGIN, origin),
        (
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ),
        (
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ),
        (ACCESS_CONTROL_MAX_AGE, HeaderValue::from(CORS_MAX_AGE_SECS)),
    ];

    headers.extend(SECURITY_HEADERS.iter().map(|(name, value)| {
        (
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        )
    }));

    headers
}

// =============================================================================
// Tests
// =============================================================================
