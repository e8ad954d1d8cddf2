//! HTTP request handlers for the image relay.
//!
//! # Endpoints
//!
//! - `POST /` - Generate an image (authenticated)
//! - `OPTIONS /` - CORS pre-flight
//! - anything else - 405

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::backend::{GenerationRequest, ImageGenerator};
use crate::dimensions::{DimensionResolver, ResolvedDimensions};
use crate::error::{ApiError, GenerateError};
use crate::request::{require_json_content_type, ImageRequest, ModelAllowList};

/// Methods served on `/`, as advertised in `Allow`.
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Default time to wait for the backend.
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default request body limit in bytes. A maximal prompt is a few KiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// Application State
// =============================================================================

/// Shared, read-only state handed to every request.
pub struct AppState<G: ImageGenerator> {
    /// Backend used to produce images
    pub generator: Arc<G>,

    /// Models callers may select
    pub models: Arc<ModelAllowList>,

    /// Dimension resolution policy
    pub resolver: DimensionResolver,

    /// Deadline for one backend call
    pub generate_timeout: Duration,

    /// Maximum accepted request body size
    pub max_body_bytes: usize,
}

impl<G: ImageGenerator> AppState<G> {
    /// Create state with the default allow-list, resolver and limits.
    pub fn new(generator: G) -> Self {
        Self {
            generator: Arc::new(generator),
            models: Arc::new(ModelAllowList::default()),
            resolver: DimensionResolver::default(),
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Replace the model allow-list.
    pub fn with_models(mut self, models: ModelAllowList) -> Self {
        self.models = Arc::new(models);
        self
    }

    /// Replace the dimension resolver.
    pub fn with_resolver(mut self, resolver: DimensionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the backend deadline.
    pub fn with_generate_timeout(mut self, timeout: Duration) -> Self {
        self.generate_timeout = timeout;
        self
    }

    /// Set the body size limit.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl<G: ImageGenerator> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            models: Arc::clone(&self.models),
            resolver: self.resolver,
            generate_timeout: self.generate_timeout,
            max_body_bytes: self.max_body_bytes,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short, caller-safe description
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

impl ApiError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InvalidBody | ApiError::PromptMissingOrEmpty => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge | ApiError::PromptTooLong { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::GenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert ApiError to HTTP response.
///
/// The body only ever contains the variant's display text; backend details
/// are logged at ERROR level and dropped.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match &self {
            ApiError::GenerationFailed(source) => {
                error!(status = status.as_u16(), error = %source, "Server error: {}", message);
            }
            ApiError::MethodNotAllowed => {
                debug!(status = status.as_u16(), "Client error: {}", message);
            }
            _ => {
                warn!(status = status.as_u16(), "Client error: {}", message);
            }
        }

        let body = Json(ErrorResponse::new(message));

        if matches!(self, ApiError::MethodNotAllowed) {
            (
                status,
                [(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS))],
                body,
            )
                .into_response()
        } else {
            (status, body).into_response()
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image generation requests.
///
/// # Endpoint
///
/// `POST /` (behind the bearer auth middleware)
///
/// # Body
///
/// ```json
/// {"prompt": "...", "model": "...", "width": 1024, "height": 576,
///  "aspectRatio": "16:9", "longEdge": 1024}
/// ```
///
/// Only `prompt` is required.
///
/// # Response
///
/// - `200 OK`: PNG bytes
/// - `400 Bad Request`: invalid JSON, missing or blank prompt
/// - `413 Payload Too Large`: prompt or body too long
/// - `415 Unsupported Media Type`: not `application/json`
/// - `500 Internal Server Error`: backend failure of any kind
///
/// # Headers
///
/// - `Content-Type: image/png`
/// - `Cache-Control: no-store`
/// - `Content-Disposition: inline; filename="image-{w}x{h}.png"`
pub async fn generate_handler<G: ImageGenerator>(
    State(state): State<AppState<G>>,
    request: Request,
) -> Result<Response, ApiError> {
    require_json_content_type(request.headers())?;

    let body = axum::body::to_bytes(request.into_body(), state.max_body_bytes)
        .await
        .map_err(body_read_error)?;

    let image_request = ImageRequest::from_body(&body, &state.models)?;
    let dimensions = state.resolver.resolve(&image_request.sizing);
    let generation = GenerationRequest::new(image_request.prompt, dimensions);

    debug!(
        model = %image_request.model,
        width = dimensions.width,
        height = dimensions.height,
        "Dispatching generation"
    );

    let started = Instant::now();
    let data = match tokio::time::timeout(
        state.generate_timeout,
        state.generator.generate(&image_request.model, &generation),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => return Err(GenerateError::Timeout(state.generate_timeout).into()),
    };

    info!(
        model = %image_request.model,
        width = dimensions.width,
        height = dimensions.height,
        bytes = data.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Image generated"
    );

    Ok(image_response(data, dimensions))
}

/// Handle CORS pre-flight requests.
///
/// # Endpoint
///
/// `OPTIONS /`
///
/// Returns `204 No Content`; the CORS headers come from the router's
/// response header layers. No authentication is performed.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Fallback for every method/path combination other than `POST /` and
/// `OPTIONS /`.
pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Classify a body read failure: the length limit is a 413, anything else
/// (client disconnect, stream error) is an unreadable body.
fn body_read_error(err: axum::Error) -> ApiError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return ApiError::BodyTooLarge;
        }
        source = current.source();
    }

    debug!(error = %err, "Failed to read request body");
    ApiError::InvalidBody
}

fn image_response(data: Bytes, dimensions: ResolvedDimensions) -> Response {
    let disposition = format!("inline; filename=\"{}\"", dimensions.filename());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(data),
    )
        .into_response()
}

// =============================================================================
// Tests
// =============================================================================
