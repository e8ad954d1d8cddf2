//! Bearer token authentication for the image relay.
//!
//! Callers authenticate with a single shared secret:
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! # Security Properties
//!
//! - **Constant-time comparison**: the presented token and the secret are
//!   both reduced to SHA-256 digests and compared with
//!   [`subtle::ConstantTimeEq`], so neither the position of the first
//!   mismatching byte nor the token length affects timing
//! - **No body access**: the middleware runs before the handler reads the
//!   request body
//! - **Challenge on every rejection**: all 401 responses carry a
//!   `WWW-Authenticate` header
//!
//! # Example
//!
//! ```rust
//! use image_relay::server::auth::{AuthError, BearerAuth};
//!
//! let auth = BearerAuth::new("my-secret-key");
//!
//! assert!(auth.verify("my-secret-key").is_ok());
//! assert_eq!(auth.verify("guess"), Err(AuthError::InvalidToken));
//! ```

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::handlers::ErrorResponse;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "image-relay";

// =============================================================================
// Types
// =============================================================================

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header
    MissingToken,

    /// Authorization header is not `Bearer <token>`
    MalformedHeader,

    /// Token does not match the configured secret
    InvalidToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing bearer token"),
            AuthError::MalformedHeader => write!(f, "Malformed Authorization header"),
            AuthError::InvalidToken => write!(f, "Invalid bearer token"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// The `WWW-Authenticate` challenge for this error (RFC 6750 error codes).
    pub fn challenge(&self) -> String {
        match self {
            AuthError::MissingToken => format!("Bearer realm=\"{}\"", AUTH_REALM),
            AuthError::MalformedHeader => format!(
                "Bearer realm=\"{}\", error=\"invalid_request\"",
                AUTH_REALM
            ),
            AuthError::InvalidToken => {
                format!("Bearer realm=\"{}\", error=\"invalid_token\"", AUTH_REALM)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;

        // A wrong token may be someone guessing; absent tokens are routine
        match &self {
            AuthError::InvalidToken => {
                warn!(status = status.as_u16(), "Authentication failed: {}", self);
            }
            _ => {
                debug!(status = status.as_u16(), "Authentication failed: {}", self);
            }
        }

        let challenge = HeaderValue::from_str(&self.challenge())
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer"));

        (
            status,
            [(WWW_AUTHENTICATE, challenge)],
            Json(ErrorResponse::new("Unauthorized")),
        )
            .into_response()
    }
}

// =============================================================================
// Bearer Authentication
// =============================================================================

/// Shared-secret bearer token authenticator.
///
/// Only a digest of the secret is kept.
#[derive(Clone)]
pub struct BearerAuth {
    secret_digest: [u8; 32],
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

impl BearerAuth {
    /// Create an authenticator for the given secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret_digest: Sha256::digest(secret.as_ref()).into(),
        }
    }

    /// Compare a presented token against the secret in constant time.
    pub fn verify(&self, token: &str) -> Result<(), AuthError> {
        let presented: [u8; 32] = Sha256::digest(token.as_bytes()).into();

        if presented
            .as_slice()
            .ct_eq(self.secret_digest.as_slice())
            .into()
        {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    /// Extract the bearer token from request headers and verify it.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let token = extract_bearer_token(headers)?;
        self.verify(token)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively and may be followed by any
/// amount of whitespace.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = value
        .trim()
        .split_once(char::is_whitespace)
        .ok_or(AuthError::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware rejecting requests without a valid bearer token.
///
/// Installed with `route_layer` on the POST endpoint only, so method and
/// path checks happen first and the body is never touched on rejection.
///
/// # Example
///
/// ```ignore
/// use axum::{middleware, routing::post, Router};
/// use image_relay::server::auth::{auth_middleware, BearerAuth};
///
/// let auth = BearerAuth::new("secret-key");
/// let app = Router::new().route(
///     "/",
///     post(handler).route_layer(middleware::from_fn_with_state(auth, auth_middleware)),
/// );
/// ```
pub async fn auth_middleware(
    State(auth): State<BearerAuth>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    auth.verify_headers(request.headers())?;
    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
