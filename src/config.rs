//! Configuration management for the image relay.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `IMAGE_RELAY_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use image_relay::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//! config.validate()?;
//!
//! let router_config = config.router_config();
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `IMAGE_RELAY_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMAGE_RELAY_PORT` - Server port (default: 8787)
//! - `IMAGE_RELAY_API_KEY` - Shared secret callers send as a bearer token (required)
//! - `IMAGE_RELAY_CF_ACCOUNT_ID` - Cloudflare account id (required)
//! - `IMAGE_RELAY_CF_API_TOKEN` - Cloudflare API token with Workers AI access (required)
//! - `IMAGE_RELAY_CF_BASE_URL` - Cloudflare API base URL
//! - `IMAGE_RELAY_DEFAULT_MODEL` - Model used when the caller's choice is not allowed
//! - `IMAGE_RELAY_ALLOWED_MODELS` - Comma-separated model allow-list
//! - `IMAGE_RELAY_ALIGNMENT` - Round dimensions to multiples of this (default: 8)
//! - `IMAGE_RELAY_CORS_ORIGIN` - Allowed CORS origin (default: any)
//! - `IMAGE_RELAY_GENERATE_TIMEOUT_SECS` - Backend deadline (default: 60)
//! - `IMAGE_RELAY_MAX_BODY_BYTES` - Request body limit (default: 65536)

use std::time::Duration;

use clap::Parser;

use crate::backend::DEFAULT_WORKERS_AI_BASE_URL;
use crate::dimensions::{is_valid_alignment, DEFAULT_ALIGNMENT, MAX_ALIGNMENT};
use crate::request::{ModelAllowList, DEFAULT_ALLOWED_MODELS, DEFAULT_MODEL};
use crate::server::RouterConfig;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default backend deadline in seconds.
pub const DEFAULT_GENERATE_TIMEOUT_SECS: u64 = 60;

/// Default request body limit in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = crate::server::handlers::DEFAULT_MAX_BODY_BYTES;

/// Smallest body limit that still fits a maximal prompt.
pub const MIN_MAX_BODY_BYTES: usize = 4 * 1024;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image Relay - authenticated image generation over HTTP.
///
/// Validates JSON requests, resolves target dimensions and forwards them to
/// Cloudflare Workers AI, returning the generated PNG.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-relay")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMAGE_RELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMAGE_RELAY_PORT")]
    pub port: u16,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Shared secret callers must present as `Authorization: Bearer <key>`.
    #[arg(long, env = "IMAGE_RELAY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // =========================================================================
    // Backend Configuration
    // =========================================================================
    /// Cloudflare account id owning the Workers AI models.
    #[arg(long, env = "IMAGE_RELAY_CF_ACCOUNT_ID")]
    pub cf_account_id: Option<String>,

    /// Cloudflare API token with Workers AI permissions.
    #[arg(long, env = "IMAGE_RELAY_CF_API_TOKEN", hide_env_values = true)]
    pub cf_api_token: Option<String>,

    /// Cloudflare API base URL (override for AI Gateway or testing).
    #[arg(long, default_value = DEFAULT_WORKERS_AI_BASE_URL, env = "IMAGE_RELAY_CF_BASE_URL")]
    pub cf_base_url: String,

    /// Backend deadline in seconds.
    #[arg(long, default_value_t = DEFAULT_GENERATE_TIMEOUT_SECS, env = "IMAGE_RELAY_GENERATE_TIMEOUT_SECS")]
    pub generate_timeout_secs: u64,

    // =========================================================================
    // Request Policy
    // =========================================================================
    /// Model used when the request names none or one that is not allowed.
    #[arg(long, default_value = DEFAULT_MODEL, env = "IMAGE_RELAY_DEFAULT_MODEL")]
    pub default_model: String,

    /// Models callers may request (comma-separated).
    ///
    /// If not specified, the built-in Workers AI text-to-image list is used.
    #[arg(long, env = "IMAGE_RELAY_ALLOWED_MODELS", value_delimiter = ',')]
    pub allowed_models: Option<Vec<String>>,

    /// Round resolved dimensions to multiples of this value (1 disables).
    #[arg(long, default_value_t = DEFAULT_ALIGNMENT, env = "IMAGE_RELAY_ALIGNMENT")]
    pub alignment: u32,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "IMAGE_RELAY_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origin.
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "IMAGE_RELAY_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if is_blank(&self.api_key) {
            return Err(
                "API key is required. Set --api-key or IMAGE_RELAY_API_KEY".to_string(),
            );
        }

        if is_blank(&self.cf_account_id) {
            return Err(
                "Cloudflare account id is required. Set --cf-account-id or IMAGE_RELAY_CF_ACCOUNT_ID"
                    .to_string(),
            );
        }

        if is_blank(&self.cf_api_token) {
            return Err(
                "Cloudflare API token is required. Set --cf-api-token or IMAGE_RELAY_CF_API_TOKEN"
                    .to_string(),
            );
        }

        if !self.cf_base_url.starts_with("http://") && !self.cf_base_url.starts_with("https://") {
            return Err("cf_base_url must start with http:// or https://".to_string());
        }

        if self.default_model.trim().is_empty() {
            return Err("default_model must not be empty".to_string());
        }

        if let Some(ref models) = self.allowed_models {
            if !models.iter().any(|m| m.trim() == self.default_model.trim()) {
                return Err(format!(
                    "default_model '{}' must be one of allowed_models",
                    self.default_model
                ));
            }
        }

        if !is_valid_alignment(self.alignment) {
            return Err(format!(
                "alignment must be a power of two between 1 and {}",
                MAX_ALIGNMENT
            ));
        }

        if self.generate_timeout_secs == 0 {
            return Err("generate_timeout_secs must be greater than 0".to_string());
        }

        if self.max_body_bytes < MIN_MAX_BODY_BYTES {
            return Err(format!(
                "max_body_bytes must be at least {}",
                MIN_MAX_BODY_BYTES
            ));
        }

        if let Some(ref origin) = self.cors_origin {
            if http::HeaderValue::from_str(origin).is_err() {
                return Err(format!("cors_origin '{}' is not a valid header value", origin));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the backend deadline.
    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    /// Build the model allow-list from the configured models.
    pub fn model_allow_list(&self) -> ModelAllowList {
        let default_model = self.default_model.trim();
        match &self.allowed_models {
            Some(models) => ModelAllowList::new(models.iter().cloned(), default_model),
            None => ModelAllowList::new(DEFAULT_ALLOWED_MODELS.iter().copied(), default_model),
        }
    }

    /// Build the immutable router configuration (call validate() first).
    pub fn router_config(&self) -> RouterConfig {
        let mut router_config = RouterConfig::new(self.api_key.as_deref().unwrap_or(""))
            .with_models(self.model_allow_list())
            .with_alignment(self.alignment)
            .with_generate_timeout(self.generate_timeout())
            .with_max_body_bytes(self.max_body_bytes)
            .with_tracing(!self.no_tracing);

        if let Some(ref origin) = self.cors_origin {
            router_config = router_config.with_cors_origin(origin.clone());
        }

        router_config
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

// =============================================================================
// Tests
// =============================================================================
