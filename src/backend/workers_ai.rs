//! Cloudflare Workers AI backend.
//!
//! Calls the Workers AI REST endpoint for text-to-image models:
//!
//! ```text
//! POST {base_url}/accounts/{account_id}/ai/run/{model}
//! Authorization: Bearer {api_token}
//! {"prompt": "...", "width": 1024, "height": 576}
//! ```
//!
//! Diffusion models answer with raw `image/png` bytes. Some models answer
//! with JSON instead, carrying the image base64-encoded in `result.image`.
//! Both shapes are accepted.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::GenerateError;

use super::{GenerationRequest, ImageGenerator};

/// Public Cloudflare API base URL.
pub const DEFAULT_WORKERS_AI_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Longest backend error body kept in a [`GenerateError::Api`] message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Workers AI image generator.
#[derive(Clone)]
pub struct WorkersAiGenerator {
    client: Client,
    base_url: String,
    account_id: String,
    api_token: String,
}

impl WorkersAiGenerator {
    /// Create a generator for the given account, using the public API.
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_WORKERS_AI_BASE_URL.to_string(),
            account_id: account_id.into(),
            api_token: api_token.into(),
        }
    }

    /// Point the generator at a different API base URL (gateways, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Full URL for running `model`.
    pub fn run_url(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url.trim_end_matches('/'),
            self.account_id,
            model
        )
    }
}

#[async_trait]
impl ImageGenerator for WorkersAiGenerator {
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<Bytes, GenerateError> {
        let url = self.run_url(model);
        debug!(model = model, width = request.width, height = request.height, "Calling Workers AI");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message: truncate(&String::from_utf8_lossy(&body)),
            });
        }

        if content_type.starts_with("image/") {
            if body.is_empty() {
                return Err(GenerateError::MalformedOutput(
                    "empty image body".to_string(),
                ));
            }
            return Ok(body);
        }

        if content_type.contains("json") {
            return decode_json_image(&body);
        }

        Err(GenerateError::MalformedOutput(format!(
            "unexpected content type '{}'",
            content_type
        )))
    }
}

// --- Workers AI JSON response types ---

#[derive(Deserialize)]
struct WorkersAiResponse {
    #[serde(default)]
    result: Option<WorkersAiResult>,
}

#[derive(Deserialize)]
struct WorkersAiResult {
    #[serde(default)]
    image: Option<String>,
}

fn decode_json_image(body: &[u8]) -> Result<Bytes, GenerateError> {
    let parsed: WorkersAiResponse = serde_json::from_slice(body)
        .map_err(|e| GenerateError::MalformedOutput(format!("invalid JSON response: {}", e)))?;

    let encoded = parsed
        .result
        .and_then(|result| result.image)
        .filter(|image| !image.is_empty())
        .ok_or_else(|| GenerateError::MalformedOutput("no image in response".to_string()))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| GenerateError::MalformedOutput(format!("invalid base64 image: {}", e)))?;

    if data.is_empty() {
        return Err(GenerateError::MalformedOutput(
            "empty image in response".to_string(),
        ));
    }

    Ok(Bytes::from(data))
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_ERROR_BODY_CHARS {
        let head: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
