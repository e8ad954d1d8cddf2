//! Request validation: content type, JSON body and prompt.

use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;

use crate::dimensions::SizingInput;
use crate::error::ApiError;

use super::models::ModelAllowList;

/// Maximum prompt length in characters, measured after trimming.
pub const MAX_PROMPT_CHARS: usize = 800;

// =============================================================================
// Raw Body
// =============================================================================

/// Request body as sent by the caller, before any validation.
///
/// Every field is kept as raw JSON so type mismatches can be handled per
/// field instead of failing the whole parse.
#[derive(Debug, Default, Deserialize)]
pub struct RawImageRequest {
    #[serde(default)]
    pub prompt: Option<Value>,

    #[serde(default)]
    pub model: Option<Value>,

    #[serde(flatten)]
    pub sizing: SizingInput,
}

// =============================================================================
// Validated Request
// =============================================================================

/// A validated image-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    /// Trimmed, non-empty prompt of at most [`MAX_PROMPT_CHARS`] characters
    pub prompt: String,

    /// Allowed backend model identifier
    pub model: String,

    /// Unvalidated sizing hints; the resolver never rejects them
    pub sizing: SizingInput,
}

impl ImageRequest {
    /// Parse and validate a request body.
    ///
    /// # Errors
    ///
    /// - [`ApiError::InvalidBody`] if the body is not JSON
    /// - [`ApiError::PromptMissingOrEmpty`] if the prompt is absent, not a
    ///   string, or blank
    /// - [`ApiError::PromptTooLong`] if the trimmed prompt is too long
    pub fn from_body(body: &[u8], models: &ModelAllowList) -> Result<Self, ApiError> {
        let raw = parse_body(body)?;
        let prompt = validate_prompt(raw.prompt.as_ref())?;
        let model = models.resolve(raw.model.as_ref()).to_string();

        Ok(Self {
            prompt,
            model,
            sizing: raw.sizing,
        })
    }
}

// =============================================================================
// Validation Steps
// =============================================================================

/// Require a JSON content type (case-insensitive substring match, so
/// parameters such as `charset` are tolerated).
pub fn require_json_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if is_json {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType)
    }
}

/// Parse the body as JSON.
///
/// Valid JSON that is not an object yields an empty request, which then
/// fails on the missing prompt rather than as a parse error.
pub fn parse_body(body: &[u8]) -> Result<RawImageRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidBody)?;

    match value {
        Value::Object(_) => serde_json::from_value(value).map_err(|_| ApiError::InvalidBody),
        _ => Ok(RawImageRequest::default()),
    }
}

/// Validate the prompt and return it trimmed.
pub fn validate_prompt(prompt: Option<&Value>) -> Result<String, ApiError> {
    let prompt = match prompt {
        Some(Value::String(s)) => s.trim(),
        _ => return Err(ApiError::PromptMissingOrEmpty),
    };

    if prompt.is_empty() {
        return Err(ApiError::PromptMissingOrEmpty);
    }

    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(ApiError::PromptTooLong {
            length,
            max: MAX_PROMPT_CHARS,
        });
    }

    Ok(prompt.to_string())
}
