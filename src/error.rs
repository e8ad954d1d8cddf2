use std::time::Duration;

use thiserror::Error;

/// Errors raised by the image-generation backend.
///
/// These never reach the caller verbatim; the HTTP layer collapses every
/// variant into a generic 500.
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    /// Backend answered with a non-success status
    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network or connection error while talking to the backend
    #[error("Network error: {0}")]
    Network(String),

    /// Backend did not answer within the configured deadline
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    /// Backend answered successfully but the payload was not an image
    #[error("Malformed backend output: {0}")]
    MalformedOutput(String),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        GenerateError::Network(err.to_string())
    }
}

/// Terminal request errors, each mapped to exactly one HTTP status.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Method or path not served (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Content-Type is not JSON (415)
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    /// Body is not valid JSON (400)
    #[error("Invalid JSON body")]
    InvalidBody,

    /// Body exceeds the configured byte limit (413)
    #[error("Request body too large")]
    BodyTooLarge,

    /// Prompt absent, not a string, or blank after trimming (400)
    #[error("Prompt is required")]
    PromptMissingOrEmpty,

    /// Prompt longer than the maximum after trimming (413)
    #[error("Prompt exceeds {max} characters")]
    PromptTooLong { length: usize, max: usize },

    /// Backend failed for any reason (500)
    #[error("Image generation failed")]
    GenerationFailed(#[source] GenerateError),
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        ApiError::GenerationFailed(err)
    }
}
