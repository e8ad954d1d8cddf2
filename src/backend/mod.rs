//! Image-generation backend.
//!
//! The relay treats image synthesis as an external collaborator behind the
//! [`ImageGenerator`] trait:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             generate_handler            │
//! └────────────────────┬────────────────────┘
//!                      │ model, {prompt, width, height}
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          ImageGenerator Trait           │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           WorkersAiGenerator            │
//! │   POST /accounts/{id}/ai/run/{model}    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Tests substitute their own implementation.

mod workers_ai;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::dimensions::ResolvedDimensions;
use crate::error::GenerateError;

pub use workers_ai::{WorkersAiGenerator, DEFAULT_WORKERS_AI_BASE_URL};

/// Parameters forwarded to the backend for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, dimensions: ResolvedDimensions) -> Self {
        Self {
            prompt: prompt.into(),
            width: dimensions.width,
            height: dimensions.height,
        }
    }
}

/// An external service that turns a prompt into image bytes.
///
/// Implementations must not retry; a failed call is reported once and the
/// relay answers with a generic error.
#[async_trait]
pub trait ImageGenerator: Send + Sync + 'static {
    /// Generate one image with the given model.
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<Bytes, GenerateError>;
}
