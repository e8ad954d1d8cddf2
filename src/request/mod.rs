//! Request validation layer.
//!
//! Checks that a request body is usable before any backend work happens:
//!
//! - [`require_json_content_type`]: `Content-Type` must mention JSON (415)
//! - [`parse_body`]: body must be JSON (400)
//! - [`validate_prompt`]: prompt must be a non-blank string of at most
//!   [`MAX_PROMPT_CHARS`] characters (400 / 413)
//! - [`ModelAllowList`]: unknown models are replaced by the default model
//!
//! Sizing fields are passed through untouched; see [`crate::dimensions`].

mod models;
mod validate;

pub use models::{ModelAllowList, DEFAULT_ALLOWED_MODELS, DEFAULT_MODEL};
pub use validate::{
    parse_body, require_json_content_type, validate_prompt, ImageRequest, RawImageRequest,
    MAX_PROMPT_CHARS,
};
