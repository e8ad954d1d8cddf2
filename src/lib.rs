//! # Image Relay
//!
//! An authenticated, stateless HTTP relay in front of a text-to-image model.
//!
//! Callers `POST /` a small JSON document with a bearer token. The relay
//! validates the request, resolves the output dimensions from explicit
//! sizes or an aspect ratio, forwards the job to Cloudflare Workers AI and
//! streams the PNG back.
//!
//! ## Features
//!
//! - **Shared-secret auth**: constant-time bearer token check before any body parsing
//! - **Strict validation**: JSON-only bodies, bounded prompt length, model allow-list
//! - **Dimension resolution**: clamped, aligned sizes from width/height or aspect ratio
//! - **Safe failures**: backend errors are logged, never echoed to callers
//!
//! ## Architecture
//!
//! - [`dimensions`] - Aspect ratio parsing and dimension resolution
//! - [`request`] - Request body validation and model selection
//! - [`backend`] - Image generator trait and the Workers AI client
//! - [`server`] - Axum router, bearer auth and handlers
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use image_relay::{create_router, RouterConfig, WorkersAiGenerator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = WorkersAiGenerator::new("account-id", "api-token");
//!     let router = create_router(generator, RouterConfig::new("shared-secret"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod request;
pub mod server;

// Re-export commonly used types
pub use backend::{GenerationRequest, ImageGenerator, WorkersAiGenerator};
pub use config::Config;
pub use dimensions::{DimensionResolver, ResolvedDimensions, SizingInput};
pub use error::{ApiError, GenerateError};
pub use request::{ImageRequest, ModelAllowList};
pub use server::{create_router, AppState, BearerAuth, RouterConfig};
