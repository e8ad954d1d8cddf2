//! Dimension resolution.
//!
//! Turns whatever sizing hints a caller sends (explicit width and height, an
//! aspect ratio, a long edge, or nothing at all) into a concrete pair of
//! dimensions the backend accepts.
//!
//! ```text
//!   SizingInput ──► parse_aspect_ratio ──► precedence ──► normalize ──► ResolvedDimensions
//!   (raw JSON)        (ratio or 1.0)        (4 cases)     (clamp, align)   (256..=2048)
//! ```
//!
//! # Example
//!
//! ```
//! use image_relay::dimensions::{DimensionResolver, SizingInput};
//! use serde_json::json;
//!
//! let sizing: SizingInput =
//!     serde_json::from_value(json!({"aspectRatio": "16:9", "longEdge": 1920})).unwrap();
//!
//! let dims = DimensionResolver::default().resolve(&sizing);
//! assert_eq!((dims.width, dims.height), (1920, 1080));
//! ```

mod aspect;
mod resolver;

pub use aspect::{parse_aspect_ratio, parse_aspect_ratio_str};
pub use resolver::{
    is_valid_alignment, DimensionResolver, ResolvedDimensions, SizingInput, DEFAULT_ALIGNMENT,
    DEFAULT_DIMENSION, DEFAULT_LONG_EDGE, MAX_ALIGNMENT, MAX_DIMENSION, MIN_DIMENSION,
};
