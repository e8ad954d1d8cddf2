//! Width/height resolution from partial sizing input.
//!
//! # Precedence
//!
//! ```text
//! width + height   → used as given
//! width only       → height = round(width / ratio)
//! height only      → width  = round(height * ratio)
//! neither          → long edge on the dominant axis of the ratio
//! ```
//!
//! Every dimension is then normalized: non-positive values fall back to
//! [`DEFAULT_DIMENSION`], the result is clamped to
//! [`MIN_DIMENSION`]..=[`MAX_DIMENSION`] and rounded to the nearest multiple
//! of the resolver's alignment.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::aspect::parse_aspect_ratio;

/// Smallest width or height the backend accepts.
pub const MIN_DIMENSION: u32 = 256;

/// Largest width or height the backend accepts.
pub const MAX_DIMENSION: u32 = 2048;

/// Substitute for a dimension that could not be derived.
pub const DEFAULT_DIMENSION: u32 = 1024;

/// Long edge used when the request does not provide one.
pub const DEFAULT_LONG_EDGE: u32 = 1024;

/// Default alignment, matching the backend's 8-pixel latent tiling.
pub const DEFAULT_ALIGNMENT: u32 = 8;

/// Largest supported alignment. Any power of two up to this value divides
/// both range bounds, so aligned values never leave the range.
pub const MAX_ALIGNMENT: u32 = 256;

/// Raw sizing fields as they appear in the request body.
///
/// Each field holds whatever JSON the caller sent; interpretation happens in
/// [`DimensionResolver::resolve`], which never fails.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizingInput {
    #[serde(default)]
    pub width: Option<Value>,

    #[serde(default)]
    pub height: Option<Value>,

    #[serde(default)]
    pub aspect_ratio: Option<Value>,

    #[serde(default)]
    pub long_edge: Option<Value>,
}

/// Final target dimensions, both within the supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedDimensions {
    pub width: u32,
    pub height: u32,
}

impl ResolvedDimensions {
    /// Suggested download filename, e.g. `image-1024x576.png`.
    pub fn filename(&self) -> String {
        format!("image-{}x{}.png", self.width, self.height)
    }
}

/// Returns true if `alignment` is a power of two no larger than
/// [`MAX_ALIGNMENT`].
pub fn is_valid_alignment(alignment: u32) -> bool {
    alignment.is_power_of_two() && alignment <= MAX_ALIGNMENT
}

/// Resolves a [`SizingInput`] into [`ResolvedDimensions`].
///
/// Stateless apart from the alignment policy, so a single instance can be
/// shared across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionResolver {
    alignment: u32,
}

impl Default for DimensionResolver {
    fn default() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
        }
    }
}

impl DimensionResolver {
    /// Create a resolver that rounds to multiples of `alignment`.
    ///
    /// An alignment of `1` disables rounding. Values that are not a valid
    /// alignment (see [`is_valid_alignment`]) fall back to
    /// [`DEFAULT_ALIGNMENT`]; configuration validation rejects them earlier.
    pub fn new(alignment: u32) -> Self {
        let alignment = if is_valid_alignment(alignment) {
            alignment
        } else {
            DEFAULT_ALIGNMENT
        };
        Self { alignment }
    }

    /// Resolver that only clamps.
    pub fn unaligned() -> Self {
        Self { alignment: 1 }
    }

    /// The alignment this resolver rounds to.
    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    /// Resolve the target dimensions. Total: malformed input degrades to
    /// defaults instead of failing.
    pub fn resolve(&self, input: &SizingInput) -> ResolvedDimensions {
        let ratio = input
            .aspect_ratio
            .as_ref()
            .and_then(parse_aspect_ratio)
            .unwrap_or(1.0);

        let width = input.width.as_ref().and_then(positive_integer);
        let height = input.height.as_ref().and_then(positive_integer);

        let (w, h) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, (w / ratio).round()),
            (None, Some(h)) => ((h * ratio).round(), h),
            (None, None) => {
                let long_edge = input
                    .long_edge
                    .as_ref()
                    .and_then(positive_number)
                    .map(f64::round)
                    .unwrap_or(f64::from(DEFAULT_LONG_EDGE));

                if ratio >= 1.0 {
                    (long_edge, (long_edge / ratio).round())
                } else {
                    ((long_edge * ratio).round(), long_edge)
                }
            }
        };

        ResolvedDimensions {
            width: self.normalize(w),
            height: self.normalize(h),
        }
    }

    fn normalize(&self, value: f64) -> u32 {
        let value = if value.is_nan() || value <= 0.0 {
            f64::from(DEFAULT_DIMENSION)
        } else {
            value
        };

        let clamped = value
            .round()
            .clamp(f64::from(MIN_DIMENSION), f64::from(MAX_DIMENSION));

        let unit = f64::from(self.alignment);
        let aligned = ((clamped / unit).round() * unit).max(unit);

        aligned as u32
    }
}

/// A JSON number holding a positive integer, as `f64`.
fn positive_integer(value: &Value) -> Option<f64> {
    positive_number(value).filter(|n| n.fract() == 0.0)
}

/// A JSON number that is positive. Strings are not coerced.
fn positive_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite() && *n > 0.0)
}
