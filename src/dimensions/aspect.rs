//! Aspect ratio parsing.
//!
//! Accepts `"w:h"`, `"w/h"` or a bare decimal such as `"1.5"`. Anything that
//! does not yield a positive, finite ratio is rejected with `None`; callers
//! fall back to a square ratio.

use serde_json::Value;

/// Parse an aspect ratio from a JSON value.
///
/// Only strings are considered. Numbers, booleans and other JSON types yield
/// `None` just like malformed strings do.
pub fn parse_aspect_ratio(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => parse_aspect_ratio_str(s),
        _ => None,
    }
}

/// Parse an aspect ratio from a string.
///
/// # Examples
///
/// ```
/// use image_relay::dimensions::parse_aspect_ratio_str;
///
/// assert_eq!(parse_aspect_ratio_str("2:1"), Some(2.0));
/// assert_eq!(parse_aspect_ratio_str("3/4"), Some(0.75));
/// assert_eq!(parse_aspect_ratio_str("1.5"), Some(1.5));
/// assert_eq!(parse_aspect_ratio_str("0:5"), None);
/// ```
pub fn parse_aspect_ratio_str(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let ratio = match s.find([':', '/']) {
        Some(idx) => {
            let a = parse_positive(&s[..idx])?;
            let b = parse_positive(&s[idx + 1..])?;
            a / b
        }
        None => parse_positive(s)?,
    };

    // a/b can still overflow or underflow for extreme operands
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

fn parse_positive(part: &str) -> Option<f64> {
    let n: f64 = part.trim().parse().ok()?;
    (n.is_finite() && n > 0.0).then_some(n)
}
