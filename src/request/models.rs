//! Backend model allow-list.
//!
//! Only identifiers in the list ever reach the backend. Anything else a
//! caller asks for is replaced by the default model without an error.

use serde_json::Value;
use tracing::debug;

/// Stable Diffusion XL base; accepts explicit width/height in 256..=2048.
pub const DEFAULT_MODEL: &str = "@cf/stabilityai/stable-diffusion-xl-base-1.0";

/// Models callers may request by name.
pub const DEFAULT_ALLOWED_MODELS: &[&str] = &[
    DEFAULT_MODEL,
    "@cf/bytedance/stable-diffusion-xl-lightning",
    "@cf/lykon/dreamshaper-8-lcm",
    "@cf/black-forest-labs/flux-1-schnell",
];

/// Immutable set of permitted backend model identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAllowList {
    models: Vec<String>,
    default_model: String,
}

impl Default for ModelAllowList {
    fn default() -> Self {
        Self {
            models: DEFAULT_ALLOWED_MODELS.iter().map(|m| m.to_string()).collect(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ModelAllowList {
    /// Build an allow-list from explicit identifiers.
    ///
    /// The default model is added to the list if it is not already a member,
    /// so substitution always yields an allowed identifier.
    pub fn new<I, S>(models: I, default_model: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let default_model = default_model.into();
        let mut unique: Vec<String> = Vec::new();
        for model in models {
            let model: String = model.into();
            let model = model.trim().to_string();
            if !model.is_empty() && !unique.contains(&model) {
                unique.push(model);
            }
        }

        if !unique.contains(&default_model) {
            unique.push(default_model.clone());
        }

        Self {
            models: unique,
            default_model,
        }
    }

    /// The model used when the caller's choice is absent or not allowed.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// All allowed identifiers.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Exact, case-sensitive membership test.
    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Pick the model for a request.
    ///
    /// Returns the requested identifier verbatim if it is a string on the
    /// list, otherwise the default model.
    pub fn resolve(&self, requested: Option<&Value>) -> &str {
        match requested {
            None | Some(Value::Null) => self.default_model(),
            Some(Value::String(model)) => match self.models.iter().find(|m| *m == model) {
                Some(allowed) => allowed.as_str(),
                None => {
                    debug!(requested = %model, "Unknown model requested, using default");
                    self.default_model()
                }
            },
            Some(other) => {
                debug!(requested = %other, "Non-string model requested, using default");
                self.default_model()
            }
        }
    }
}
