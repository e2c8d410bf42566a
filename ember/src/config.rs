use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Maximum number of draws a single pass records per frame by default.
pub const DEFAULT_MAX_DRAWS_PER_PASS: usize = 2048;

/// Runtime configuration shared by the shader manager and render passes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Queue items beyond this count are dropped (with a warning) at render time.
    pub max_draws_per_pass: usize,
    /// Warn when a uniform setter names a uniform the program does not declare.
    pub validate_uniforms: bool,
    /// Turn backend error codes into `RenderError::BackendState` instead of only logging them.
    pub strict_backend_errors: bool,
    /// Clear the color target before drawing. `None` keeps existing contents.
    pub clear_color: Option<[f32; 4]>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_draws_per_pass: DEFAULT_MAX_DRAWS_PER_PASS,
            validate_uniforms: cfg!(debug_assertions),
            strict_backend_errors: false,
            clear_color: None,
        }
    }
}

impl RenderConfig {
    /// Parse a config from JSON. Missing fields take their default values.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn with_max_draws(mut self, max: usize) -> Self {
        self.max_draws_per_pass = max;
        self
    }

    #[must_use]
    pub fn with_uniform_validation(mut self, enabled: bool) -> Self {
        self.validate_uniforms = enabled;
        self
    }

    #[must_use]
    pub fn with_strict_backend_errors(mut self, enabled: bool) -> Self {
        self.strict_backend_errors = enabled;
        self
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = Some(color);
        self
    }
}
