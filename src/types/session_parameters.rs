use crate::error::{Error, Result};
use crate::newlines::LineBreak;
use crate::types::{Model, ServiceVariant, list_models};

/// Seeds above this value are rejected by the service.
pub const SEED_LIMIT: u32 = 2_147_483_647;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

/// Default top-k.
pub const DEFAULT_TOP_K: u32 = 40;

/// Default top-p.
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Default number of tokens to generate when the variant accepts `max_tokens`.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Immutable per-run sampling and output configuration.
///
/// Construct with [`SessionParameters::new`] and the `with_*` setters, then call
/// [`SessionParameters::validate`] before handing the parameters to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParameters {
    /// Engine to run.
    pub model: Model,

    /// Which flavor of the service is targeted.
    pub variant: ServiceVariant,

    /// Logits are divided by the temperature (0.1 <= temperature <= 10).
    pub temperature: f64,

    /// Keep only the top-k most probable tokens (1 <= top_k <= 1000).
    pub top_k: u32,

    /// Keep the top tokens with cumulative probability >= top_p (0 < top_p <= 1).
    pub top_p: f64,

    /// Random seed; 0 lets the service choose.
    pub seed: u32,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Explicit stop token.  Its presence disables streaming.
    pub stop: Option<String>,

    /// Whether fragment line endings are normalized.
    pub normalize_newlines: bool,

    /// Target terminator when normalizing.
    pub line_break: LineBreak,
}

impl SessionParameters {
    /// Creates parameters for `model` with the service defaults.
    pub fn new(model: Model) -> Self {
        Self {
            model,
            variant: ServiceVariant::default(),
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
            seed: 0,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            stop: None,
            normalize_newlines: true,
            line_break: LineBreak::native(),
        }
    }

    /// Sets the service variant.
    pub fn with_variant(mut self, variant: ServiceVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the top-k value.
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets the top-p value.
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the token limit.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the stop token.  An empty token clears it.
    pub fn with_stop(mut self, stop: Option<String>) -> Self {
        self.stop = stop.filter(|s| !s.is_empty());
        self
    }

    /// Enables or disables newline normalization.
    pub fn with_normalize_newlines(mut self, normalize: bool) -> Self {
        self.normalize_newlines = normalize;
        self
    }

    /// Sets the normalization target.
    pub fn with_line_break(mut self, line_break: LineBreak) -> Self {
        self.line_break = line_break;
        self
    }

    /// Whether responses are streamed, i.e. no stop token was requested.
    pub fn is_streaming(&self) -> bool {
        self.stop.is_none()
    }

    /// Check every parameter against the service's accepted ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.variant.serves(self.model) {
            return Err(Error::validation(
                format!(
                    "model must be either {}.",
                    list_models(self.variant.models())
                ),
                Some("model".to_string()),
            ));
        }
        if !(0.1..=10.0).contains(&self.temperature) {
            return Err(Error::validation(
                "temperature must be between 0.1 and 10.",
                Some("temperature".to_string()),
            ));
        }
        if !(1..=1000).contains(&self.top_k) {
            return Err(Error::validation(
                "top_k must be between 1 and 1000.",
                Some("top_k".to_string()),
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(Error::validation(
                "invalid top_p value (0 < top-p <= 1).",
                Some("top_p".to_string()),
            ));
        }
        if self.seed > SEED_LIMIT {
            return Err(Error::validation(
                format!("seed cannot be greater than {SEED_LIMIT}"),
                Some("seed".to_string()),
            ));
        }
        if self.stop.is_some() && !self.variant.supports_stop() {
            return Err(Error::validation(
                format!("the {} service does not support stop tokens", self.variant),
                Some("stop".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for SessionParameters {
    fn default() -> Self {
        Self::new(Model::default())
    }
}
