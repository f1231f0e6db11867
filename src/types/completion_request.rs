use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SessionParameters;

/// Body of a `POST /v1/engines/<model>/completions` request.
///
/// Exactly one of two shapes is produced: `stream: true` with no `stop`, or
/// `stream: false` with `stop` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Text to continue.
    pub prompt: String,

    /// Sampling temperature.
    pub temperature: f64,

    /// Top-k sampling limit.
    pub top_k: u32,

    /// Nucleus sampling threshold.
    pub top_p: f64,

    /// Random seed; 0 lets the service choose.
    pub seed: u32,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether the response is streamed line by line.
    pub stream: bool,

    /// Explicit stop token; only sent when not streaming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
}

impl CompletionRequest {
    /// Assemble the request body for `prompt`.
    ///
    /// Fails when a stop token is requested from a variant that can only
    /// stream.
    pub fn build(params: &SessionParameters, prompt: impl Into<String>) -> Result<Self> {
        if params.stop.is_some() && !params.variant.supports_stop() {
            return Err(Error::validation(
                format!("the {} service cannot honor a stop token", params.variant),
                Some("stop".to_string()),
            ));
        }
        let max_tokens = if params.variant.sends_max_tokens() {
            params.max_tokens
        } else {
            None
        };
        Ok(Self {
            prompt: prompt.into(),
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            seed: params.seed,
            max_tokens,
            stream: params.stop.is_none(),
            stop: params.stop.clone(),
        })
    }
}
