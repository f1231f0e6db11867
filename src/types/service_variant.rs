use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::Model;

/// The flavor of TextSynth deployment the client talks to.
///
/// The current service authenticates with a bearer token and accepts
/// `max_tokens` and `stop`.  The older public endpoint is unauthenticated and
/// only ever streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceVariant {
    /// api.textsynth.com
    #[default]
    Full,

    /// The legacy streaming-only endpoint.
    StreamingOnly,
}

impl ServiceVariant {
    /// Base URL used when no override is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ServiceVariant::Full => "https://api.textsynth.com",
            ServiceVariant::StreamingOnly => "https://bellard.org/textsynth/api",
        }
    }

    /// Whether requests carry `Authorization: Bearer <apikey>`.
    pub fn requires_auth(&self) -> bool {
        matches!(self, ServiceVariant::Full)
    }

    /// Whether requests carry `max_tokens`.
    pub fn sends_max_tokens(&self) -> bool {
        matches!(self, ServiceVariant::Full)
    }

    /// Whether an explicit stop token may be requested.
    pub fn supports_stop(&self) -> bool {
        matches!(self, ServiceVariant::Full)
    }

    /// Engines served by this variant.
    pub fn models(&self) -> &'static [Model] {
        match self {
            ServiceVariant::Full => &[Model::Boris6B, Model::FairseqGpt13B, Model::GptJ6B],
            ServiceVariant::StreamingOnly => &[Model::Gpt2Medium, Model::Gpt2Xl, Model::GptJ6B],
        }
    }

    /// Whether `model` is served by this variant.
    pub fn serves(&self, model: Model) -> bool {
        self.models().contains(&model)
    }
}

impl fmt::Display for ServiceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceVariant::Full => write!(f, "full"),
            ServiceVariant::StreamingOnly => write!(f, "streaming-only"),
        }
    }
}

impl FromStr for ServiceVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(ServiceVariant::Full),
            "streaming-only" | "streaming_only" | "legacy" => Ok(ServiceVariant::StreamingOnly),
            _ => Err(Error::validation(
                format!("invalid service {s:?}; expected full or streaming-only"),
                Some("service".to_string()),
            )),
        }
    }
}
