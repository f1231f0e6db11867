//! Configuration types for the textsynth client.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! [`SynthConfig`] that the session loop runs with.

use std::env;
use std::path::PathBuf;

use arrrg_derive::CommandLine;

use crate::client::API_KEY_ENV;
use crate::error::{Error, Result};
use crate::newlines;
use crate::types::{Model, ServiceVariant, SessionParameters, list_models};

/// Largest prompt, in bytes, the service accepts unless overridden.
pub const DEFAULT_PROMPT_MAX_BYTES: usize = 4095;

/// Command-line arguments for the textsynth tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct SynthArgs {
    /// Model to complete with.
    #[arrrg(optional, "Model to use (default: gptj_6B)", "MODEL")]
    pub model: Option<String>,

    /// Prompt text given inline.
    #[arrrg(optional, "Prompt to complete", "TEXT")]
    pub prompt: Option<String>,

    /// File holding the prompt.
    #[arrrg(optional, "Read the prompt from a file", "PATH")]
    pub promptfile: Option<String>,

    /// Sampling temperature, parsed as a float.
    #[arrrg(optional, "Sampling temperature 0.1-10 (default: 1.0)", "TEMP")]
    pub temperature: Option<String>,

    /// Top-k sampling limit.
    #[arrrg(optional, "Top-k 1-1000 (default: 40)", "K")]
    pub top_k: Option<u32>,

    /// Nucleus sampling threshold, parsed as a float.
    #[arrrg(optional, "Top-p in (0, 1] (default: 0.9)", "P")]
    pub top_p: Option<String>,

    /// Random seed; 0 picks one at random.
    #[arrrg(optional, "Seed, 0 for random (default: 0)", "SEED")]
    pub seed: Option<u32>,

    /// Maximum generated tokens.
    #[arrrg(optional, "Max tokens to generate (default: 200)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Stop token; disables streaming.
    #[arrrg(optional, "Stop generating at this token (disables streaming)", "TOKEN")]
    pub stop: Option<String>,

    /// Leave line breaks in the prompt and the output as they are.
    #[arrrg(flag, "Do not normalize line breaks")]
    pub dont_normalize_newline: bool,

    /// API key; falls back to TEXTSYNTH_API_KEY.
    #[arrrg(optional, "API key (default: $TEXTSYNTH_API_KEY)", "KEY")]
    pub apikey: Option<String>,

    /// Which flavor of the service to talk to.
    #[arrrg(optional, "Service: full or streaming-only (default: full)", "SERVICE")]
    pub service: Option<String>,

    /// Base URL replacing the service default, e.g. a local mock.
    #[arrrg(optional, "Override the service base URL", "URL")]
    pub base_url: Option<String>,

    /// Upper bound on the prompt size in bytes, checked before each request.
    #[arrrg(optional, "Largest prompt in bytes (default: 4095)", "BYTES")]
    pub max_prompt_bytes: Option<u32>,

    /// JSON-lines session log to append to.
    #[arrrg(optional, "Append a JSON line per request and fragment to this file", "PATH")]
    pub log_file: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a run of the session loop.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Sampling and formatting parameters shared by every session.
    pub params: SessionParameters,

    /// The initial prompt, already normalized when normalization is on.
    pub prompt: String,

    /// The API key, if one was given or found in the environment.
    pub api_key: Option<String>,

    /// Base URL override; `None` uses the variant's default.
    pub base_url: Option<String>,

    /// Largest prompt, in bytes, sent to the service.
    pub prompt_max_bytes: usize,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Where to append the JSON-lines session log.
    pub log_file: Option<PathBuf>,
}

impl SynthConfig {
    /// Creates a config for `prompt` with default parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            params: SessionParameters::default(),
            prompt: prompt.into(),
            api_key: None,
            base_url: None,
            prompt_max_bytes: DEFAULT_PROMPT_MAX_BYTES,
            use_color: true,
            log_file: None,
        }
    }

    /// Resolve and validate command-line arguments.
    ///
    /// Reads `--promptfile` if given.  Nothing here touches the network.
    pub fn from_args(args: SynthArgs) -> Result<Self> {
        let variant = match args.service.as_deref() {
            Some(service) => service.parse::<ServiceVariant>()?,
            None => ServiceVariant::default(),
        };
        let model = match args.model.as_deref() {
            Some(model) => model.parse::<Model>().map_err(|_| {
                Error::validation(
                    format!("model must be either {}.", list_models(variant.models())),
                    Some("model".to_string()),
                )
            })?,
            None => Model::default(),
        };

        let prompt = match (args.prompt, args.promptfile) {
            (Some(_), Some(_)) => {
                return Err(Error::validation(
                    "--prompt and --promptfile are mutually exclusive",
                    Some("prompt".to_string()),
                ));
            }
            (Some(prompt), None) => prompt,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .map_err(|e| Error::io(format!("could not read prompt file {path}"), e))?,
            (None, None) => String::new(),
        };
        if prompt.is_empty() {
            return Err(Error::validation(
                "a prompt is required (--prompt or --promptfile)",
                Some("prompt".to_string()),
            ));
        }

        let mut params = SessionParameters::new(model)
            .with_variant(variant)
            .with_stop(args.stop)
            .with_normalize_newlines(!args.dont_normalize_newline);
        if let Some(temperature) = args.temperature.as_deref() {
            params = params.with_temperature(parse_float(temperature, "temperature")?);
        }
        if let Some(top_p) = args.top_p.as_deref() {
            params = params.with_top_p(parse_float(top_p, "top_p")?);
        }
        if let Some(top_k) = args.top_k {
            params = params.with_top_k(top_k);
        }
        if let Some(seed) = args.seed {
            params = params.with_seed(seed);
        }
        if let Some(max_tokens) = args.max_tokens {
            params = params.with_max_tokens(Some(max_tokens));
        }
        params.validate()?;

        let prompt = if params.normalize_newlines {
            newlines::to_unix(&prompt)
        } else {
            prompt
        };

        Ok(SynthConfig {
            params,
            prompt,
            api_key: args
                .apikey
                .or_else(|| env::var(API_KEY_ENV).ok())
                .filter(|key| !key.is_empty()),
            base_url: args.base_url,
            prompt_max_bytes: args
                .max_prompt_bytes
                .map(|bytes| bytes as usize)
                .unwrap_or(DEFAULT_PROMPT_MAX_BYTES),
            use_color: !args.no_color,
            log_file: args.log_file.map(PathBuf::from),
        })
    }

    /// Sets the session parameters.
    pub fn with_params(mut self, params: SessionParameters) -> Self {
        self.params = params;
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Sets the base URL override.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the prompt size limit.
    pub fn with_prompt_max_bytes(mut self, prompt_max_bytes: usize) -> Self {
        self.prompt_max_bytes = prompt_max_bytes;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the session log path.
    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }
}

fn parse_float(value: &str, param: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        Error::validation(
            format!("{param} expects a number, got {value:?}"),
            Some(param.to_string()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newlines::LineBreak;
    use crate::types::{DEFAULT_MAX_TOKENS, DEFAULT_TOP_K};

    fn args(prompt: &str) -> SynthArgs {
        SynthArgs {
            prompt: Some(prompt.to_string()),
            apikey: Some("key".to_string()),
            ..SynthArgs::default()
        }
    }

    #[test]
    fn config_from_args_defaults() {
        let config = SynthConfig::from_args(args("Once upon a time")).unwrap();
        assert_eq!(config.params.model, Model::GptJ6B);
        assert_eq!(config.params.variant, ServiceVariant::Full);
        assert_eq!(config.params.temperature, 1.0);
        assert_eq!(config.params.top_k, DEFAULT_TOP_K);
        assert_eq!(config.params.top_p, 0.9);
        assert_eq!(config.params.seed, 0);
        assert_eq!(config.params.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert!(config.params.stop.is_none());
        assert!(config.params.normalize_newlines);
        assert_eq!(config.prompt, "Once upon a time");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.prompt_max_bytes, DEFAULT_PROMPT_MAX_BYTES);
        assert!(config.use_color);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn config_from_args_custom() {
        let config = SynthConfig::from_args(SynthArgs {
            model: Some("boris_6B".to_string()),
            temperature: Some("0.5".to_string()),
            top_k: Some(10),
            top_p: Some("1".to_string()),
            seed: Some(42),
            max_tokens: Some(16),
            stop: Some("\n\n".to_string()),
            max_prompt_bytes: Some(100),
            log_file: Some("session.jsonl".to_string()),
            no_color: true,
            ..args("Hi")
        })
        .unwrap();
        assert_eq!(config.params.model, Model::Boris6B);
        assert_eq!(config.params.temperature, 0.5);
        assert_eq!(config.params.top_k, 10);
        assert_eq!(config.params.top_p, 1.0);
        assert_eq!(config.params.seed, 42);
        assert_eq!(config.params.max_tokens, Some(16));
        assert_eq!(config.params.stop.as_deref(), Some("\n\n"));
        assert!(!config.params.is_streaming());
        assert_eq!(config.prompt_max_bytes, 100);
        assert_eq!(config.log_file, Some(PathBuf::from("session.jsonl")));
        assert!(!config.use_color);
    }

    #[test]
    fn empty_stop_keeps_streaming() {
        let config = SynthConfig::from_args(SynthArgs {
            stop: Some(String::new()),
            ..args("Hi")
        })
        .unwrap();
        assert!(config.params.is_streaming());
    }

    #[test]
    fn prompt_sources_are_exclusive() {
        let err = SynthConfig::from_args(SynthArgs {
            promptfile: Some("prompt.txt".to_string()),
            ..args("Hi")
        })
        .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.param(), Some("prompt"));
    }

    #[test]
    fn prompt_is_required() {
        let err = SynthConfig::from_args(SynthArgs::default()).unwrap_err();
        assert_eq!(err.param(), Some("prompt"));
        let err = SynthConfig::from_args(args("")).unwrap_err();
        assert_eq!(err.param(), Some("prompt"));
    }

    #[test]
    fn prompt_file_is_read() {
        let path =
            std::env::temp_dir().join(format!("textsynth-prompt-{}.txt", std::process::id()));
        std::fs::write(&path, "from\r\na file").unwrap();
        let config = SynthConfig::from_args(SynthArgs {
            prompt: None,
            promptfile: Some(path.to_string_lossy().into_owned()),
            ..args("")
        })
        .unwrap();
        assert_eq!(config.prompt, "from\na file");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_prompt_file_is_io_error() {
        let err = SynthConfig::from_args(SynthArgs {
            prompt: None,
            promptfile: Some("/nonexistent/textsynth/prompt.txt".to_string()),
            ..args("")
        })
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn prompt_normalizes_to_unix_line_breaks() {
        // Whatever the output line break, the prompt sent uses `\n`.
        let config = SynthConfig::from_args(args("a\r\nb\rc")).unwrap();
        assert_eq!(config.prompt, "a\nb\nc");
        assert_eq!(config.params.line_break, LineBreak::default());
    }

    #[test]
    fn dont_normalize_keeps_prompt() {
        let config = SynthConfig::from_args(SynthArgs {
            dont_normalize_newline: true,
            ..args("a\rb")
        })
        .unwrap();
        assert_eq!(config.prompt, "a\rb");
        assert!(!config.params.normalize_newlines);
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            (
                SynthArgs {
                    model: Some("gpt5".to_string()),
                    ..args("Hi")
                },
                "model",
            ),
            (
                SynthArgs {
                    temperature: Some("0.05".to_string()),
                    ..args("Hi")
                },
                "temperature",
            ),
            (
                SynthArgs {
                    temperature: Some("hot".to_string()),
                    ..args("Hi")
                },
                "temperature",
            ),
            (
                SynthArgs {
                    top_p: Some("0".to_string()),
                    ..args("Hi")
                },
                "top_p",
            ),
            (
                SynthArgs {
                    top_k: Some(1001),
                    ..args("Hi")
                },
                "top_k",
            ),
        ];
        for (args, param) in cases {
            let err = SynthConfig::from_args(args).unwrap_err();
            assert!(err.is_validation(), "{param}: {err}");
            assert_eq!(err.param(), Some(param));
        }
    }

    #[test]
    fn unknown_model_lists_choices() {
        let err = SynthConfig::from_args(SynthArgs {
            model: Some("gpt5".to_string()),
            ..args("Hi")
        })
        .unwrap_err();
        assert!(
            err.to_string()
                .contains("model must be either boris_6B, fairseq_gpt_13B, or gptj_6B.")
        );
    }

    #[test]
    fn model_must_match_service() {
        let err = SynthConfig::from_args(SynthArgs {
            model: Some("boris_6B".to_string()),
            service: Some("streaming-only".to_string()),
            ..args("Hi")
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: model must be either gpt2_1558M, gpt2_345M, or gptj_6B. \
             (parameter: model)"
        );
    }

    #[test]
    fn streaming_only_rejects_stop() {
        let err = SynthConfig::from_args(SynthArgs {
            service: Some("streaming-only".to_string()),
            stop: Some("END".to_string()),
            ..args("Hi")
        })
        .unwrap_err();
        assert_eq!(err.param(), Some("stop"));
    }

    #[test]
    fn config_builder_pattern() {
        let params = SessionParameters::default().with_line_break(LineBreak::Lf);
        let config = SynthConfig::new("p")
            .with_params(params.clone())
            .with_api_key(Some("k".to_string()))
            .with_base_url(Some("http://localhost:8080".to_string()))
            .with_prompt_max_bytes(10)
            .without_color()
            .with_log_file(Some(PathBuf::from("log.jsonl")));
        assert_eq!(config.params, params);
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.prompt_max_bytes, 10);
        assert!(!config.use_color);
        assert_eq!(config.log_file, Some(PathBuf::from("log.jsonl")));
    }
}
