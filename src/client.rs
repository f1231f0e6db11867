use std::env;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, StatusCode, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{CompletionRequest, Model, ServiceVariant};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("textsynth-rs/", env!("CARGO_PKG_VERSION"));

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "TEXTSYNTH_API_KEY";

/// The raw body of a completion response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens completion streams.
///
/// A transport is shared by every session of a run; each call returns a body
/// stream exclusively owned by the caller.  Dropping the stream before it ends
/// must close the underlying connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` for `model` and return the response body once the
    /// service has answered 200.
    async fn open_stream(&self, model: Model, request: &CompletionRequest) -> Result<ByteStream>;
}

/// Client for the TextSynth completions API.
#[derive(Clone)]
pub struct TextSynth {
    api_key: Option<String>,
    client: ReqwestClient,
    base_url: Url,
    variant: ServiceVariant,
    connect_timeout: Duration,
}

impl TextSynth {
    /// Create a new TextSynth client for `variant`.
    ///
    /// The API key can be provided directly or read from the TEXTSYNTH_API_KEY
    /// environment variable.  Variants that do not authenticate need neither.
    pub fn new(api_key: Option<String>, variant: ServiceVariant) -> Result<Self> {
        Self::with_options(api_key, variant, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        variant: ServiceVariant,
        base_url: Option<&str>,
        connect_timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = match api_key.or_else(|| env::var(API_KEY_ENV).ok()) {
            Some(key) if !key.is_empty() => Some(key),
            _ if variant.requires_auth() => {
                return Err(Error::authentication(
                    "API key not provided and TEXTSYNTH_API_KEY environment variable not set",
                ));
            }
            _ => None,
        };

        let connect_timeout = connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        let base_url = parse_base_url(base_url.unwrap_or_else(|| variant.default_base_url()))?;

        Ok(Self {
            api_key,
            client,
            base_url,
            variant,
            connect_timeout,
        })
    }

    /// The service variant this client talks to.
    pub fn variant(&self) -> ServiceVariant {
        self.variant
    }

    /// The completions endpoint for `model`.
    pub fn endpoint(&self, model: Model) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("v1/engines/{model}/completions"))?)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        if self.variant.requires_auth()
            && let Some(api_key) = &self.api_key
        {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| Error::authentication("API key contains invalid characters"))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_else(|| error_body.trim().to_string());
        Error::api(status_code, message)
    }

    fn classify(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.connect_timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }
}

#[async_trait::async_trait]
impl Transport for TextSynth {
    async fn open_stream(&self, model: Model, request: &CompletionRequest) -> Result<ByteStream> {
        let url = self.endpoint(model)?;
        let body = serde_json::to_vec(request).map_err(|e| {
            Error::serialization(
                format!("Failed to encode request: {e}"),
                Some(Box::new(e)),
            )
        })?;

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .headers(self.default_headers()?)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.classify(e)
            })?;

        if response.status() != StatusCode::OK {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        // Dropping this stream drops the response, which closes the connection
        // instead of returning it to the pool.
        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }
}

impl fmt::Debug for TextSynth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSynth")
            .field("base_url", &self.base_url.as_str())
            .field("variant", &self.variant)
            .field("connect_timeout", &self.connect_timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut base_url = base_url.to_string();
    if !base_url.ends_with('/') {
        base_url.push('/');
    }
    let url = Url::parse(&base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("{base_url} cannot be a base URL"), None));
    }
    Ok(url)
}
