// Public modules
pub mod completion_request;
pub mod model;
pub mod service_variant;
pub mod session_parameters;
pub mod stream_fragment;

// Re-exports
pub use completion_request::CompletionRequest;
pub use model::{Model, list_models};
pub use service_variant::ServiceVariant;
pub use session_parameters::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P, SEED_LIMIT,
    SessionParameters,
};
pub use stream_fragment::StreamFragment;
