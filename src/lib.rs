//! Streaming client for the TextSynth completion API.
//!
//! A [`StreamingSession`] sends one prompt, renders the continuation as it
//! streams in, and stops cleanly on Ctrl+C.  [`chat::SessionLoop`] repeats
//! sessions over the growing prompt for the `textsynth` binary.

// Public modules
pub mod cancel;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod decoder;
pub mod error;
pub mod newlines;
pub mod render;
pub mod session;
pub mod types;

mod observability;

// Re-exports
pub use cancel::{CancellationController, CtrlC, InterruptSource, Interrupter};
pub use client::{API_KEY_ENV, ByteStream, TextSynth, Transport};
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use decoder::decode_fragments;
pub use error::{Error, Result};
pub use newlines::{LineBreak, StreamNormalizer};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use session::{SessionEnd, SessionOutcome, SessionState, StreamingSession};
pub use types::*;
