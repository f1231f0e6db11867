//! One request/stream/accumulate cycle.
//!
//! A [`StreamingSession`] builds the request body, opens the response stream
//! through a [`Transport`], writes every decoded fragment to the renderer as it
//! arrives, and stops early if the user interrupts.  Both a completed and a
//! canceled session produce a [`SessionOutcome`]; transport and protocol
//! failures are returned as errors.

use std::time::Instant;

use futures::StreamExt;
use serde::Serialize;

use crate::cancel::{CancellationController, InterruptSource};
use crate::client::Transport;
use crate::client_logger::ClientLogger;
use crate::decoder::decode_fragments;
use crate::error::Result;
use crate::newlines::StreamNormalizer;
use crate::observability::{
    SESSION_CANCELED, SESSION_COMPLETED, SESSION_FAILED, STREAM_DURATION, STREAM_ERRORS,
    STREAM_TTFB,
};
use crate::render::Renderer;
use crate::types::{CompletionRequest, SessionParameters};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing sent yet.
    Idle,
    /// Request sent, waiting for the response status.
    RequestSent,
    /// Reading the response body.
    Streaming,
    /// The stream ended on its own.
    Completed,
    /// The user interrupted the stream.
    Canceled,
    /// The request or stream failed.
    Failed,
}

impl SessionState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Canceled | SessionState::Failed
        )
    }
}

/// How a session that produced output ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    /// The stream reached its end.
    Completed,
    /// The user interrupted; the outcome holds the partial result.
    Canceled,
}

/// Result of a completed or canceled session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    /// How the session ended.
    pub end: SessionEnd,
    /// The fragments in arrival order, concatenated.
    pub emitted_text: String,
    /// The prompt followed by `emitted_text`.
    pub accumulated_prompt: String,
}

impl SessionOutcome {
    /// Whether the user interrupted the session.
    pub fn is_canceled(&self) -> bool {
        self.end == SessionEnd::Canceled
    }
}

/// A single streaming completion.
pub struct StreamingSession<'a> {
    transport: &'a dyn Transport,
    params: &'a SessionParameters,
    interrupts: &'a dyn InterruptSource,
    logger: Option<&'a dyn ClientLogger>,
    state: SessionState,
}

impl<'a> StreamingSession<'a> {
    /// Creates an idle session.
    pub fn new(
        transport: &'a dyn Transport,
        params: &'a SessionParameters,
        interrupts: &'a dyn InterruptSource,
    ) -> Self {
        Self {
            transport,
            params,
            interrupts,
            logger: None,
            state: SessionState::Idle,
        }
    }

    /// Attach a logger that sees the request, each fragment, and the outcome.
    pub fn with_logger(mut self, logger: Option<&'a dyn ClientLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session for `prompt`.
    ///
    /// The prompt is echoed to the renderer, then each fragment is rendered as
    /// soon as it is decoded.  An interrupt stops the session before its next
    /// read and drops the response stream, closing the connection.
    pub async fn run(
        &mut self,
        prompt: String,
        renderer: &mut dyn Renderer,
    ) -> Result<SessionOutcome> {
        let result = self.run_inner(prompt, renderer).await;
        match &result {
            Ok(outcome) => {
                self.state = match outcome.end {
                    SessionEnd::Completed => {
                        SESSION_COMPLETED.click();
                        SessionState::Completed
                    }
                    SessionEnd::Canceled => {
                        SESSION_CANCELED.click();
                        SessionState::Canceled
                    }
                };
                if let Some(logger) = self.logger {
                    logger.log_session_end(outcome);
                }
            }
            Err(_) => {
                SESSION_FAILED.click();
                self.state = SessionState::Failed;
            }
        }
        result
    }

    async fn run_inner(
        &mut self,
        prompt: String,
        renderer: &mut dyn Renderer,
    ) -> Result<SessionOutcome> {
        let request = CompletionRequest::build(self.params, prompt.as_str())?;
        if let Some(logger) = self.logger {
            logger.log_request(self.params.model, &request);
        }
        renderer.print_prompt(&prompt);

        let cancel = CancellationController::arm(self.interrupts);
        let started = Instant::now();
        self.state = SessionState::RequestSent;
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                renderer.print_interrupted();
                return Ok(outcome(SessionEnd::Canceled, prompt, String::new()));
            }
            bytes = self.transport.open_stream(self.params.model, &request) => bytes?,
        };
        STREAM_TTFB.add(started.elapsed().as_secs_f64());
        self.state = SessionState::Streaming;

        let normalizer = self
            .params
            .normalize_newlines
            .then(|| StreamNormalizer::new(self.params.line_break));
        let mut fragments = Box::pin(decode_fragments(bytes, normalizer));
        let mut emitted = String::new();

        let end = loop {
            if cancel.triggered() {
                break SessionEnd::Canceled;
            }
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break SessionEnd::Canceled,
                next = fragments.next() => next,
            };
            match next {
                Some(Ok(text)) => {
                    renderer.print_text(&text);
                    if let Some(logger) = self.logger {
                        logger.log_fragment(&text);
                    }
                    emitted.push_str(&text);
                }
                Some(Err(err)) => {
                    STREAM_ERRORS.click();
                    return Err(err);
                }
                None => break SessionEnd::Completed,
            }
        };

        // Dropping the decoder drops the response body and aborts the connection.
        drop(fragments);
        drop(cancel);
        STREAM_DURATION.add(started.elapsed().as_secs_f64());

        if end == SessionEnd::Canceled {
            renderer.print_interrupted();
        }
        Ok(outcome(end, prompt, emitted))
    }
}

fn outcome(end: SessionEnd, prompt: String, emitted_text: String) -> SessionOutcome {
    let mut accumulated_prompt = prompt;
    accumulated_prompt.push_str(&emitted_text);
    SessionOutcome {
        end,
        emitted_text,
        accumulated_prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use bytes::Bytes;
    use futures::stream::{self, BoxStream, Stream};

    use crate::cancel::Interrupter;
    use crate::client::ByteStream;
    use crate::error::Error;
    use crate::newlines::LineBreak;
    use crate::types::Model;

    struct CloseGuard(Arc<AtomicBool>);

    impl Drop for CloseGuard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct Tracked {
        inner: BoxStream<'static, Result<Bytes>>,
        _guard: CloseGuard,
    }

    impl Stream for Tracked {
        type Item = Result<Bytes>;

        fn poll_next(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<Option<Self::Item>> {
            self.inner.poll_next_unpin(cx)
        }
    }

    enum Script {
        Lines(Vec<&'static str>),
        InterruptAfterFirst(Interrupter),
        Status(u16),
        InterruptWhileConnecting(Interrupter),
    }

    struct ScriptedTransport {
        script: Script,
        closed: Arc<AtomicBool>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Script) -> Self {
            Self {
                script,
                closed: Arc::new(AtomicBool::new(false)),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    const LINES: &[&str] = &[r#"{"text":"a"}"#, "garbage", r#"{"text":"b"}"#, "{}"];

    fn line_chunks(lines: &[&'static str]) -> Vec<Result<Bytes>> {
        lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{line}\n"))))
            .collect()
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn open_stream(
            &self,
            _model: Model,
            request: &CompletionRequest,
        ) -> Result<ByteStream> {
            self.requests.lock().unwrap().push(request.clone());
            let inner: BoxStream<'static, Result<Bytes>> = match &self.script {
                Script::Lines(lines) => stream::iter(line_chunks(lines)).boxed(),
                Script::InterruptAfterFirst(interrupter) => {
                    let interrupter = interrupter.clone();
                    stream::iter(line_chunks(&LINES[..1]))
                        .chain(stream::once(async move {
                            interrupter.interrupt();
                            futures::future::pending::<Result<Bytes>>().await
                        }))
                        .chain(stream::iter(line_chunks(&LINES[1..])))
                        .boxed()
                }
                Script::Status(code) => return Err(Error::api(*code, "nope")),
                Script::InterruptWhileConnecting(interrupter) => {
                    interrupter.interrupt();
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            };
            Ok(Box::pin(Tracked {
                inner,
                _guard: CloseGuard(Arc::clone(&self.closed)),
            }))
        }
    }

    #[derive(Default)]
    struct Capture {
        prompts: Vec<String>,
        text: Vec<String>,
        interrupted: bool,
    }

    impl Renderer for Capture {
        fn print_prompt(&mut self, prompt: &str) {
            self.prompts.push(prompt.to_string());
        }

        fn print_text(&mut self, text: &str) {
            self.text.push(text.to_string());
        }

        fn print_error(&mut self, _: &str) {}

        fn finish_response(&mut self, _: LineBreak) {}

        fn print_interrupted(&mut self) {
            self.interrupted = true;
        }
    }

    #[tokio::test]
    async fn completes_and_accumulates() {
        let transport = ScriptedTransport::new(Script::Lines(LINES.to_vec()));
        let params = SessionParameters::default();
        let interrupts = Interrupter::new();
        let mut renderer = Capture::default();

        let mut session = StreamingSession::new(&transport, &params, &interrupts);
        assert_eq!(session.state(), SessionState::Idle);
        let outcome = session.run("Say: ".to_string(), &mut renderer).await.unwrap();

        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(outcome.end, SessionEnd::Completed);
        assert_eq!(outcome.emitted_text, "ab");
        assert_eq!(outcome.accumulated_prompt, "Say: ab");
        assert_eq!(renderer.prompts, vec!["Say: ".to_string()]);
        assert_eq!(renderer.text, vec!["a".to_string(), "b".to_string()]);
        assert!(!renderer.interrupted);
        assert!(transport.closed());
        assert_eq!(transport.requests.lock().unwrap()[0].prompt, "Say: ");
    }

    #[tokio::test]
    async fn interrupt_keeps_partial_result_and_closes_stream() {
        let interrupts = Interrupter::new();
        let transport =
            ScriptedTransport::new(Script::InterruptAfterFirst(interrupts.clone()));
        let params = SessionParameters::default();
        let mut renderer = Capture::default();

        let mut session = StreamingSession::new(&transport, &params, &interrupts);
        let outcome = session.run(String::new(), &mut renderer).await.unwrap();

        assert_eq!(session.state(), SessionState::Canceled);
        assert!(outcome.is_canceled());
        assert_eq!(outcome.emitted_text, "a");
        assert_eq!(outcome.accumulated_prompt, "a");
        assert_eq!(renderer.text, vec!["a".to_string()]);
        assert!(renderer.interrupted);
        assert!(transport.closed());
    }

    #[tokio::test]
    async fn interrupt_while_connecting() {
        let interrupts = Interrupter::new();
        let transport =
            ScriptedTransport::new(Script::InterruptWhileConnecting(interrupts.clone()));
        let params = SessionParameters::default();
        let mut renderer = Capture::default();

        let mut session = StreamingSession::new(&transport, &params, &interrupts);
        let outcome = session.run("p".to_string(), &mut renderer).await.unwrap();

        assert!(outcome.is_canceled());
        assert_eq!(outcome.emitted_text, "");
        assert_eq!(outcome.accumulated_prompt, "p");
        assert!(renderer.interrupted);
    }

    #[tokio::test]
    async fn earlier_interrupt_does_not_cancel_session() {
        let interrupts = Interrupter::new();
        interrupts.interrupt();
        let transport = ScriptedTransport::new(Script::Lines(LINES.to_vec()));
        let params = SessionParameters::default();
        let mut renderer = Capture::default();

        let mut session = StreamingSession::new(&transport, &params, &interrupts);
        let outcome = session.run("p".to_string(), &mut renderer).await.unwrap();

        assert_eq!(outcome.end, SessionEnd::Completed);
        assert_eq!(outcome.emitted_text, "ab");
        assert!(!renderer.interrupted);
    }

    #[tokio::test]
    async fn non_200_status_fails() {
        let transport = ScriptedTransport::new(Script::Status(401));
        let params = SessionParameters::default();
        let interrupts = Interrupter::new();
        let mut renderer = Capture::default();

        let mut session = StreamingSession::new(&transport, &params, &interrupts);
        let err = session.run("p".to_string(), &mut renderer).await.unwrap_err();

        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.state().is_terminal());
        assert_eq!(err.status_code(), Some(401));
    }

    #[tokio::test]
    async fn normalizes_fragments_into_accumulator() {
        let transport = ScriptedTransport::new(Script::Lines(vec![r#"{"text":"x\r\ny"}"#]));
        let params = SessionParameters::default().with_line_break(LineBreak::Crlf);
        let interrupts = Interrupter::new();
        let mut renderer = Capture::default();

        let mut session = StreamingSession::new(&transport, &params, &interrupts);
        let outcome = session.run("p\r\n".to_string(), &mut renderer).await.unwrap();
        assert_eq!(outcome.emitted_text, "x\r\ny");
        assert_eq!(outcome.accumulated_prompt, "p\r\nx\r\ny");

        let raw = SessionParameters::default()
            .with_line_break(LineBreak::Lf)
            .with_normalize_newlines(false);
        let mut session = StreamingSession::new(&transport, &raw, &interrupts);
        let outcome = session.run(String::new(), &mut renderer).await.unwrap();
        assert_eq!(outcome.emitted_text, "x\r\ny");

        let unix = SessionParameters::default().with_line_break(LineBreak::Lf);
        let mut session = StreamingSession::new(&transport, &unix, &interrupts);
        let outcome = session.run(String::new(), &mut renderer).await.unwrap();
        assert_eq!(outcome.emitted_text, "x\ny");
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_transport() {
        let transport = ScriptedTransport::new(Script::Lines(LINES.to_vec()));
        let params = SessionParameters::default()
            .with_variant(crate::types::ServiceVariant::StreamingOnly)
            .with_stop(Some("END".to_string()));
        let interrupts = Interrupter::new();
        let mut renderer = Capture::default();

        let mut session = StreamingSession::new(&transport, &params, &interrupts);
        let err = session.run("p".to_string(), &mut renderer).await.unwrap_err();
        assert!(err.is_validation());
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
