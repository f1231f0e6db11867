//! Repeated sessions over a growing prompt.
//!
//! This module provides the [`SessionLoop`], which runs one
//! [`StreamingSession`] per iteration and asks a [`Menu`] whether to extend
//! the prompt with what was generated, retry it, or stop.

use std::sync::Arc;

use crate::cancel::InterruptSource;
use crate::chat::menu::{Choice, Menu};
use crate::client::Transport;
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::render::Renderer;
use crate::session::StreamingSession;
use crate::types::SessionParameters;

use super::config::DEFAULT_PROMPT_MAX_BYTES;

/// Fails if `prompt` is longer than `limit` bytes.
pub fn check_prompt_size(prompt: &str, limit: usize) -> Result<()> {
    if prompt.len() > limit {
        return Err(Error::prompt_too_large(prompt.len(), limit));
    }
    Ok(())
}

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Sessions that produced an outcome.
    pub sessions: u64,
    /// Of those, how many the user interrupted.
    pub canceled: u64,
    /// Bytes of generated text across all sessions.
    pub emitted_bytes: u64,
}

/// Drives streaming sessions until the user exits.
///
/// The transport is shared by every session; each session gets its own
/// response stream and cancellation controller.
pub struct SessionLoop {
    transport: Arc<dyn Transport>,
    params: SessionParameters,
    interrupts: Arc<dyn InterruptSource>,
    prompt_max_bytes: usize,
    interactive: bool,
    logger: Option<Arc<dyn ClientLogger>>,
    stats: LoopStats,
}

impl SessionLoop {
    /// Creates an interactive loop with the default prompt size limit.
    pub fn new(
        transport: Arc<dyn Transport>,
        params: SessionParameters,
        interrupts: Arc<dyn InterruptSource>,
    ) -> Self {
        Self {
            transport,
            params,
            interrupts,
            prompt_max_bytes: DEFAULT_PROMPT_MAX_BYTES,
            interactive: true,
            logger: None,
            stats: LoopStats::default(),
        }
    }

    /// Sets the largest prompt, in bytes, that will be sent.
    pub fn with_prompt_limit(mut self, prompt_max_bytes: usize) -> Self {
        self.prompt_max_bytes = prompt_max_bytes;
        self
    }

    /// Whether to clear the screen and consult the menu between sessions.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Attach a logger to every session.
    pub fn with_logger(mut self, logger: Option<Arc<dyn ClientLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Returns the parameters every session runs with.
    pub fn params(&self) -> &SessionParameters {
        &self.params
    }

    /// Returns counters accumulated so far.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run sessions starting from `prompt`.
    ///
    /// Returns the accumulated prompt of the last session.  A non-interactive
    /// loop runs exactly one session.  A menu failure is reported through the
    /// renderer and ends the loop normally.
    ///
    /// # Errors
    ///
    /// Fails before sending if the prompt exceeds the size limit, and on any
    /// transport or protocol failure.
    pub async fn run(
        &mut self,
        prompt: String,
        renderer: &mut dyn Renderer,
        menu: &mut dyn Menu,
    ) -> Result<String> {
        let mut prompt = prompt;
        loop {
            check_prompt_size(&prompt, self.prompt_max_bytes)?;
            if self.interactive {
                renderer.clear_screen();
            }

            let mut session = StreamingSession::new(
                self.transport.as_ref(),
                &self.params,
                self.interrupts.as_ref(),
            )
            .with_logger(self.logger.as_deref());
            let outcome = session.run(prompt.clone(), renderer).await?;
            renderer.finish_response(self.params.line_break);

            self.stats.sessions += 1;
            self.stats.emitted_bytes += outcome.emitted_text.len() as u64;
            if outcome.is_canceled() {
                self.stats.canceled += 1;
            }

            if !self.interactive {
                return Ok(outcome.accumulated_prompt);
            }
            match menu.what_now() {
                Ok(Choice::Continue) => prompt = outcome.accumulated_prompt,
                Ok(Choice::Retry) => {}
                Ok(Choice::Exit) => return Ok(outcome.accumulated_prompt),
                Err(err) => {
                    renderer.print_error(&err.to_string());
                    return Ok(outcome.accumulated_prompt);
                }
            }
        }
    }
}
