//! Output rendering for streaming sessions.
//!
//! Sessions write through the [`Renderer`] trait so the binary can draw to a
//! terminal while tests and embedders capture output in memory.

use std::io::{self, Stdout, Write};

use crate::newlines::LineBreak;

/// ANSI escape code for dim text (used for the echoed prompt).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for yellow text (used for the interrupt notice).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Clear the whole screen and move the cursor to the top-left corner.
const ANSI_CLEAR_SCREEN: &str = "\x1b[2J\x1b[1;1H";

/// Trait for rendering session output.
///
/// Text arrives in wire order and must be displayed without buffering across
/// calls.
pub trait Renderer: Send {
    /// Clear the display before a new session.
    fn clear_screen(&mut self) {}

    /// Echo the prompt the continuation extends.
    fn print_prompt(&mut self, prompt: &str);

    /// Print a chunk of generated text.
    ///
    /// This is called incrementally as fragments are decoded.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Called when a session ends, completed or canceled.
    fn finish_response(&mut self, line_break: LineBreak);

    /// Called when the user interrupts the stream.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
///
/// Generated text goes to stdout unstyled so it can be piped; notices go to
/// stderr.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn clear_screen(&mut self) {
        let _ = write!(self.stdout, "{ANSI_CLEAR_SCREEN}");
        self.flush();
    }

    fn print_prompt(&mut self, prompt: &str) {
        if self.use_color {
            let _ = write!(self.stdout, "{ANSI_DIM}{prompt}{ANSI_RESET}");
        } else {
            let _ = write!(self.stdout, "{prompt}");
        }
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        let _ = write!(self.stdout, "{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("\n{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("\nError: {error}");
        }
    }

    fn finish_response(&mut self, line_break: LineBreak) {
        let _ = write!(self.stdout, "{}", line_break.as_str());
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.flush();
        if self.use_color {
            eprint!("{ANSI_YELLOW}[interrupted]{ANSI_RESET}");
        } else {
            eprint!("[interrupted]");
        }
    }
}
