//! Line-terminator normalization.
//!
//! The service emits whatever line endings the model produced.  These helpers
//! fold `\r\n`, lone `\r`, and lone `\n` into a single canonical terminator.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Replace `\r\n` and lone `\r` with `\n`.
pub fn to_unix(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Normalize every line terminator to `\r\n`.
pub fn to_windows(text: &str) -> String {
    to_unix(text).replace('\n', "\r\n")
}

/// The canonical line terminator for normalized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineBreak {
    /// `\n`
    Lf,
    /// `\r\n`
    Crlf,
}

impl LineBreak {
    /// The terminator native to the platform this binary was built for.
    pub fn native() -> Self {
        if cfg!(windows) {
            LineBreak::Crlf
        } else {
            LineBreak::Lf
        }
    }

    /// The terminator as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::Crlf => "\r\n",
        }
    }

    /// Normalize `text` to this terminator.
    pub fn normalize(&self, text: &str) -> String {
        match self {
            LineBreak::Lf => to_unix(text),
            LineBreak::Crlf => to_windows(text),
        }
    }
}

impl Default for LineBreak {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Display for LineBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineBreak::Lf => write!(f, "lf"),
            LineBreak::Crlf => write!(f, "crlf"),
        }
    }
}

impl FromStr for LineBreak {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lf" | "unix" => Ok(LineBreak::Lf),
            "crlf" | "windows" => Ok(LineBreak::Crlf),
            _ => Err(Error::validation(
                format!("invalid line break {s:?}; expected lf or crlf"),
                Some("line-break".to_string()),
            )),
        }
    }
}

/// Normalizes a sequence of fragments as though they were one text.
///
/// A `\r` that ends one fragment and a `\n` that starts the next are a single
/// terminator; normalizing each fragment alone would emit two.
#[derive(Debug, Clone)]
pub struct StreamNormalizer {
    line_break: LineBreak,
    pending_cr: bool,
}

impl StreamNormalizer {
    /// Creates a normalizer targeting `line_break`.
    pub fn new(line_break: LineBreak) -> Self {
        Self {
            line_break,
            pending_cr: false,
        }
    }

    /// The terminator this normalizer produces.
    pub fn line_break(&self) -> LineBreak {
        self.line_break
    }

    /// Normalize the next fragment.
    pub fn push(&mut self, fragment: &str) -> String {
        if fragment.is_empty() {
            return String::new();
        }
        let text = match fragment.strip_prefix('\n') {
            Some(rest) if self.pending_cr => rest,
            _ => fragment,
        };
        self.pending_cr = fragment.ends_with('\r');
        self.line_break.normalize(text)
    }
}
