//! The prompt shown between sessions.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::{Error, Result};

/// What to do after a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Extend the accumulated prompt.
    Continue,
    /// Run the same prompt again.
    Retry,
    /// Stop the loop.
    Exit,
}

/// Parses a menu answer.
///
/// An empty answer continues; anything unrecognized exits.
///
/// # Examples
///
/// ```
/// # use textsynth::chat::{Choice, parse_choice};
/// assert_eq!(parse_choice(""), Choice::Continue);
/// assert_eq!(parse_choice("R"), Choice::Retry);
/// assert_eq!(parse_choice("maybe"), Choice::Exit);
/// ```
pub fn parse_choice(input: &str) -> Choice {
    match input.trim().to_lowercase().as_str() {
        "" | "c" | "continue" => Choice::Continue,
        "r" | "retry" => Choice::Retry,
        _ => Choice::Exit,
    }
}

/// Asks the user what to do after each session.
pub trait Menu {
    /// Block until the user picks a [`Choice`].
    ///
    /// An `Err` means the menu cannot be shown at all, e.g. no terminal.
    fn what_now(&mut self) -> Result<Choice>;
}

/// A [`Menu`] read from the terminal with rustyline.
#[derive(Default)]
pub struct RustylineMenu {
    editor: Option<DefaultEditor>,
}

impl RustylineMenu {
    /// The editor is created on first use, so constructing one never fails.
    pub fn new() -> Self {
        Self::default()
    }
}

const MENU_PROMPT: &str = "[C]ontinue, [R]etry, or [E]xit? ";

impl Menu for RustylineMenu {
    fn what_now(&mut self) -> Result<Choice> {
        let editor = match self.editor.take() {
            Some(editor) => editor,
            None => DefaultEditor::new()
                .map_err(|e| Error::terminal(format!("could not open terminal: {e}")))?,
        };
        let editor = self.editor.insert(editor);
        match editor.readline(MENU_PROMPT) {
            Ok(line) => Ok(parse_choice(&line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(Choice::Exit),
            Err(e) => Err(Error::terminal(format!("could not read menu choice: {e}"))),
        }
    }
}
