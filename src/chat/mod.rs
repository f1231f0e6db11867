//! The interactive completion loop.
//!
//! This module ties the library together for the command-line client:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`menu`]: the Continue / Retry / Exit prompt between sessions
//! - [`session_loop`]: repeated sessions over an accumulating prompt

mod config;
mod menu;
mod session_loop;

pub use config::{DEFAULT_PROMPT_MAX_BYTES, SynthArgs, SynthConfig};
pub use menu::{Choice, Menu, RustylineMenu, parse_choice};
pub use session_loop::{LoopStats, SessionLoop, check_prompt_size};
