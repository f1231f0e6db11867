//! Stream a TextSynth completion to the terminal.
//!
//! The prompt is printed, then the continuation as it is generated.  Press
//! Ctrl+C to stop a completion early and keep what was generated so far.  When
//! stdin and stdout are both terminals, a menu after each completion offers to
//! continue from the generated text, retry the same prompt, or exit.
//!
//! # Usage
//!
//! ```bash
//! # Complete a prompt with the default model
//! textsynth --prompt "Once upon a time"
//!
//! # Read the prompt from a file and pick a model
//! textsynth --promptfile story.txt --model fairseq_gpt_13B
//!
//! # Sampling parameters
//! textsynth --prompt "Hello" --temperature 0.8 --top-k 50 --top-p 0.95 --seed 7
//!
//! # Use the keyless streaming-only service
//! textsynth --service streaming-only --model gpt2_1558M --prompt "Hello"
//! ```

use std::io::{self, IsTerminal};
use std::sync::Arc;

use arrrg::CommandLine;

use textsynth::chat::{RustylineMenu, SessionLoop, SynthArgs, SynthConfig};
use textsynth::{ClientLogger, CtrlC, Error, JsonLinesLogger, PlainTextRenderer, TextSynth};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let (args, free) = SynthArgs::from_command_line_relaxed("textsynth [OPTIONS]");
    if !free.is_empty() {
        return Err(Error::validation(
            format!("unexpected arguments: {}", free.join(" ")),
            None,
        ));
    }
    let config = SynthConfig::from_args(args)?;
    let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();

    let client = TextSynth::with_options(
        config.api_key.clone(),
        config.params.variant,
        config.base_url.as_deref(),
        None,
    )?;
    let interrupts = CtrlC::install()?;
    let logger: Option<Arc<dyn ClientLogger>> = match &config.log_file {
        Some(path) => Some(Arc::new(JsonLinesLogger::create(path)?)),
        None => None,
    };

    let mut renderer = PlainTextRenderer::with_color(config.use_color && interactive);
    let mut menu = RustylineMenu::new();
    let mut sessions = SessionLoop::new(Arc::new(client), config.params, Arc::new(interrupts))
        .with_prompt_limit(config.prompt_max_bytes)
        .interactive(interactive)
        .with_logger(logger);
    sessions.run(config.prompt, &mut renderer, &mut menu).await?;
    Ok(())
}
