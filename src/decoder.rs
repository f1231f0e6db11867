//! Decoding of the newline-delimited JSON response stream.
//!
//! The service answers with one JSON object per line.  Each object may carry a
//! `text` key holding the next piece of the continuation.  Lines that do not
//! parse (keep-alives, blank separators, partial writes) are skipped.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::error::Result;
use crate::newlines::StreamNormalizer;
use crate::observability::{STREAM_BYTES, STREAM_FRAGMENTS, STREAM_SKIPPED_LINES};
use crate::types::StreamFragment;

/// Turn a response byte stream into a stream of text fragments.
///
/// Fragments are normalized with `normalizer` when one is given.  The stream
/// ends when the byte stream does; a final line without a terminator is still
/// decoded.  An error from the byte stream is yielded once and ends the
/// stream.
pub fn decode_fragments<S>(
    byte_stream: S,
    normalizer: Option<StreamNormalizer>,
) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let state = DecodeState {
        bytes: byte_stream,
        buffer: BytesMut::new(),
        normalizer,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            // Drain complete lines before reading more.
            if let Some(line) = state.next_line() {
                match parse_line(&line) {
                    Some(text) => {
                        STREAM_FRAGMENTS.click();
                        let text = state.normalize(&text);
                        return Some((Ok(text), state));
                    }
                    None => continue,
                }
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    STREAM_BYTES.count(chunk.len() as u64);
                    state.buffer.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.buffer.clear();
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                }
            }
        }
    })
}

struct DecodeState<S> {
    bytes: S,
    buffer: BytesMut,
    normalizer: Option<StreamNormalizer>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn next_line(&mut self) -> Option<BytesMut> {
        if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            return Some(line);
        }
        if self.finished && !self.buffer.is_empty() {
            return Some(self.buffer.split());
        }
        None
    }

    fn normalize(&mut self, text: &str) -> String {
        match self.normalizer.as_mut() {
            Some(normalizer) => normalizer.push(text),
            None => text.to_string(),
        }
    }
}

/// Extract the text of one line, or `None` if there is nothing to emit.
fn parse_line(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match StreamFragment::parse(line) {
        Some(fragment) => fragment.into_text(),
        None => {
            STREAM_SKIPPED_LINES.click();
            None
        }
    }
}
