use serde::{Deserialize, Serialize};

/// One record of the newline-delimited response stream.
///
/// Only `text` is read; every other key the service sends is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFragment {
    /// Generated text, absent or null on bookkeeping records.
    #[serde(default)]
    pub text: Option<String>,
}

impl StreamFragment {
    /// Parse one line of the stream, returning `None` if it is not a record.
    pub fn parse(line: &[u8]) -> Option<Self> {
        serde_json::from_slice(line).ok()
    }

    /// Consume the fragment, yielding its text if any.
    pub fn into_text(self) -> Option<String> {
        self.text
    }
}
