//! Logging hooks for streaming sessions.
//!
//! This module provides the [`ClientLogger`] trait that allows callers to
//! capture every request, fragment, and outcome passing through a
//! [`StreamingSession`](crate::session::StreamingSession), plus
//! [`JsonLinesLogger`], which appends them to a file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde::{Serialize, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};
use crate::session::SessionOutcome;
use crate::types::{CompletionRequest, Model};

/// A trait for logging session activity.
///
/// Implementations must not fail the session; errors are swallowed.
pub trait ClientLogger: Send + Sync {
    /// Log the request body about to be sent for `model`.
    fn log_request(&self, model: Model, request: &CompletionRequest);

    /// Log one decoded fragment, after normalization.
    fn log_fragment(&self, text: &str);

    /// Log the outcome of a completed or canceled session.
    fn log_session_end(&self, outcome: &SessionOutcome);
}

/// Appends one JSON object per event to a file.
pub struct JsonLinesLogger {
    file: Mutex<BufWriter<File>>,
}

#[derive(Serialize)]
struct LogRecord<'a> {
    #[serde(serialize_with = "rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(flatten)]
    event: LogEvent<'a>,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum LogEvent<'a> {
    Request {
        model: &'static str,
        request: &'a CompletionRequest,
    },
    Fragment {
        text: &'a str,
    },
    SessionEnd {
        outcome: &'a SessionOutcome,
    },
}

fn rfc3339<S>(at: &OffsetDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = at.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

impl JsonLinesLogger {
    /// Open `path` for appending, creating it if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open log file", err))?;
        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write(&self, event: LogEvent<'_>) {
        let record = LogRecord {
            timestamp: OffsetDateTime::now_utc(),
            event,
        };
        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

impl ClientLogger for JsonLinesLogger {
    fn log_request(&self, model: Model, request: &CompletionRequest) {
        self.write(LogEvent::Request {
            model: model.name(),
            request,
        });
    }

    fn log_fragment(&self, text: &str) {
        self.write(LogEvent::Fragment { text });
    }

    fn log_session_end(&self, outcome: &SessionOutcome) {
        self.write(LogEvent::SessionEnd { outcome });
    }
}
