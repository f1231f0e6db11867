use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("textsynth.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("textsynth.client.request_errors");

pub(crate) static STREAM_BYTES: Counter = Counter::new("textsynth.stream.bytes");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("textsynth.stream.fragments");
pub(crate) static STREAM_SKIPPED_LINES: Counter = Counter::new("textsynth.stream.skipped_lines");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("textsynth.stream.errors");
pub(crate) static STREAM_TTFB: Moments = Moments::new("textsynth.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("textsynth.stream.duration_seconds");

pub(crate) static SESSION_COMPLETED: Counter = Counter::new("textsynth.session.completed");
pub(crate) static SESSION_CANCELED: Counter = Counter::new("textsynth.session.canceled");
pub(crate) static SESSION_FAILED: Counter = Counter::new("textsynth.session.failed");
pub(crate) static INTERRUPTS: Counter = Counter::new("textsynth.cancel.interrupts");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_SKIPPED_LINES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_COMPLETED);
    collector.register_counter(&SESSION_CANCELED);
    collector.register_counter(&SESSION_FAILED);
    collector.register_counter(&INTERRUPTS);
}
