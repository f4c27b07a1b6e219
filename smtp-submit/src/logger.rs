use std::fmt;
use std::sync::Arc;

/// External capability for observing the raw wire transcript of a
/// submission, independent of whatever global `tracing` configuration
/// the embedding application has. Messages are passed as `Display`
/// values rather than pre-rendered strings so a no-op logger pays
/// nothing for formatting.
pub trait TransmissionLogger: Send + Sync {
    fn log(&self, message: &dyn fmt::Display);
}

/// Does nothing. The default when no logger is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl TransmissionLogger for NoopLogger {
    fn log(&self, _message: &dyn fmt::Display) {}
}

/// Forwards every line into `tracing::trace!`. The connection pipeline
/// already embeds the `\u{2601}\u{fe0f}`/`\u{1f4bb}` direction prefix in
/// `message` before it gets here, so this adapter doesn't add its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTransmissionLogger;

impl TransmissionLogger for TracingTransmissionLogger {
    fn log(&self, message: &dyn fmt::Display) {
        tracing::trace!("{message}");
    }
}

pub(crate) type SharedLogger = Arc<dyn TransmissionLogger>;

#[must_use]
pub fn noop() -> SharedLogger {
    Arc::new(NoopLogger)
}
