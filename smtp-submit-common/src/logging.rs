//! Thin wrappers around `tracing` so every crate in the workspace emits
//! spans/events the same way, and a shared subscriber initializer.

/// Emit a span-scoped trace event. Mirrors the shape used across the
/// connection pipeline: a short verb, then `?field = value` pairs.
#[macro_export]
macro_rules! log {
    ($level:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::event!($level, $($key = $value),+);
    };
}

/// Log one inbound wire frame.
#[macro_export]
macro_rules! incoming {
    ($message:expr) => {
        tracing::trace!(direction = "in", message = %$message, "\u{2601}\u{fe0f} {}", $message)
    };
}

/// Log one outbound wire frame.
#[macro_export]
macro_rules! outgoing {
    ($message:expr) => {
        tracing::trace!(direction = "out", message = %$message, "\u{1f4bb} {}", $message)
    };
}

/// Log an internal lifecycle event (connect, TLS upgrade, close, ...).
#[macro_export]
macro_rules! internal {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

/// Initializes a process-wide `tracing` subscriber reading its level
/// from the `SMTP_SUBMIT_LOG` environment variable, defaulting to
/// `warn`. Safe to call more than once; subsequent calls are no-ops.
pub fn init() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_env("SMTP_SUBMIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true))
        .try_init();
}
