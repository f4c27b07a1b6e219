use std::io;

/// Every way a single submission attempt can fail.
///
/// Every variant surfaces through the completion handle for the
/// submission that produced it; the connection is closed and the
/// dispatcher's semaphore permit is released regardless of which
/// variant is hit.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
    #[error("malformed SMTP response: {0:?}")]
    MalformedSmtpMessage(String),

    #[error("server rejected the command ({code}): {message}")]
    ServerError { code: u16, message: String },

    #[error("transport error")]
    Transport(#[from] io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("connection closed with unread bytes remaining")]
    LeftOverBytes,

    #[error("TLS connection closed without a close_notify")]
    UncleanShutdown,

    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

impl SmtpError {
    /// Whether this failure is tolerable when the conversation had
    /// already reached `quitSent`/`idle(true)` — servers commonly drop
    /// the connection right after replying to `QUIT`.
    #[must_use]
    pub fn is_shutdown_noise(&self) -> bool {
        matches!(self, Self::LeftOverBytes | Self::UncleanShutdown)
    }

    #[must_use]
    pub fn is_server_rejection(&self) -> bool {
        matches!(self, Self::ServerError { .. })
    }
}

/// Raised by fallible builder methods when a construction-time invariant
/// is violated, rather than panicking.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("an email must have at least one recipient")]
    NoRecipients,

    #[error("a contact must have a non-empty email address")]
    EmptyAddress,

    #[error("max_connections must be greater than zero")]
    ZeroMaxConnections,
}
