use chrono::{DateTime, FixedOffset};
use smtp_submit_common::{FiniteStateMachine, SmtpError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client::TlsStream, rustls::pki_types::ServerName};

use crate::config::Configuration;
use crate::email::Email;
use crate::fsm::{Context, State};
use crate::logger::SharedLogger;
use crate::response::{self, Decoded};
use crate::starttls::{StartTlsAction, StartTlsFilter};
use crate::tls;
use crate::{Framer, Request};

const READ_CHUNK: usize = 8192;

enum Transport {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SmtpError> {
        match self {
            Self::Plain(stream) => stream.write_all(bytes).await.map_err(SmtpError::from),
            Self::Tls(stream) => stream.write_all(bytes).await.map_err(SmtpError::from),
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SmtpError> {
        match self {
            Self::Plain(stream) => stream.read(buf).await.map_err(SmtpError::from),
            Self::Tls(stream) => stream.read(buf).await.map_err(SmtpError::from),
        }
    }

    async fn upgrade(self, hostname: &str) -> Result<Self, SmtpError> {
        let Self::Plain(stream) = self else {
            return Ok(self);
        };
        let connector = TlsConnector::from(tls::client_config());
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|error| SmtpError::Tls(error.to_string()))?;
        let stream = connector
            .connect(server_name, stream)
            .await
            .map_err(SmtpError::from)?;
        Ok(Self::Tls(Box::new(stream)))
    }
}

fn server_error(message: String) -> SmtpError {
    let code = message.get(..3).and_then(|s| s.parse().ok()).unwrap_or(0);
    SmtpError::ServerError { code, message }
}

/// Drive one full submission to completion over an already-connected
/// `stream`: greeting, EHLO/HELO, optional `STARTTLS`, optional
/// `AUTH LOGIN`, `MAIL FROM`/`RCPT TO`×N, `DATA`, payload, `QUIT`.
///
/// # Errors
/// Returns the first [`SmtpError`] raised by any pipeline stage. The
/// caller is responsible for closing `stream`-derived resources; this
/// function returns once the conversation reaches its terminal state or
/// fails.
pub async fn run(
    stream: TcpStream,
    configuration: &Configuration,
    email: &Email,
    date: DateTime<FixedOffset>,
    logger: &SharedLogger,
) -> Result<(), SmtpError> {
    let mut transport = Transport::Plain(stream);
    if configuration.server.encryption.is_implicit_tls() {
        smtp_submit_common::internal!(hostname = %configuration.server.hostname, "starting implicit TLS upgrade");
        transport = transport.upgrade(&configuration.server.hostname).await?;
        smtp_submit_common::internal!(hostname = %configuration.server.hostname, "implicit TLS upgrade complete");
    }

    let mut framer = Framer::new();
    let mut starttls = StartTlsFilter::new();
    let mut state = State::new();
    let mut context = Context {
        server_name: configuration.server.hostname.clone(),
        use_esmtp: configuration.feature_flags.use_esmtp,
        encryption: configuration.server.encryption,
        credentials: configuration
            .credentials
            .as_ref()
            .map(|c| (c.username.clone(), c.password.clone())),
        feature_flags: configuration.feature_flags,
        recipients: email.all_recipients().map(|c| c.email_address.clone()).collect(),
        email: email.clone(),
        date,
        next_request: None,
    };

    let mut read_buf = [0u8; READ_CHUNK];

    loop {
        let bytes_read = match transport.read(&mut read_buf).await {
            Ok(n) => n,
            Err(SmtpError::Transport(io_error))
                if io_error.kind() == std::io::ErrorKind::UnexpectedEof
                    && state.tolerates_shutdown_noise() =>
            {
                tracing::warn!(hostname = %configuration.server.hostname, "server closed the connection without a close_notify; tolerated at this state");
                return Ok(());
            }
            Err(error) => return Err(error),
        };
        if bytes_read == 0 {
            smtp_submit_common::internal!(hostname = %configuration.server.hostname, "connection closed by peer");
            return if framer.has_left_over_bytes() && !state.tolerates_shutdown_noise() {
                Err(SmtpError::LeftOverBytes)
            } else {
                Ok(())
            };
        }

        for line in framer.push(&read_buf[..bytes_read]) {
            let text = String::from_utf8_lossy(&line).into_owned();
            smtp_submit_common::incoming!(text.clone());
            logger.log(&format_args!("\u{2601}\u{fe0f} {text}"));

            let decoded = response::decode(&line)?;
            if matches!(decoded, Decoded::Suppressed) {
                continue;
            }

            let action = starttls.observe_inbound(&decoded);
            let effective = match action {
                StartTlsAction::PassThrough => decoded,
                StartTlsAction::InstallTls => {
                    smtp_submit_common::internal!(hostname = %configuration.server.hostname, "starting STARTTLS upgrade");
                    transport = transport.upgrade(&configuration.server.hostname).await?;
                    smtp_submit_common::internal!(hostname = %configuration.server.hostname, "STARTTLS upgrade complete");
                    decoded
                }
                StartTlsAction::ContinuePlaintext { synthesized } => synthesized,
                StartTlsAction::PropagateFailure => {
                    let Decoded::Failure { message } = decoded else {
                        unreachable!("PropagateFailure is only returned for a Failure response")
                    };
                    return Err(server_error(message));
                }
            };

            match effective {
                Decoded::Failure { message } => return Err(server_error(message)),
                Decoded::Suppressed => continue,
                Decoded::Success { .. } => {
                    state = state.transition((), &mut context);
                }
            }

            if let Some(request) = context.next_request.take() {
                if let Some(mode) = context.encryption.start_tls_mode() {
                    starttls.observe_outbound(&request, mode);
                }
                let bytes = request.encode(context.feature_flags);
                let rendered = String::from_utf8_lossy(&bytes).trim_end().to_string();
                smtp_submit_common::outgoing!(rendered.clone());
                logger.log(&format_args!("\u{1f4bb} {rendered}"));
                transport.write_all(&bytes).await?;
            }

            if state.is_done() {
                smtp_submit_common::internal!(hostname = %configuration.server.hostname, "conversation complete");
                return Ok(());
            }
        }
    }
}
