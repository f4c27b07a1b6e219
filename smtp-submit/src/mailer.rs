use std::collections::VecDeque;
use std::future::{Future, IntoFuture};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset};
use smtp_submit_common::{ConfigError, SmtpError};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::sync::{Semaphore, oneshot};

use crate::config::Configuration;
use crate::connection;
use crate::email::Email;
use crate::logger::{self, SharedLogger};

const DEFAULT_MAX_CONNECTIONS: usize = 2;

struct ScheduledEmail {
    email: Email,
    completion: oneshot::Sender<Result<(), SmtpError>>,
}

struct MailerInner {
    configuration: Configuration,
    queue: Mutex<VecDeque<ScheduledEmail>>,
    semaphore: Arc<Semaphore>,
    logger: SharedLogger,
}

/// FIFO-dispatching, bounded-concurrency SMTP submission queue. Every
/// accepted [`Email`] gets its own fresh TCP connection; at most
/// `max_connections` connections are open at once.
#[derive(Clone)]
pub struct Mailer {
    inner: Arc<MailerInner>,
}

impl Mailer {
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        Self::with_capacity(configuration, DEFAULT_MAX_CONNECTIONS)
            .expect("DEFAULT_MAX_CONNECTIONS is non-zero")
    }

    /// # Errors
    /// Returns [`ConfigError::ZeroMaxConnections`] if `max_connections` is 0.
    pub fn with_capacity(configuration: Configuration, max_connections: usize) -> Result<Self, ConfigError> {
        Self::with_logger(configuration, max_connections, logger::noop())
    }

    /// # Errors
    /// Returns [`ConfigError::ZeroMaxConnections`] if `max_connections` is 0.
    pub fn with_logger(
        configuration: Configuration,
        max_connections: usize,
        logger: SharedLogger,
    ) -> Result<Self, ConfigError> {
        if max_connections == 0 {
            return Err(ConfigError::ZeroMaxConnections);
        }
        Ok(Self {
            inner: Arc::new(MailerInner {
                configuration,
                queue: Mutex::new(VecDeque::new()),
                semaphore: Arc::new(Semaphore::new(max_connections)),
                logger,
            }),
        })
    }

    /// Enqueue `email` for delivery. Returns immediately with a
    /// [`Submission`] handle; dispatch begins as soon as a connection
    /// slot is free, in the order `send` was called.
    pub fn send(&self, email: Email) -> Submission {
        let (tx, rx) = oneshot::channel();
        {
            let mut queue = self.inner.queue.lock().unwrap();
            queue.push_back(ScheduledEmail { email, completion: tx });
        }
        try_schedule(&self.inner);
        Submission { receiver: rx }
    }
}

fn try_schedule(inner: &Arc<MailerInner>) {
    loop {
        let popped = {
            let mut queue = inner.queue.lock().unwrap();
            if queue.is_empty() {
                return;
            }
            match Arc::clone(&inner.semaphore).try_acquire_owned() {
                Ok(permit) => Some((
                    queue.pop_front().expect("queue was checked non-empty above"),
                    permit,
                )),
                Err(_) => None,
            }
        };

        let Some((scheduled, permit)) = popped else {
            return;
        };

        let strong = Arc::clone(inner);
        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            let result = dispatch_one(&strong, &scheduled.email).await;
            let _ = scheduled.completion.send(result);
            drop(permit);
            drop(strong);
            if let Some(inner) = weak.upgrade() {
                try_schedule(&inner);
            }
        });
    }
}

async fn connect_with_reuse(
    hostname: &str,
    port: u16,
    timeout: std::time::Duration,
) -> Result<TcpStream, SmtpError> {
    let mut addrs = lookup_host((hostname, port)).await.map_err(SmtpError::from)?;
    let addr = addrs.next().ok_or_else(|| {
        SmtpError::Transport(io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"))
    })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(SmtpError::from)?;
    socket.set_reuseaddr(true).map_err(SmtpError::from)?;

    tokio::time::timeout(timeout, socket.connect(addr))
        .await
        .map_err(|_| SmtpError::Transport(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")))?
        .map_err(SmtpError::from)
}

async fn dispatch_one(inner: &Arc<MailerInner>, email: &Email) -> Result<(), SmtpError> {
    let server = &inner.configuration.server;
    smtp_submit_common::internal!(hostname = %server.hostname, port = server.port(), "connecting");

    let stream = match connect_with_reuse(
        &server.hostname,
        server.port(),
        inner.configuration.connection_timeout,
    )
    .await
    {
        Ok(stream) => stream,
        Err(error) => {
            tracing::warn!(hostname = %server.hostname, port = server.port(), %error, "connect failed");
            return Err(error);
        }
    };
    smtp_submit_common::internal!(hostname = %server.hostname, port = server.port(), "connected");

    let date: DateTime<FixedOffset> = chrono::Local::now().fixed_offset();
    let result = connection::run(stream, &inner.configuration, email, date, &inner.logger).await;
    smtp_submit_common::internal!(hostname = %server.hostname, port = server.port(), "closed");
    result
}

/// A handle to one submission's outcome. Implements [`IntoFuture`] so it
/// can be `.await`ed directly, or held and passed around as a value and
/// awaited later — both spellings poll the same underlying channel.
pub struct Submission {
    receiver: oneshot::Receiver<Result<(), SmtpError>>,
}

impl IntoFuture for Submission {
    type Output = Result<(), SmtpError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            self.receiver.await.unwrap_or_else(|_| {
                Err(SmtpError::Transport(io::Error::new(
                    io::ErrorKind::Other,
                    "mailer was dropped before the submission completed",
                )))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Encryption, Server};
    use crate::email::{Body, Contact, EmailBuilder};

    fn configuration(port: u16) -> Configuration {
        Configuration::new(Server::new("127.0.0.1", Encryption::Plain).with_port(port))
    }

    fn sample_email() -> Email {
        EmailBuilder::new(Contact::new("s@e.com").unwrap(), "hi", Body::Plain("hi".into()))
            .to(Contact::new("r@e.com").unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn send_fails_fast_when_nothing_is_listening() {
        let mailer = Mailer::with_capacity(configuration(1), 1).unwrap();
        let submission = mailer.send(sample_email());
        let result = submission.await;
        assert!(result.is_err());
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let result = Mailer::with_capacity(configuration(25), 0);
        assert!(matches!(result, Err(ConfigError::ZeroMaxConnections)));
    }
}
