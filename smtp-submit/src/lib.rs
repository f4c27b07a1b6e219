//! An async SMTP submission client.
//!
//! ```no_run
//! use smtp_submit::{Body, Configuration, Contact, EmailBuilder, Encryption, Mailer, Server};
//!
//! # async fn go() -> Result<(), Box<dyn std::error::Error>> {
//! let configuration = Configuration::new(Server::new("mail.example.com", Encryption::Plain));
//! let mailer = Mailer::new(configuration);
//!
//! let email = EmailBuilder::new(
//!     Contact::new("sender@example.com")?,
//!     "Hello",
//!     Body::Plain("Hi there.".to_string()),
//! )
//! .to(Contact::new("receiver@example.com")?)
//! .build()?;
//!
//! mailer.send(email).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod email;
mod fsm;
mod framer;
mod logger;
mod mailer;
mod mime;
mod request;
mod response;
mod starttls;
mod tls;

pub use config::{Configuration, Credentials, Encryption, FeatureFlags, Server, StartTlsMode};
pub use email::{Attachment, AttachmentKind, Body, Contact, Email, EmailBuilder};
pub use framer::Framer;
pub use logger::{NoopLogger, TracingTransmissionLogger, TransmissionLogger};
pub use mailer::{Mailer, Submission};
pub use request::Request;
pub use response::{Decoded, decode};
pub use smtp_submit_common::{ConfigError, SmtpError};
