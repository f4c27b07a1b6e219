use base64::Engine as _;
use chrono::{DateTime, FixedOffset};

use crate::config::FeatureFlags;
use crate::email::Email;
use crate::mime;

/// One command the conversation state machine wants sent to the server.
#[derive(Debug, Clone)]
pub enum Request {
    SayHello { server_name: String, use_ehlo: bool },
    StartTls,
    BeginAuth,
    AuthUser(String),
    AuthPassword(String),
    MailFrom(String),
    Recipient(String),
    Data,
    TransferData {
        date: DateTime<FixedOffset>,
        email: Email,
        flags: FeatureFlags,
    },
    Quit,
}

fn base64_line(value: &str, flags: FeatureFlags) -> String {
    mime::encode_base64(value.as_bytes(), flags.base64_line_length().unwrap_or(0))
}

impl Request {
    /// Render this command to the bytes written to the wire, including
    /// trailing `\r\n`.
    #[must_use]
    pub fn encode(&self, flags: FeatureFlags) -> Vec<u8> {
        match self {
            Self::SayHello { server_name, use_ehlo } => {
                let verb = if *use_ehlo { "EHLO" } else { "HELO" };
                format!("{verb} {server_name}\r\n").into_bytes()
            }
            Self::StartTls => b"STARTTLS\r\n".to_vec(),
            Self::BeginAuth => b"AUTH LOGIN\r\n".to_vec(),
            Self::AuthUser(user) => format!("{}\r\n", base64_line(user, flags)).into_bytes(),
            Self::AuthPassword(password) => {
                format!("{}\r\n", base64_line(password, flags)).into_bytes()
            }
            Self::MailFrom(addr) => format!("MAIL FROM:<{addr}>\r\n").into_bytes(),
            Self::Recipient(addr) => format!("RCPT TO:<{addr}>\r\n").into_bytes(),
            Self::Data => b"DATA\r\n".to_vec(),
            Self::TransferData { date, email, flags } => {
                let mut payload = mime::serialize(email, *flags, *date);
                payload.extend_from_slice(b"\r\n.\r\n");
                payload
            }
            Self::Quit => b"QUIT\r\n".to_vec(),
        }
    }
}
