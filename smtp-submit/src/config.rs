use serde::{Deserialize, Serialize};

/// STARTTLS negotiation strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartTlsMode {
    /// Fail the submission if the server does not accept `STARTTLS`.
    Always,
    /// Fall back to plaintext if the server rejects `STARTTLS`.
    IfAvailable,
}

/// How (and whether) the connection is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    Plain,
    Ssl,
    StartTls(StartTlsMode),
}

impl Encryption {
    /// The conventional port for this encryption mode: 25 for plaintext,
    /// 465 for implicit TLS, 587 for STARTTLS submission.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Plain => 25,
            Self::Ssl => 465,
            Self::StartTls(_) => 587,
        }
    }

    #[must_use]
    pub const fn is_implicit_tls(self) -> bool {
        matches!(self, Self::Ssl)
    }

    #[must_use]
    pub const fn start_tls_mode(self) -> Option<StartTlsMode> {
        match self {
            Self::StartTls(mode) => Some(mode),
            _ => None,
        }
    }
}

/// Address and transport security for the submission server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub hostname: String,
    port: Option<u16>,
    pub encryption: Encryption,
}

impl Server {
    #[must_use]
    pub fn new(hostname: impl Into<String>, encryption: Encryption) -> Self {
        Self {
            hostname: hostname.into(),
            port: None,
            encryption,
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The port to connect to: the explicit one if set, otherwise the
    /// default for this server's encryption.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.encryption.default_port())
    }
}

/// AUTH LOGIN credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Behavioural toggles affecting protocol and MIME serialization.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub use_esmtp: bool,
    #[serde(default)]
    pub base64_encode_all_messages: bool,
    #[serde(default)]
    pub max_base64_line_length_64: bool,
    #[serde(default)]
    pub max_base64_line_length_76: bool,
}

impl FeatureFlags {
    /// The base64 wrap width implied by the line-length flags, if any.
    /// When both are set, the stricter 64-character width wins.
    #[must_use]
    pub fn base64_line_length(&self) -> Option<usize> {
        if self.max_base64_line_length_64 {
            Some(64)
        } else if self.max_base64_line_length_76 {
            Some(76)
        } else {
            None
        }
    }
}

mod defaults {
    /// RFC 5321 submission servers are expected to respond well within a
    /// minute; this is the connect timeout, not a per-command one.
    pub const fn connection_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }
}

/// Immutable submission configuration captured at `Mailer` construction
/// time. Cheap to clone; a fresh snapshot is taken per connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub server: Server,
    #[serde(default = "defaults::connection_timeout")]
    pub connection_timeout: std::time::Duration,
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub feature_flags: FeatureFlags,
}

impl Configuration {
    #[must_use]
    pub fn new(server: Server) -> Self {
        Self {
            server,
            connection_timeout: defaults::connection_timeout(),
            credentials: None,
            feature_flags: FeatureFlags::default(),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub const fn with_connection_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_feature_flags(mut self, feature_flags: FeatureFlags) -> Self {
        self.feature_flags = feature_flags;
        self
    }
}
