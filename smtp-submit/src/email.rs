use std::fmt;

use smtp_submit_common::ConfigError;

/// A single mailbox address, with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email_address: String,
    pub name: Option<String>,
}

impl Contact {
    /// # Errors
    /// Returns [`ConfigError::EmptyAddress`] when `email_address` is empty.
    pub fn new(email_address: impl Into<String>) -> Result<Self, ConfigError> {
        Self::named(email_address, None::<String>)
    }

    /// # Errors
    /// Returns [`ConfigError::EmptyAddress`] when `email_address` is empty.
    pub fn named(
        email_address: impl Into<String>,
        name: Option<impl Into<String>>,
    ) -> Result<Self, ConfigError> {
        let email_address = email_address.into();
        if email_address.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        Ok(Self {
            email_address,
            name: name.map(Into::into),
        })
    }

    /// The domain portion of the address, i.e. everything after the
    /// first `@`. Empty when the address has no `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.email_address
            .find('@')
            .map_or("", |index| &self.email_address[index + 1..])
    }
}

impl fmt::Display for Contact {
    /// Renders the MIME header form: `"escaped name" <addr>` when a name
    /// is present (internal double quotes backslash-escaped), otherwise
    /// the bare address.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => {
                write!(f, "\"{}\" <{}>", name.replace('"', "\\\""), self.email_address)
            }
            None => write!(f, "{}", self.email_address),
        }
    }
}

/// The message body: plain text, HTML, or both rendered as a
/// `multipart/alternative`.
#[derive(Debug, Clone)]
pub enum Body {
    Plain(String),
    Html(String),
    Universal { plain: String, html: String },
}

/// Whether an attachment is a regular file attachment or rendered
/// inline (requiring a content id referenced from the HTML body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind {
    Attachment { content_id: Option<String> },
    Inline { content_id: String },
}

#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub kind: AttachmentKind,
}

impl Attachment {
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
            kind: AttachmentKind::Attachment { content_id: None },
        }
    }

    #[must_use]
    pub fn inline(mut self, content_id: impl Into<String>) -> Self {
        self.kind = AttachmentKind::Inline {
            content_id: content_id.into(),
        };
        self
    }

    #[must_use]
    pub fn content_id(mut self, content_id: impl Into<String>) -> Self {
        self.kind = AttachmentKind::Attachment {
            content_id: Some(content_id.into()),
        };
        self
    }

    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self.kind, AttachmentKind::Inline { .. })
    }
}

/// One message to deliver. Built incrementally and validated by
/// [`Email::build`].
#[derive(Debug, Clone)]
pub struct Email {
    pub sender: Contact,
    pub reply_to: Option<Contact>,
    pub recipients: Vec<Contact>,
    pub cc: Vec<Contact>,
    pub bcc: Vec<Contact>,
    pub subject: String,
    pub body: Body,
    pub attachments: Vec<Attachment>,
}

impl Email {
    /// Every envelope recipient (RCPT TO targets): `to`, then `cc`, then
    /// `bcc`, in that order. `bcc` is never rendered into headers.
    #[must_use]
    pub fn all_recipients(&self) -> impl Iterator<Item = &Contact> {
        self.recipients
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
    }

    /// Attachments partitioned into (regular, inline), each preserving
    /// submission order within its partition.
    #[must_use]
    pub fn partition_attachments(&self) -> (Vec<&Attachment>, Vec<&Attachment>) {
        self.attachments.iter().partition(|a| !a.is_inline())
    }
}

/// Fluent constructor, mirroring the crate's `Configuration` builder
/// style. Validates the non-empty-recipients invariant at [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct EmailBuilder {
    sender: Contact,
    reply_to: Option<Contact>,
    recipients: Vec<Contact>,
    cc: Vec<Contact>,
    bcc: Vec<Contact>,
    subject: String,
    body: Body,
    attachments: Vec<Attachment>,
}

impl EmailBuilder {
    #[must_use]
    pub fn new(sender: Contact, subject: impl Into<String>, body: Body) -> Self {
        Self {
            sender,
            reply_to: None,
            recipients: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            body,
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn reply_to(mut self, contact: Contact) -> Self {
        self.reply_to = Some(contact);
        self
    }

    #[must_use]
    pub fn to(mut self, contact: Contact) -> Self {
        self.recipients.push(contact);
        self
    }

    #[must_use]
    pub fn cc(mut self, contact: Contact) -> Self {
        self.cc.push(contact);
        self
    }

    #[must_use]
    pub fn bcc(mut self, contact: Contact) -> Self {
        self.bcc.push(contact);
        self
    }

    #[must_use]
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// # Errors
    /// Returns [`ConfigError::NoRecipients`] if no `to` recipient was added.
    pub fn build(self) -> Result<Email, ConfigError> {
        if self.recipients.is_empty() {
            return Err(ConfigError::NoRecipients);
        }
        Ok(Email {
            sender: self.sender,
            reply_to: self.reply_to,
            recipients: self.recipients,
            cc: self.cc,
            bcc: self.bcc,
            subject: self.subject,
            body: self.body,
            attachments: self.attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_and_escapes_name() {
        let contact = Contact::named("a@b.com", Some(r#"Jane "JJ" Doe"#)).unwrap();
        assert_eq!(contact.to_string(), r#""Jane \"JJ\" Doe" <a@b.com>"#);
    }

    #[test]
    fn display_bare_address_without_name() {
        let contact = Contact::new("a@b.com").unwrap();
        assert_eq!(contact.to_string(), "a@b.com");
    }

    #[test]
    fn empty_address_rejected() {
        assert!(matches!(Contact::new(""), Err(ConfigError::EmptyAddress)));
    }

    #[test]
    fn domain_extraction() {
        let contact = Contact::new("someone@example.com").unwrap();
        assert_eq!(contact.domain(), "example.com");
        let bare = Contact::new("no-at-sign").unwrap();
        assert_eq!(bare.domain(), "");
    }

    #[test]
    fn all_recipients_is_to_then_cc_then_bcc() {
        let sender = Contact::new("s@e.com").unwrap();
        let email = EmailBuilder::new(sender, "hi", Body::Plain("hi".into()))
            .to(Contact::new("to@e.com").unwrap())
            .cc(Contact::new("cc@e.com").unwrap())
            .bcc(Contact::new("bcc@e.com").unwrap())
            .build()
            .unwrap();
        let all: Vec<_> = email.all_recipients().map(|c| c.email_address.as_str()).collect();
        assert_eq!(all, vec!["to@e.com", "cc@e.com", "bcc@e.com"]);
    }

    #[test]
    fn empty_recipients_rejected() {
        let sender = Contact::new("s@e.com").unwrap();
        let result = EmailBuilder::new(sender, "hi", Body::Plain("hi".into())).build();
        assert!(matches!(result, Err(ConfigError::NoRecipients)));
    }
}
