use base64::Engine as _;
use chrono::{DateTime, FixedOffset};

use crate::config::FeatureFlags;
use crate::email::{Attachment, AttachmentKind, Body, Email};

const DEFAULT_BASE64_LINE_LENGTH: usize = 76;

/// Base64-encode `data`, hard-wrapping at `line_length` characters with
/// CRLF, the way every multipart leaf and `AUTH LOGIN` credential line
/// is wrapped.
#[must_use]
pub fn encode_base64(data: &[u8], line_length: usize) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    if line_length == 0 {
        return encoded;
    }
    encoded
        .as_bytes()
        .chunks(line_length)
        .map(|chunk| std::str::from_utf8(chunk).expect("base64 alphabet is ASCII"))
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn fresh_boundary() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

enum PartContent {
    Leaf(Vec<u8>),
    Multipart {
        subtype: &'static str,
        boundary: String,
        children: Vec<Part>,
    },
}

struct Part {
    headers: Vec<(String, String)>,
    content: PartContent,
}

impl Part {
    fn render(&self, out: &mut Vec<u8>) {
        for (name, value) in &self.headers {
            out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        match &self.content {
            PartContent::Leaf(body) => {
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(body);
            }
            PartContent::Multipart {
                subtype,
                boundary,
                children,
            } => {
                out.extend_from_slice(
                    format!("Content-Type: multipart/{subtype}; boundary={boundary}\r\n\r\n")
                        .as_bytes(),
                );
                for child in children {
                    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                    child.render(out);
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
            }
        }
    }
}

fn text_part(content_type: &str, text: &str, flags: FeatureFlags) -> Part {
    let mut headers = vec![(
        "Content-Type".to_string(),
        format!("{content_type}; charset=\"UTF-8\""),
    )];
    let body = if flags.base64_encode_all_messages {
        headers.push(("Content-Transfer-Encoding".to_string(), "base64".to_string()));
        let mut encoded = encode_base64(
            text.as_bytes(),
            flags.base64_line_length().unwrap_or(DEFAULT_BASE64_LINE_LENGTH),
        );
        encoded.push_str("\r\n");
        encoded.into_bytes()
    } else {
        format!("{text}\r\n").into_bytes()
    };
    Part {
        headers,
        content: PartContent::Leaf(body),
    }
}

fn attachment_part(attachment: &Attachment, flags: FeatureFlags) -> Part {
    let mut headers = vec![("Content-Type".to_string(), attachment.content_type.clone())];
    headers.push((
        "Content-Transfer-Encoding".to_string(),
        "base64".to_string(),
    ));

    let (disposition, content_id) = match &attachment.kind {
        AttachmentKind::Attachment { content_id } => ("attachment", content_id.clone()),
        AttachmentKind::Inline { content_id } => ("inline", Some(content_id.clone())),
    };
    headers.push((
        "Content-Disposition".to_string(),
        format!("{disposition}; filename=\"{}\"", attachment.name),
    ));
    if let Some(content_id) = content_id {
        headers.push(("Content-ID".to_string(), format!("<{content_id}>")));
    }

    let mut encoded = encode_base64(
        &attachment.data,
        flags.base64_line_length().unwrap_or(DEFAULT_BASE64_LINE_LENGTH),
    );
    encoded.push_str("\r\n");

    Part {
        headers,
        content: PartContent::Leaf(encoded.into_bytes()),
    }
}

fn body_part(body: &Body, flags: FeatureFlags) -> Part {
    match body {
        Body::Plain(text) => text_part("text/plain", text, flags),
        Body::Html(text) => text_part("text/html", text, flags),
        Body::Universal { plain, html } => Part {
            headers: Vec::new(),
            content: PartContent::Multipart {
                subtype: "alternative",
                boundary: fresh_boundary(),
                children: vec![
                    text_part("text/plain", plain, flags),
                    text_part("text/html", html, flags),
                ],
            },
        },
    }
}

fn assemble_content(email: &Email, flags: FeatureFlags) -> Part {
    let (regular, inline) = email.partition_attachments();
    let mut part = body_part(&email.body, flags);

    if !inline.is_empty() {
        let mut children = vec![part];
        children.extend(inline.iter().map(|a| attachment_part(a, flags)));
        part = Part {
            headers: Vec::new(),
            content: PartContent::Multipart {
                subtype: "related",
                boundary: fresh_boundary(),
                children,
            },
        };
    }

    if !regular.is_empty() {
        let mut children = vec![part];
        children.extend(regular.iter().map(|a| attachment_part(a, flags)));
        part = Part {
            headers: Vec::new(),
            content: PartContent::Multipart {
                subtype: "mixed",
                boundary: fresh_boundary(),
                children,
            },
        };
    }

    part
}

/// Render the full DATA payload for `email`: the envelope-independent
/// headers (`From`/`To`/`Reply-to`/`Cc`/`Date`/`Message-ID`/`Subject`/
/// `MIME-Version`) followed by the MIME body tree. The result does not
/// include the `\r\n.\r\n` terminator; that is appended by the request
/// encoder.
#[must_use]
pub fn serialize(email: &Email, flags: FeatureFlags, date: DateTime<FixedOffset>) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend_from_slice(format!("From: {}\r\n", email.sender).as_bytes());

    let to = email
        .recipients
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    out.extend_from_slice(format!("To: {to}\r\n").as_bytes());

    if let Some(reply_to) = &email.reply_to {
        out.extend_from_slice(format!("Reply-to: {reply_to}\r\n").as_bytes());
    }

    if !email.cc.is_empty() {
        let cc = email
            .cc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        out.extend_from_slice(format!("Cc: {cc}\r\n").as_bytes());
    }

    out.extend_from_slice(format!("Date: {}\r\n", date.format("%a, %d %b %Y %H:%M:%S %z")).as_bytes());

    let fraction = date.timestamp_subsec_millis() / 100;
    let domain_suffix = if email.sender.domain().is_empty() {
        String::new()
    } else {
        format!("@{}", email.sender.domain())
    };
    out.extend_from_slice(
        format!("Message-ID: <{}.{}{}>\r\n", date.timestamp(), fraction, domain_suffix).as_bytes(),
    );

    out.extend_from_slice(format!("Subject: {}\r\n", email.subject).as_bytes());
    out.extend_from_slice(b"MIME-Version: 1.0\r\n");

    assemble_content(email, flags).render(&mut out);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{Body, Contact, EmailBuilder};
    use chrono::TimeZone;

    fn fixture_date() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .timestamp_opt(1_744_193_604, 0)
            .unwrap()
    }

    #[test]
    fn plain_text_payload_matches_expected_layout() {
        let sender = Contact::named("some.sender@example.com", Some("Sender Name")).unwrap();
        let recipient = Contact::named("some.receiver@example.com", Some("Receiver Name")).unwrap();
        let email = EmailBuilder::new(
            sender,
            "Test Message",
            Body::Plain("The contents of this email\r\nare very simple and just for testing...".to_string()),
        )
        .to(recipient)
        .build()
        .unwrap();

        let payload = serialize(&email, FeatureFlags::default(), fixture_date());
        let text = String::from_utf8(payload).unwrap();

        assert!(text.starts_with(
            "From: \"Sender Name\" <some.sender@example.com>\r\n\
             To: \"Receiver Name\" <some.receiver@example.com>\r\n\
             Date: Wed, 09 Apr 2025 12:13:24 +0200\r\n\
             Message-ID: <1744193604.0@example.com>\r\n\
             Subject: Test Message\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/plain; charset=\"UTF-8\"\r\n\r\n"
        ));
        assert!(text.ends_with("are very simple and just for testing...\r\n"));
    }

    #[test]
    fn universal_body_renders_multipart_alternative() {
        let sender = Contact::new("s@e.com").unwrap();
        let recipient = Contact::new("r@e.com").unwrap();
        let email = EmailBuilder::new(
            sender,
            "Hi",
            Body::Universal {
                plain: "plain body".to_string(),
                html: "<p>html body</p>".to_string(),
            },
        )
        .to(recipient)
        .build()
        .unwrap();

        let payload = serialize(&email, FeatureFlags::default(), fixture_date());
        let text = String::from_utf8(payload).unwrap();

        assert!(text.contains("Content-Type: multipart/alternative; boundary="));
        assert!(text.contains("Content-Type: text/plain; charset=\"UTF-8\""));
        assert!(text.contains("Content-Type: text/html; charset=\"UTF-8\""));
        assert!(text.contains("plain body"));
        assert!(text.contains("<p>html body</p>"));
    }

    #[test]
    fn regular_attachment_wraps_in_multipart_mixed() {
        let sender = Contact::new("s@e.com").unwrap();
        let recipient = Contact::new("r@e.com").unwrap();
        let email = EmailBuilder::new(sender, "Hi", Body::Plain("hi".to_string()))
            .to(recipient)
            .attachment(Attachment::new("report.pdf", "application/pdf", vec![1, 2, 3]))
            .build()
            .unwrap();

        let payload = serialize(&email, FeatureFlags::default(), fixture_date());
        let text = String::from_utf8(payload).unwrap();

        assert!(text.contains("Content-Type: multipart/mixed; boundary="));
        assert!(text.contains("Content-Disposition: attachment; filename=\"report.pdf\""));
    }

    #[test]
    fn inline_attachment_wraps_in_multipart_related() {
        let sender = Contact::new("s@e.com").unwrap();
        let recipient = Contact::new("r@e.com").unwrap();
        let email = EmailBuilder::new(sender, "Hi", Body::Html("<img src=cid:logo>".to_string()))
            .to(recipient)
            .attachment(Attachment::new("logo.png", "image/png", vec![4, 5, 6]).inline("logo"))
            .build()
            .unwrap();

        let payload = serialize(&email, FeatureFlags::default(), fixture_date());
        let text = String::from_utf8(payload).unwrap();

        assert!(text.contains("Content-Type: multipart/related; boundary="));
        assert!(text.contains("Content-Disposition: inline; filename=\"logo.png\""));
        assert!(text.contains("Content-ID: <logo>"));
    }

    #[test]
    fn base64_wrap_respects_line_length_flag() {
        let data = vec![0u8; 100];
        let encoded = encode_base64(&data, 64);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 64);
        }
    }
}
