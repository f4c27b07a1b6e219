use smtp_submit_common::SmtpError;

/// One decoded frame: either a terminal reply the state machine should
/// act on, or nothing (an intermediate multi-line continuation that is
/// swallowed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Success { code: u16, tail: String },
    Failure { message: String },
    Suppressed,
}

/// Parse one already-framed line (no trailing CRLF) as an SMTP reply.
///
/// # Errors
/// Returns [`SmtpError::MalformedSmtpMessage`] when the first four
/// characters are not `DDD` followed by `' '` or `'-'`.
pub fn decode(line: &[u8]) -> Result<Decoded, SmtpError> {
    let text = std::str::from_utf8(line)?;

    if text.len() < 4 {
        return Err(SmtpError::MalformedSmtpMessage(text.to_string()));
    }

    let (code_str, rest) = text.split_at(3);
    let code: u16 = code_str
        .parse()
        .map_err(|_| SmtpError::MalformedSmtpMessage(text.to_string()))?;

    let mut chars = rest.chars();
    let separator = chars.next().ok_or_else(|| SmtpError::MalformedSmtpMessage(text.to_string()))?;
    let tail = chars.as_str().to_string();

    match separator {
        '-' => Ok(Decoded::Suppressed),
        ' ' => {
            if (200..400).contains(&code) {
                Ok(Decoded::Success { code, tail })
            } else {
                Ok(Decoded::Failure { message: text.to_string() })
            }
        }
        _ => Err(SmtpError::MalformedSmtpMessage(text.to_string())),
    }
}
