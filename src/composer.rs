//! Auto-reply composition

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{GmailError, Result};
use crate::models::{Message, ReplyPayload, FROM_HEADER};

/// Subject of every auto-reply
pub const REPLY_SUBJECT: &str = "Auto-Reply";

/// Body of every auto-reply
pub const REPLY_BODY: &str =
    "Thank you for your email. I'm currently on vacation and will reply to you when I return.";

/// Builds the reply sent in answer to a message
pub trait ReplyComposer: Send + Sync {
    fn compose(&self, message: &Message) -> Result<ReplyPayload>;
}

/// Fixed out-of-office reply addressed to the message's sender
#[derive(Debug, Clone, Default)]
pub struct AutoReplyComposer;

impl AutoReplyComposer {
    pub fn new() -> Self {
        Self
    }
}

impl ReplyComposer for AutoReplyComposer {
    fn compose(&self, message: &Message) -> Result<ReplyPayload> {
        let from = message.header(FROM_HEADER).ok_or_else(|| {
            GmailError::InvalidMessageFormat(format!("Message {} has no From header", message.id))
        })?;

        let to = extract_reply_address(from).ok_or_else(|| {
            GmailError::InvalidMessageFormat(format!(
                "Message {} has an empty From header",
                message.id
            ))
        })?;

        let raw_encoded = encode_raw_message(&to, REPLY_SUBJECT, REPLY_BODY);
        Ok(ReplyPayload {
            to,
            subject: REPLY_SUBJECT.to_string(),
            body: REPLY_BODY.to_string(),
            raw_encoded,
        })
    }
}

/// Address to reply to, taken from a `From` header value
///
/// Takes the last whitespace-separated token and strips one `<` and one `>`
/// around it, so `Jane Doe <jane@example.com>` yields `jane@example.com`.
/// A bare address is returned unchanged. Multi-recipient or quoted-comment
/// headers are not handled.
pub fn extract_reply_address(from: &str) -> Option<String> {
    let token = from.split_whitespace().last()?;
    let token = token.strip_prefix('<').unwrap_or(token);
    let token = token.strip_suffix('>').unwrap_or(token);

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Base64 of the reply as an RFC 822 message with CRLF line endings
pub fn encode_raw_message(to: &str, subject: &str, body: &str) -> String {
    let lines = [
        format!("To: {}", to),
        "Content-type: text/html;charset=iso-8859-1".to_string(),
        "MIME-Version: 1.0".to_string(),
        format!("Subject: {}", subject),
        String::new(),
        body.to_string(),
    ];

    STANDARD.encode(lines.join("\r\n"))
}
