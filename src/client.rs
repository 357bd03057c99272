//! Gmail mailbox operations the responder depends on

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use google_gmail1::api::{Message as ApiMessage, ModifyMessageRequest};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::GmailHub;
use crate::error::{GmailError, Result};
use crate::models::{Header, Label, Message, ReplyPayload};

/// Label every candidate is taken from and removed from once handled
pub const INBOX_LABEL: &str = "INBOX";

/// Provider query selecting candidates within the inbox
pub const UNREAD_QUERY: &str = "is:unread";

const READ_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";
const SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
const LABELS_SCOPE: &str = "https://www.googleapis.com/auth/gmail.labels";
const MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Capability set bound to one authorized session
#[async_trait]
pub trait MailboxClient: Send + Sync {
    /// List all labels in the account
    async fn list_labels(&self) -> Result<Vec<Label>>;

    /// Ids of inbox messages matching the unread query; empty when none match
    async fn list_unreplied_candidate_ids(&self) -> Result<Vec<String>>;

    /// Fetch a message with all of its headers
    async fn get_message(&self, id: &str) -> Result<Message>;

    /// Send a composed reply, returning the id of the sent message
    async fn send_reply(&self, payload: &ReplyPayload) -> Result<String>;

    /// Add one label to a message and remove another in a single call
    async fn relabel_message(&self, id: &str, add_label: &str, remove_label: &str) -> Result<()>;
}

/// Gmail API backed mailbox client
pub struct ProductionMailboxClient {
    hub: GmailHub,
    source_label: String,
    query: String,
}

impl ProductionMailboxClient {
    pub fn new(hub: GmailHub) -> Self {
        Self::with_query(hub, INBOX_LABEL, UNREAD_QUERY)
    }

    /// Client listing candidates from `source_label` filtered by `query`
    pub fn with_query(hub: GmailHub, source_label: &str, query: &str) -> Self {
        Self {
            hub,
            source_label: source_label.to_string(),
            query: query.to_string(),
        }
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempts <= max_retries => {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Convert a Gmail API message into the responder's view of it
fn parse_message(msg: ApiMessage) -> Result<Message> {
    let id = msg
        .id
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing message ID".to_string()))?;

    let thread_id = msg
        .thread_id
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing thread ID".to_string()))?;

    let headers = msg
        .payload
        .and_then(|p| p.headers)
        .ok_or_else(|| GmailError::InvalidMessageFormat("Missing headers".to_string()))?
        .into_iter()
        .filter_map(|header| match (header.name, header.value) {
            (Some(name), Some(value)) => Some(Header { name, value }),
            _ => None,
        })
        .collect();

    Ok(Message {
        id,
        thread_id,
        headers,
    })
}

#[async_trait]
impl MailboxClient for ProductionMailboxClient {
    async fn list_labels(&self) -> Result<Vec<Label>> {
        Self::with_retry("list_labels", 3, move || async move {
            // Wrap API call in timeout to prevent indefinite hangs at startup
            let timeout_duration = Duration::from_secs(30);
            let api_call = async {
                debug!("Calling Gmail API to list labels...");
                self.hub
                    .users()
                    .labels_list("me")
                    .add_scope(LABELS_SCOPE)
                    .doit()
                    .await
            };

            let (_, response) = match tokio::time::timeout(timeout_duration, api_call).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Gmail API list_labels call timed out after {:?}", timeout_duration);
                    return Err(GmailError::NetworkError(format!(
                        "API call timed out after {:?}",
                        timeout_duration
                    )));
                }
            };

            let labels: Vec<Label> = response
                .labels
                .unwrap_or_default()
                .into_iter()
                .filter_map(|label| match (label.id, label.name) {
                    (Some(id), Some(name)) => Some(Label { id, name }),
                    _ => None,
                })
                .collect();

            debug!("Successfully parsed {} labels", labels.len());
            Ok(labels)
        })
        .await
    }

    async fn list_unreplied_candidate_ids(&self) -> Result<Vec<String>> {
        let mut all_ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut call = self
                .hub
                .users()
                .messages_list("me")
                .add_label_ids(&self.source_label)
                .q(&self.query)
                .max_results(100);

            if let Some(token) = page_token.as_ref() {
                call = call.page_token(token);
            }

            let (_, response) = call.add_scope(READ_SCOPE).doit().await?;

            all_ids.extend(
                response
                    .messages
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|msg_ref| msg_ref.id),
            );

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(all_ids)
    }

    async fn get_message(&self, id: &str) -> Result<Message> {
        // Metadata format without a header filter returns every header
        let (_, msg) = self
            .hub
            .users()
            .messages_get("me", id)
            .format("metadata")
            .add_scope(READ_SCOPE)
            .doit()
            .await?;

        parse_message(msg)
    }

    async fn send_reply(&self, payload: &ReplyPayload) -> Result<String> {
        let raw = STANDARD.decode(&payload.raw_encoded).map_err(|e| {
            GmailError::InvalidMessageFormat(format!("Reply is not valid base64: {}", e))
        })?;

        let (_, sent) = self
            .hub
            .users()
            .messages_send(ApiMessage::default(), "me")
            .add_scope(SEND_SCOPE)
            .upload(
                Cursor::new(raw),
                "message/rfc822"
                    .parse()
                    .map_err(|e| GmailError::SendError(format!("Invalid mime type: {:?}", e)))?,
            )
            .await
            .map_err(|e| GmailError::SendError(GmailError::from(e).to_string()))?;

        Ok(sent.id.unwrap_or_default())
    }

    async fn relabel_message(&self, id: &str, add_label: &str, remove_label: &str) -> Result<()> {
        let modify_request = ModifyMessageRequest {
            add_label_ids: Some(vec![add_label.to_string()]),
            remove_label_ids: Some(vec![remove_label.to_string()]),
        };

        self.hub
            .users()
            .messages_modify(modify_request, "me", id)
            .add_scope(MODIFY_SCOPE)
            .doit()
            .await
            .map_err(|e| GmailError::RelabelError(GmailError::from(e).to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_gmail1::api::{MessagePart, MessagePartHeader};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn api_header(name: &str, value: &str) -> MessagePartHeader {
        MessagePartHeader {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
        }
    }

    #[tokio::test]
    async fn test_retry_gives_up_immediately_on_auth_error() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;

        let result: Result<()> =
            ProductionMailboxClient::with_retry("list_labels", 3, move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(GmailError::AuthError("invalid token".to_string()))
            })
            .await;

        assert!(matches!(result, Err(GmailError::AuthError(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_server_error() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;

        let result =
            ProductionMailboxClient::with_retry("list_labels", 3, move || async move {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(GmailError::ServerError {
                        status: 503,
                        message: "Service unavailable".to_string(),
                    })
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_of_zero_returns_transient_error() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;

        let result: Result<()> =
            ProductionMailboxClient::with_retry("list_labels", 0, move || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(GmailError::RateLimitExceeded { retry_after: 5 })
            })
            .await;

        assert!(matches!(result, Err(GmailError::RateLimitExceeded { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_message_keeps_header_order() {
        let msg = ApiMessage {
            id: Some("m1".to_string()),
            thread_id: Some("t1".to_string()),
            payload: Some(MessagePart {
                headers: Some(vec![
                    api_header("From", "Jane Doe <jane@example.com>"),
                    api_header("Subject", "Hi"),
                    api_header("In-Reply-To", "<prev@mail>"),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let parsed = parse_message(msg).unwrap();

        assert_eq!(parsed.id, "m1");
        assert_eq!(parsed.thread_id, "t1");
        let names: Vec<&str> = parsed.headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["From", "Subject", "In-Reply-To"]);
        assert!(parsed.has_reply_header());
    }

    #[test]
    fn test_parse_message_drops_incomplete_headers() {
        let msg = ApiMessage {
            id: Some("m1".to_string()),
            thread_id: Some("t1".to_string()),
            payload: Some(MessagePart {
                headers: Some(vec![
                    MessagePartHeader {
                        name: Some("X-Empty".to_string()),
                        value: None,
                    },
                    api_header("From", "a@b.c"),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let parsed = parse_message(msg).unwrap();
        assert_eq!(parsed.headers.len(), 1);
    }

    #[test]
    fn test_parse_message_requires_id_and_headers() {
        let missing_id = ApiMessage {
            thread_id: Some("t1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            parse_message(missing_id),
            Err(GmailError::InvalidMessageFormat(_))
        ));

        let missing_headers = ApiMessage {
            id: Some("m1".to_string()),
            thread_id: Some("t1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            parse_message(missing_headers),
            Err(GmailError::InvalidMessageFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_with_retry_succeeds_after_transient_error() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = ProductionMailboxClient::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                if count.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err(GmailError::NetworkError("Connection timeout".to_string()))
                } else {
                    Ok("success".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_fails_on_permanent_error() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = ProductionMailboxClient::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(GmailError::Forbidden("denied".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }
}
