//! Common test utilities and fixtures

#![allow(dead_code)]

use gmail_autoresponder::client::MailboxClient;
use gmail_autoresponder::error::Result;
use gmail_autoresponder::models::{Header, Label, Message, ReplyPayload};
use mockall::mock;

/// Dedup label every fixture mailbox carries
pub const DEDUP_LABEL_NAME: &str = "open-in-app-backend";
pub const DEDUP_LABEL_ID: &str = "Label_42";

/// Create an unread message with From and Subject headers
pub fn create_test_message(id: &str, from: &str, subject: &str) -> Message {
    Message {
        id: id.to_string(),
        thread_id: format!("thread_{}", id),
        headers: vec![Header::new("From", from), Header::new("Subject", subject)],
    }
}

/// Create a message that answers an earlier one
pub fn create_threaded_message(id: &str, from: &str) -> Message {
    let mut message = create_test_message(id, from, "Re: Hi");
    message
        .headers
        .push(Header::new("In-Reply-To", format!("<parent-{}@mail.example.com>", id)));
    message
}

/// Labels returned by a mailbox that has the dedup label configured
pub fn mailbox_labels() -> Vec<Label> {
    vec![
        Label::new("INBOX", "INBOX"),
        Label::new("UNREAD", "UNREAD"),
        Label::new(DEDUP_LABEL_ID, DEDUP_LABEL_NAME),
    ]
}

// Mock implementation of MailboxClient for testing
mock! {
    pub MailboxClient {}

    #[async_trait::async_trait]
    impl MailboxClient for MailboxClient {
        async fn list_labels(&self) -> Result<Vec<Label>>;
        async fn list_unreplied_candidate_ids(&self) -> Result<Vec<String>>;
        async fn get_message(&self, id: &str) -> Result<Message>;
        async fn send_reply(&self, payload: &ReplyPayload) -> Result<String>;
        async fn relabel_message(&self, id: &str, add_label: &str, remove_label: &str) -> Result<()>;
    }
}

/// Mock that resolves the dedup label exactly once
pub fn mock_with_labels() -> MockMailboxClient {
    let mut mock = MockMailboxClient::new();
    mock.expect_list_labels()
        .times(1)
        .returning(|| Ok(mailbox_labels()));
    mock
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_message() {
        let msg = create_test_message("msg1", "Jane <jane@example.com>", "Hello");
        assert_eq!(msg.id, "msg1");
        assert_eq!(msg.thread_id, "thread_msg1");
        assert!(msg.is_eligible());
    }

    #[test]
    fn test_create_threaded_message() {
        let msg = create_threaded_message("msg1", "Jane <jane@example.com>");
        assert!(msg.has_reply_header());
    }
}
