use serde::{Deserialize, Serialize};

/// Header that marks a message as part of an existing conversation
pub const IN_REPLY_TO_HEADER: &str = "In-Reply-To";

/// Header carrying the sender
pub const FROM_HEADER: &str = "From";

/// Long-lived authorization persisted between runs
///
/// Serialized in the `authorized_user` layout Google tooling understands.
/// `scopes` is optional so token files written by other tools still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type", default = "default_credential_type")]
    pub credential_type: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

fn default_credential_type() -> String {
    "authorized_user".to_string()
}

impl Credential {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
        scopes: &[&str],
    ) -> Self {
        Self {
            credential_type: default_credential_type(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether this credential can be used for the given scopes
    ///
    /// A credential that records no scopes is trusted; its validity is only
    /// discovered by the first API call.
    pub fn covers_scopes(&self, required: &[&str]) -> bool {
        self.scopes.is_empty()
            || required
                .iter()
                .all(|scope| self.scopes.iter().any(|s| s == scope))
    }
}

/// A single message header, in provider order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Read-only view of a message fetched during one poll tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub headers: Vec<Header>,
}

impl Message {
    /// First header value with the given name (ASCII case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Derived from the headers of this fetch, never cached
    pub fn has_reply_header(&self) -> bool {
        self.header(IN_REPLY_TO_HEADER).is_some()
    }

    /// Messages already part of a reply chain are not auto-answered
    pub fn is_eligible(&self) -> bool {
        !self.has_reply_header()
    }
}

/// Label as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Outgoing auto-reply, built and discarded while handling one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPayload {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Base64 of the CRLF-joined RFC 822 message
    pub raw_encoded: String,
}
