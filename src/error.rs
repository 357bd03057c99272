use thiserror::Error;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Errors raised while authorizing, polling and answering mail
#[derive(Error, Debug)]
pub enum GmailError {
    // Fatal. Either of these stops the process, at startup or mid-run.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Per message. The tick records these and moves on.
    /// Message vanished between listing and fetching
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("Send failed: {0}")]
    SendError(String),

    /// The reply went out but the dedup label was not applied
    #[error("Relabel failed: {0}")]
    RelabelError(String),

    // Transport and provider responses
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("Gmail API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl GmailError {
    /// Worth retrying the same call after a pause
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GmailError::RateLimitExceeded { .. }
                | GmailError::ServerError { .. }
                | GmailError::NetworkError(_)
        )
    }

    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Errors no later tick can recover from; they stop the process
    pub fn is_fatal(&self) -> bool {
        matches!(self, GmailError::AuthError(_) | GmailError::ConfigError(_))
    }

    /// Classify a non-success HTTP status from the Gmail API
    fn from_status(status: hyper::StatusCode, retry_after: u64) -> Self {
        let code = status.as_u16();
        let message = format!(
            "HTTP {}: {}",
            code,
            status.canonical_reason().unwrap_or("Unknown")
        );

        match code {
            429 => GmailError::RateLimitExceeded { retry_after },
            404 => GmailError::MessageNotFound("Resource not found".to_string()),
            400 => GmailError::BadRequest(message),
            // Revoked or expired refresh tokens surface here
            401 => GmailError::AuthError(message),
            403 => GmailError::Forbidden(message),
            500..=599 => GmailError::ServerError {
                status: code,
                message,
            },
            _ => GmailError::ApiError(message),
        }
    }
}

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Seconds from a `Retry-After` header; only the delay-seconds form is read
fn retry_after_secs(headers: &hyper::HeaderMap) -> u64 {
    headers
        .get(hyper::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

impl From<google_gmail1::Error> for GmailError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                GmailError::from_status(response.status(), retry_after_secs(response.headers()))
            }
            google_gmail1::Error::BadRequest(ref err) => GmailError::BadRequest(err.to_string()),
            google_gmail1::Error::HttpError(ref err) => {
                GmailError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => GmailError::NetworkError(err.to_string()),
            google_gmail1::Error::MissingToken(ref err) => {
                GmailError::AuthError(format!("No access token available: {}", err))
            }
            _ => GmailError::ApiError(error.to_string()),
        }
    }
}
