//! OAuth2 authorization and Gmail API hub construction

use async_trait::async_trait;
use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use yup_oauth2::storage::{TokenInfo, TokenStorage};

use crate::credential_store::CredentialStore;
use crate::error::{GmailError, Result};
use crate::models::Credential;

/// Gmail API scopes the responder needs
///
/// These scopes provide:
/// - gmail.readonly: list and read inbox messages
/// - gmail.send: send the auto-reply
/// - gmail.labels: look up the dedup label
/// - gmail.modify: move handled messages out of the inbox
pub const REQUIRED_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.labels",
    "https://www.googleapis.com/auth/gmail.modify",
];

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub = Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Where the session's credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Reused from the credential store without contacting Google
    Stored,
    /// Produced by the interactive consent flow during this run
    Interactive,
}

/// Credential the rest of the process is bound to
#[derive(Debug, Clone)]
pub struct AuthorizedSession {
    credential: Credential,
    origin: SessionOrigin,
}

impl AuthorizedSession {
    pub fn new(credential: Credential, origin: SessionOrigin) -> Self {
        Self { credential, origin }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }
}

/// Obtains a brand-new credential, usually by asking the user for consent
#[async_trait]
pub trait InteractiveFlow: Send + Sync {
    async fn obtain(&self, scopes: &[&str]) -> Result<Credential>;
}

/// Reuses a stored credential or falls back to the interactive flow
pub struct Authenticator<S, F> {
    store: S,
    flow: F,
}

impl<S, F> Authenticator<S, F>
where
    S: CredentialStore,
    F: InteractiveFlow,
{
    pub fn new(store: S, flow: F) -> Self {
        Self { store, flow }
    }

    /// Produce an authorized session
    ///
    /// A stored credential is wrapped as-is; whether Google still accepts it
    /// is only discovered on the first API call. Otherwise the interactive
    /// flow runs once and its credential is persisted before returning.
    pub async fn authorize(&self) -> Result<AuthorizedSession> {
        if let Some(credential) = self.store.load().await {
            if credential.covers_scopes(REQUIRED_SCOPES) {
                info!("Using stored credential");
                return Ok(AuthorizedSession::new(credential, SessionOrigin::Stored));
            }
            warn!("Stored credential lacks required scopes, re-authorizing");
        }

        info!("No usable stored credential, starting interactive authorization");
        let credential = self.flow.obtain(REQUIRED_SCOPES).await.map_err(|e| match e {
            GmailError::AuthError(_) => e,
            other => GmailError::AuthError(other.to_string()),
        })?;

        self.store.save(&credential).await?;
        Ok(AuthorizedSession::new(credential, SessionOrigin::Interactive))
    }
}

/// Token storage that keeps the last token the flow produced
///
/// The installed flow only hands out access tokens; the refresh token is
/// read back from here once consent completes.
#[derive(Clone, Default)]
struct CapturedToken {
    inner: Arc<Mutex<Option<TokenInfo>>>,
}

impl CapturedToken {
    async fn refresh_token(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .as_ref()
            .and_then(|token| token.refresh_token.clone())
    }
}

#[async_trait]
impl TokenStorage for CapturedToken {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        *self.inner.lock().await = Some(token);
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        self.inner.lock().await.clone()
    }
}

/// Desktop-app consent flow with a localhost redirect
pub struct InstalledAppFlow {
    credentials_path: PathBuf,
}

impl InstalledAppFlow {
    /// `credentials_path` points at the application secret downloaded from
    /// Google Cloud Console (`installed` or `web` client)
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
        }
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }
}

#[async_trait]
impl InteractiveFlow for InstalledAppFlow {
    async fn obtain(&self, scopes: &[&str]) -> Result<Credential> {
        let secret = yup_oauth2::read_application_secret(&self.credentials_path)
            .await
            .map_err(|e| GmailError::AuthError(format!("Failed to read credentials: {}", e)))?;

        let captured = CapturedToken::default();

        // HTTPRedirect opens a browser for user authorization
        let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
            secret.clone(),
            yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .with_storage(Box::new(captured.clone()))
        .build()
        .await
        .map_err(|e| GmailError::AuthError(format!("Failed to build authenticator: {}", e)))?;

        auth.token(scopes)
            .await
            .map_err(|e| GmailError::AuthError(format!("Authorization failed: {}", e)))?;

        let refresh_token = captured.refresh_token().await.ok_or_else(|| {
            GmailError::AuthError("Authorization completed without a refresh token".to_string())
        })?;

        debug!("Interactive authorization produced a refresh token");
        Ok(Credential::new(
            secret.client_id,
            secret.client_secret,
            refresh_token,
            scopes,
        ))
    }
}

/// Build a Gmail API hub bound to an authorized session
///
/// Uses the refresh-token flow, so no request is made until the first API
/// call needs an access token.
pub async fn connect_gmail_hub(session: &AuthorizedSession) -> Result<GmailHub> {
    let credential = session.credential();
    let secret = yup_oauth2::authorized_user::AuthorizedUserSecret {
        client_id: credential.client_id.clone(),
        client_secret: credential.client_secret.clone(),
        refresh_token: credential.refresh_token.clone(),
        key_type: credential.credential_type.clone(),
    };

    let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
        .build()
        .await
        .map_err(|e| GmailError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Use HTTP/1 for compatibility (HTTP/2 is default but HTTP/1 works better with google-gmail1)
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| GmailError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}
