//! Authorization against a token file on disk

use async_trait::async_trait;
use gmail_autoresponder::auth::{Authenticator, InteractiveFlow, SessionOrigin, REQUIRED_SCOPES};
use gmail_autoresponder::credential_store::{CredentialStore, FileCredentialStore};
use gmail_autoresponder::error::{GmailError, Result};
use gmail_autoresponder::models::Credential;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Consent flow stand-in that counts how often it was asked
#[derive(Clone, Default)]
struct CountingFlow {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl InteractiveFlow for CountingFlow {
    async fn obtain(&self, scopes: &[&str]) -> Result<Credential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GmailError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "credentials.json missing",
            )));
        }
        Ok(Credential::new("client", "secret", "fresh-refresh", scopes))
    }
}

#[tokio::test]
async fn test_saved_token_skips_consent_flow() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("token.json");
    let stored = Credential::new("client", "secret", "stored-refresh", REQUIRED_SCOPES);
    FileCredentialStore::new(&path).save(&stored).await.unwrap();

    let flow = CountingFlow::default();
    let authenticator = Authenticator::new(FileCredentialStore::new(&path), flow.clone());
    let session = authenticator.authorize().await.unwrap();

    assert_eq!(session.origin(), SessionOrigin::Stored);
    assert_eq!(session.credential(), &stored);
    assert_eq!(flow.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_first_run_persists_token_for_next_start() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("token.json");
    let flow = CountingFlow::default();

    let first = Authenticator::new(FileCredentialStore::new(&path), flow.clone())
        .authorize()
        .await
        .unwrap();
    assert_eq!(first.origin(), SessionOrigin::Interactive);
    assert!(path.exists());

    // A restarted process finds the token written by the first run
    let second = Authenticator::new(FileCredentialStore::new(&path), flow.clone())
        .authorize()
        .await
        .unwrap();
    assert_eq!(second.origin(), SessionOrigin::Stored);
    assert_eq!(second.credential().refresh_token, "fresh-refresh");
    assert_eq!(flow.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_corrupt_token_file_falls_back_to_consent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("token.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();
    let flow = CountingFlow::default();

    let session = Authenticator::new(FileCredentialStore::new(&path), flow.clone())
        .authorize()
        .await
        .unwrap();

    assert_eq!(session.origin(), SessionOrigin::Interactive);
    assert_eq!(flow.calls.load(Ordering::SeqCst), 1);
    let rewritten = FileCredentialStore::new(&path).load().await.unwrap();
    assert_eq!(rewritten.refresh_token, "fresh-refresh");
}

#[tokio::test]
async fn test_failed_consent_is_fatal_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("token.json");
    let flow = CountingFlow {
        fail: true,
        ..Default::default()
    };

    let result = Authenticator::new(FileCredentialStore::new(&path), flow)
        .authorize()
        .await;

    match result {
        Err(err @ GmailError::AuthError(_)) => assert!(err.is_fatal()),
        other => panic!("expected auth error, got {:?}", other.map(|s| s.origin())),
    }
    assert!(!path.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_persisted_token_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("token.json");

    Authenticator::new(FileCredentialStore::new(&path), CountingFlow::default())
        .authorize()
        .await
        .unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
