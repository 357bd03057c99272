//! Persistence of the long-lived authorization token

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::Credential;

/// Durable storage for a single [`Credential`]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential; any read or parse failure yields `None`
    async fn load(&self) -> Option<Credential>;

    /// Replace the stored credential wholesale
    async fn save(&self, credential: &Credential) -> Result<()>;
}

/// Credential store backed by a JSON file (`token.json`)
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Option<Credential> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored credential at {:?}", self.path);
                return None;
            }
            Err(e) => {
                warn!("Failed to read stored credential {:?}: {}", self.path, e);
                return None;
            }
        };

        match serde_json::from_str::<Credential>(&content) {
            Ok(credential) => {
                debug!("Loaded stored credential from {:?}", self.path);
                Some(credential)
            }
            Err(e) => {
                warn!("Ignoring unparsable credential file {:?}: {}", self.path, e);
                None
            }
        }
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string(credential)?;
        let mut file = open_token_file(&self.path).await?;
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        // A file left over from an earlier run keeps its old mode on open
        secure_token_file(&self.path).await?;

        info!("Saved credential to {:?}", self.path);
        Ok(())
    }
}

/// Open the token file for a fresh write, creating it owner-only on unix
async fn open_token_file(path: &Path) -> Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    Ok(options.open(path).await?)
}

/// Restrict the token file to owner read/write (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows relies on the ACLs inherited from the parent directory
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
