use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::CredentialsError;

/// What survives between runs: the bearer token and/or the session cookie
/// header captured after sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl StoredCredentials {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.cookie.is_none()
    }
}

/// Shared handle to the persisted client credential.
#[derive(Debug, Clone)]
pub struct Credentials {
    path: Option<PathBuf>,
    inner: Arc<RwLock<StoredCredentials>>,
}

impl Credentials {
    /// Credentials that live only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Arc::new(RwLock::new(StoredCredentials::default())),
        }
    }

    /// Load credentials from `path`, starting empty if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        let stored = if path.exists() {
            let json = std::fs::read_to_string(path)?;
            serde_json::from_str(&json)?
        } else {
            StoredCredentials::default()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            inner: Arc::new(RwLock::new(stored)),
        })
    }

    pub async fn snapshot(&self) -> StoredCredentials {
        self.inner.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }

    pub async fn set_token(&self, token: Option<String>) -> Result<(), CredentialsError> {
        let mut guard = self.inner.write().await;
        guard.token = token;
        self.persist(&guard).await
    }

    pub async fn set_cookie(&self, cookie: Option<String>) -> Result<(), CredentialsError> {
        let mut guard = self.inner.write().await;
        guard.cookie = cookie;
        self.persist(&guard).await
    }

    pub async fn clear(&self) -> Result<(), CredentialsError> {
        let mut guard = self.inner.write().await;
        *guard = StoredCredentials::default();
        if let Some(path) = &self.path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::info!("Removed stored credentials at {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn persist(&self, stored: &StoredCredentials) -> Result<(), CredentialsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        write_private(path, serde_json::to_string_pretty(stored)?.as_bytes()).await?;
        tracing::info!("Saved credentials to {}", path.display());
        Ok(())
    }
}

/// Write `contents` readable by the owner only. Tightens an existing file too.
#[cfg(unix)]
async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
        .await?;
    file.write_all(contents).await?;
    file.flush().await
}

#[cfg(not(unix))]
async fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, contents).await
}
