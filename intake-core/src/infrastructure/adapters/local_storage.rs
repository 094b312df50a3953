// intake-core/src/infrastructure/adapters/local_storage.rs

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::IntakeError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::{ByteStream, Storage};

/// Storage rooted in a local directory. Every path is relative to the root.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path traversal guard: only plain relative components are accepted.
    fn resolve(&self, path: &str) -> Result<PathBuf, IntakeError> {
        let relative = Path::new(path);
        let safe = !path.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(IntakeError::UnsafePath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn storage_error(action: &str, path: &str, err: std::io::Error) -> IntakeError {
    InfrastructureError::Storage(format!("failed to {} '{}': {}", action, path, err)).into()
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn upload(&self, path: &str, content: &[u8]) -> Result<(), IntakeError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error("create directory for", path, e))?;
        }

        let content = content.to_vec();
        tokio::task::spawn_blocking(move || atomic_write(&target, content))
            .await
            .map_err(|e| IntakeError::InternalError(format!("upload task failed: {}", e)))??;

        debug!("File stored");
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<ByteStream, IntakeError> {
        let target = self.resolve(path)?;
        let file = tokio::fs::File::open(&target)
            .await
            .map_err(|e| storage_error("open", path, e))?;
        Ok(Box::new(file))
    }

    async fn delete(&self, path: &str) -> Result<(), IntakeError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| storage_error("delete", path, e))
    }

    async fn exists(&self, path: &str) -> Result<bool, IntakeError> {
        let target = self.resolve(path)?;
        tokio::fs::try_exists(&target)
            .await
            .map_err(|e| storage_error("inspect", path, e))
    }

    async fn signed_url(&self, path: &str, expires_in: Duration) -> Result<String, IntakeError> {
        let target = self.resolve(path)?;
        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|e| IntakeError::InternalError(format!("invalid expiry: {}", e)))?;
        let expires_at = (Utc::now() + ttl).timestamp();
        Ok(format!("file://{}?expires={}", target.display(), expires_at))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_upload_then_download() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = LocalStorage::new(dir.path());

        storage.upload("uploads/2024/accounts.csv", b"account_id,name\nA1,Alice\n").await?;
        assert!(storage.exists("uploads/2024/accounts.csv").await?);

        let mut stream = storage.download("uploads/2024/accounts.csv").await?;
        let mut content = String::new();
        stream.read_to_string(&mut content).await?;
        assert_eq!(content, "account_id,name\nA1,Alice\n");

        storage.delete("uploads/2024/accounts.csv").await?;
        assert!(!storage.exists("uploads/2024/accounts.csv").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_traversal_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = LocalStorage::new(dir.path());

        for path in ["../escape.csv", "/etc/passwd", "a/../../b", ""] {
            let err = storage.exists(path).await.unwrap_err();
            assert!(matches!(err, IntakeError::UnsafePath(_)), "{path}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_a_storage_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = LocalStorage::new(dir.path());
        let err = storage.download("nope.csv").await.err().unwrap();
        assert!(matches!(
            err,
            IntakeError::Infrastructure(InfrastructureError::Storage(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_signed_url_carries_expiry() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = LocalStorage::new(dir.path());
        let url = storage.signed_url("a.csv", Duration::from_secs(600)).await?;
        assert!(url.starts_with("file://"));
        assert!(url.contains("a.csv?expires="));
        Ok(())
    }
}
