// intake-core/src/ports/storage.rs

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncRead;

use crate::error::IntakeError;

/// Readable file content. Dropping the stream releases the underlying handle.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, path: &str, content: &[u8]) -> Result<(), IntakeError>;

    async fn download(&self, path: &str) -> Result<ByteStream, IntakeError>;

    async fn delete(&self, path: &str) -> Result<(), IntakeError>;

    async fn exists(&self, path: &str) -> Result<bool, IntakeError>;

    /// Time-limited URL granting read access to `path`.
    async fn signed_url(&self, path: &str, expires_in: Duration) -> Result<String, IntakeError>;
}
