// intake-core/src/ports/parser.rs

use async_trait::async_trait;

use super::storage::ByteStream;
use crate::domain::file::{FileFormat, FileMetadata, ParsedData};
use crate::error::IntakeError;

/// Format-specific reader turning raw content into tabular records.
///
/// `validate` may consume the stream entirely; callers download again before
/// calling `parse`.
#[async_trait]
pub trait FileParser: Send + Sync {
    async fn parse(&self, content: ByteStream, file: &FileMetadata) -> Result<ParsedData, IntakeError>;

    /// Structural check only, no records are produced.
    async fn validate(&self, content: ByteStream) -> Result<(), IntakeError>;

    async fn extract_metadata(&self, content: ByteStream) -> Result<FileMetadata, IntakeError>;

    fn supports(&self, format: FileFormat) -> bool;
}
