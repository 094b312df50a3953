// intake-core/src/domain/file/metadata.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use super::checksum::compute_checksum;
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Xlsx,
    Xls,
    Csv,
    Json,
    Xml,
    Parquet,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Parquet => "parquet",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Self::from_str(ext).ok())
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            "parquet" => Ok(Self::Parquet),
            _ => Err(format!("Unknown file format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptor of one uploaded file and its processing lifecycle.
///
/// The status only moves forward: `pending -> processing -> completed | failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size_bytes: u64,
    pub file_format: FileFormat,
    pub upload_timestamp: DateTime<Utc>,
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub record_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Hex encoded SHA-256 of the content. Empty when unknown.
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_metadata: BTreeMap<String, String>,
}

impl FileMetadata {
    pub fn new(
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        file_size_bytes: u64,
        file_format: FileFormat,
    ) -> Self {
        Self {
            file_id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            file_path: file_path.into(),
            file_size_bytes,
            file_format,
            upload_timestamp: Utc::now(),
            processing_status: ProcessingStatus::Pending,
            processed_at: None,
            record_count: 0,
            error_message: None,
            checksum: String::new(),
            additional_metadata: BTreeMap::new(),
        }
    }

    /// Describe an upload from its raw content: size and checksum are derived.
    pub fn for_content(
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        file_format: FileFormat,
        content: &[u8],
    ) -> Self {
        let mut metadata = Self::new(file_name, file_path, content.len() as u64, file_format);
        metadata.checksum = compute_checksum(content);
        metadata
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.file_name.trim().is_empty() {
            return Err(DomainError::validation("file name cannot be empty"));
        }
        if self.file_path.trim().is_empty() {
            return Err(DomainError::validation("file path cannot be empty"));
        }
        if self.file_size_bytes == 0 {
            return Err(DomainError::validation("file size must be positive"));
        }
        Ok(())
    }

    pub fn mark_processing(&mut self) -> Result<(), DomainError> {
        if self.processing_status != ProcessingStatus::Pending {
            return Err(self.illegal_transition(ProcessingStatus::Processing));
        }
        self.processing_status = ProcessingStatus::Processing;
        Ok(())
    }

    pub fn mark_completed(&mut self, record_count: usize) -> Result<(), DomainError> {
        if self.processing_status.is_terminal() {
            return Err(self.illegal_transition(ProcessingStatus::Completed));
        }
        self.processing_status = ProcessingStatus::Completed;
        self.record_count = record_count;
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) -> Result<(), DomainError> {
        if self.processing_status.is_terminal() {
            return Err(self.illegal_transition(ProcessingStatus::Failed));
        }
        self.processing_status = ProcessingStatus::Failed;
        self.error_message = Some(error_message.into());
        self.processed_at = Some(Utc::now());
        Ok(())
    }

    fn illegal_transition(&self, to: ProcessingStatus) -> DomainError {
        DomainError::business_rule(
            "file_status_transition",
            format!(
                "file {} cannot move from {} to {}",
                self.file_id, self.processing_status, to
            ),
        )
    }

    pub fn is_completed(&self) -> bool {
        self.processing_status == ProcessingStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.processing_status == ProcessingStatus::Failed
    }

    pub fn is_processing(&self) -> bool {
        self.processing_status == ProcessingStatus::Processing
    }

    pub fn extension(&self) -> &'static str {
        self.file_format.as_str()
    }

    /// True when no checksum is recorded or the content matches it.
    pub fn verify_checksum(&self, content: &[u8]) -> bool {
        self.checksum.is_empty() || self.checksum.eq_ignore_ascii_case(&compute_checksum(content))
    }
}
