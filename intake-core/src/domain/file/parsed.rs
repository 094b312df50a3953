// intake-core/src/domain/file/parsed.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metadata::FileMetadata;
use crate::domain::entity::FieldValue;

pub type Record = BTreeMap<String, FieldValue>;

/// A row or cell that could not be read. Kept alongside the data instead of
/// aborting the parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub row: usize,
    pub column: String,
    pub message: String,
}

/// Tabular result of parsing one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedData {
    pub file_metadata: FileMetadata,
    pub headers: Vec<String>,
    records: Vec<Record>,
    record_count: usize,
    pub parsed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ParseError>,
}

impl ParsedData {
    pub fn new(file_metadata: FileMetadata, headers: Vec<String>) -> Self {
        Self {
            file_metadata,
            headers,
            records: Vec::new(),
            record_count: 0,
            parsed_at: Utc::now(),
            errors: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: Record) {
        self.records.push(record);
        self.record_count += 1;
    }

    pub fn add_error(&mut self, row: usize, column: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ParseError {
            row,
            column: column.into(),
            message: message.into(),
        });
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Values of one column, in record order. Missing cells are `None`.
    pub fn column<'a>(&'a self, header: &'a str) -> impl Iterator<Item = Option<&'a FieldValue>> + 'a {
        self.records.iter().map(move |r| r.get(header))
    }
}
