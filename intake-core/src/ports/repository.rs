// intake-core/src/ports/repository.rs
//
// Persistence contracts. Each call is expected to be atomic on its own; the
// use cases never hold locks or transactions across calls.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::entity::{Entity, FieldMetadata};
use crate::domain::file::{FileMetadata, ProcessingStatus};
use crate::domain::lineage::LineageRecord;
use crate::domain::quality::QualityScore;
use crate::domain::validation::{ValidationResult, ValidationRule};
use crate::error::IntakeError;

#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Inserts a new entity. An active entity with the same driving value is
    /// a `DomainError::Duplicate`.
    async fn save(&self, entity: &Entity) -> Result<(), IntakeError>;

    async fn find_by_id(&self, entity_id: &str) -> Result<Entity, IntakeError>;

    async fn find_by_driving_field(&self, driving_value: &str) -> Result<Entity, IntakeError>;

    async fn find_by_type(
        &self,
        entity_type: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entity>, IntakeError>;

    async fn update(&self, entity: &Entity) -> Result<(), IntakeError>;

    /// Soft delete: the entity is deactivated, never removed.
    async fn delete(&self, entity_id: &str) -> Result<(), IntakeError>;

    async fn exists(&self, driving_value: &str) -> Result<bool, IntakeError>;
}

#[async_trait]
pub trait MetadataRepository: Send + Sync {
    async fn field_metadata(&self, field_name: &str) -> Result<FieldMetadata, IntakeError>;

    /// Active fields only.
    async fn all_field_metadata(&self) -> Result<Vec<FieldMetadata>, IntakeError>;

    /// The configured driving field, if any.
    async fn driving_field(&self) -> Result<Option<FieldMetadata>, IntakeError>;

    async fn save_field_metadata(&self, metadata: &FieldMetadata) -> Result<(), IntakeError>;

    async fn validation_rules(&self, field_id: &str) -> Result<Vec<ValidationRule>, IntakeError>;

    /// Active rules only.
    async fn all_validation_rules(&self) -> Result<Vec<ValidationRule>, IntakeError>;

    async fn save_validation_rule(&self, rule: &ValidationRule) -> Result<(), IntakeError>;
}

/// Aggregation level for `QualityRepository::quality_metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsLevel {
    /// Averages over every stored score. The key is ignored.
    Global,
    /// Dimensions of one entity's score, keyed by entity id.
    Entity,
}

impl fmt::Display for MetricsLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Entity => write!(f, "entity"),
        }
    }
}

impl FromStr for MetricsLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "entity" => Ok(Self::Entity),
            _ => Err(format!("Unknown aggregation level: {}", s)),
        }
    }
}

#[async_trait]
pub trait QualityRepository: Send + Sync {
    async fn save_quality_score(&self, score: &QualityScore) -> Result<(), IntakeError>;

    /// Latest score for the entity.
    async fn quality_score(&self, entity_id: &str) -> Result<QualityScore, IntakeError>;

    async fn save_validation_results(
        &self,
        entity_id: &str,
        results: &[ValidationResult],
    ) -> Result<(), IntakeError>;

    async fn validation_results(&self, entity_id: &str) -> Result<Vec<ValidationResult>, IntakeError>;

    async fn quality_metrics(
        &self,
        level: MetricsLevel,
        key: &str,
    ) -> Result<BTreeMap<String, f64>, IntakeError>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert or replace.
    async fn save_file_metadata(&self, file: &FileMetadata) -> Result<(), IntakeError>;

    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata, IntakeError>;

    async fn update_file_status(
        &self,
        file_id: &str,
        status: ProcessingStatus,
        error_message: Option<&str>,
    ) -> Result<(), IntakeError>;

    async fn pending_files(&self, limit: usize) -> Result<Vec<FileMetadata>, IntakeError>;
}

#[async_trait]
pub trait LineageRepository: Send + Sync {
    async fn record_lineage(&self, record: &LineageRecord) -> Result<(), IntakeError>;

    async fn lineage(&self, entity_id: &str) -> Result<Vec<LineageRecord>, IntakeError>;

    async fn source_lineage(&self, source_file_id: &str) -> Result<Vec<LineageRecord>, IntakeError>;
}
