// intake-core/src/infrastructure/adapters/memory.rs
//
// Process-local repositories backed by `tokio::sync::RwLock`. Used by tests
// and by single-process deployments that do not need durability.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::entity::{Entity, FieldMetadata};
use crate::domain::error::DomainError;
use crate::domain::file::{FileMetadata, ProcessingStatus};
use crate::domain::lineage::LineageRecord;
use crate::domain::quality::{QualityDimension, QualityScore};
use crate::domain::validation::{ValidationResult, ValidationRule};
use crate::error::IntakeError;
use crate::ports::{
    EntityRepository, FileRepository, LineageRepository, MetadataRepository, MetricsLevel,
    QualityRepository,
};

// --- ENTITIES ---

/// Entity store keyed by id. At most one active entity per driving value.
#[derive(Debug, Default)]
pub struct InMemoryEntityRepository {
    entities: RwLock<HashMap<String, Entity>>,
}

impl InMemoryEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

#[async_trait]
impl EntityRepository for InMemoryEntityRepository {
    async fn save(&self, entity: &Entity) -> Result<(), IntakeError> {
        let mut entities = self.entities.write().await;

        // Checked under the write lock so two concurrent inserts cannot both pass
        let taken = entities.values().any(|e| {
            e.is_active && entity.is_active && e.driving_field_value == entity.driving_field_value
        });
        if taken || entities.contains_key(&entity.entity_id) {
            return Err(DomainError::duplicate(
                entity.entity_type.clone(),
                "driving_field_value",
                entity.driving_field_value.clone(),
            )
            .into());
        }

        entities.insert(entity.entity_id.clone(), entity.clone());
        debug!(entity_id = %entity.entity_id, "Entity saved");
        Ok(())
    }

    async fn find_by_id(&self, entity_id: &str) -> Result<Entity, IntakeError> {
        self.entities
            .read()
            .await
            .get(entity_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Entity", entity_id).into())
    }

    async fn find_by_driving_field(&self, driving_value: &str) -> Result<Entity, IntakeError> {
        self.entities
            .read()
            .await
            .values()
            .find(|e| e.is_active && e.driving_field_value == driving_value)
            .cloned()
            .ok_or_else(|| DomainError::not_found("Entity", driving_value).into())
    }

    async fn find_by_type(
        &self,
        entity_type: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entity>, IntakeError> {
        let entities = self.entities.read().await;
        let mut matching: Vec<&Entity> = entities
            .values()
            .filter(|e| e.is_active && e.entity_type == entity_type)
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update(&self, entity: &Entity) -> Result<(), IntakeError> {
        let mut entities = self.entities.write().await;

        let taken = entities.values().any(|e| {
            e.entity_id != entity.entity_id
                && e.is_active
                && entity.is_active
                && e.driving_field_value == entity.driving_field_value
        });
        if taken {
            return Err(DomainError::duplicate(
                entity.entity_type.clone(),
                "driving_field_value",
                entity.driving_field_value.clone(),
            )
            .into());
        }

        match entities.get_mut(&entity.entity_id) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(())
            }
            None => Err(DomainError::not_found("Entity", entity.entity_id.clone()).into()),
        }
    }

    async fn delete(&self, entity_id: &str) -> Result<(), IntakeError> {
        let mut entities = self.entities.write().await;
        match entities.get_mut(entity_id) {
            Some(entity) => {
                entity.deactivate();
                Ok(())
            }
            None => Err(DomainError::not_found("Entity", entity_id).into()),
        }
    }

    async fn exists(&self, driving_value: &str) -> Result<bool, IntakeError> {
        Ok(self
            .entities
            .read()
            .await
            .values()
            .any(|e| e.is_active && e.driving_field_value == driving_value))
    }
}

// --- METADATA ---

#[derive(Debug, Default)]
pub struct InMemoryMetadataRepository {
    fields: RwLock<BTreeMap<String, FieldMetadata>>,
    rules: RwLock<Vec<ValidationRule>>,
}

impl InMemoryMetadataRepository {
    pub fn new(fields: Vec<FieldMetadata>, rules: Vec<ValidationRule>) -> Self {
        let fields = fields
            .into_iter()
            .map(|f| (f.field_name.clone(), f))
            .collect();
        Self {
            fields: RwLock::new(fields),
            rules: RwLock::new(rules),
        }
    }
}

#[async_trait]
impl MetadataRepository for InMemoryMetadataRepository {
    async fn field_metadata(&self, field_name: &str) -> Result<FieldMetadata, IntakeError> {
        self.fields
            .read()
            .await
            .get(field_name)
            .cloned()
            .ok_or_else(|| DomainError::not_found("FieldMetadata", field_name).into())
    }

    async fn all_field_metadata(&self) -> Result<Vec<FieldMetadata>, IntakeError> {
        Ok(self
            .fields
            .read()
            .await
            .values()
            .filter(|f| f.is_active)
            .cloned()
            .collect())
    }

    async fn driving_field(&self) -> Result<Option<FieldMetadata>, IntakeError> {
        Ok(self
            .fields
            .read()
            .await
            .values()
            .find(|f| f.is_active && f.is_driving_field)
            .cloned())
    }

    async fn save_field_metadata(&self, metadata: &FieldMetadata) -> Result<(), IntakeError> {
        metadata.check()?;
        let mut stored = metadata.clone();
        stored.updated_at = Utc::now();
        self.fields
            .write()
            .await
            .insert(stored.field_name.clone(), stored);
        Ok(())
    }

    async fn validation_rules(&self, field_id: &str) -> Result<Vec<ValidationRule>, IntakeError> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.is_active && r.field_id.as_deref() == Some(field_id))
            .cloned()
            .collect())
    }

    async fn all_validation_rules(&self) -> Result<Vec<ValidationRule>, IntakeError> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn save_validation_rule(&self, rule: &ValidationRule) -> Result<(), IntakeError> {
        rule.check()?;
        let mut rules = self.rules.write().await;
        match rules.iter_mut().find(|r| r.rule_id == rule.rule_id) {
            Some(existing) => *existing = rule.clone(),
            None => rules.push(rule.clone()),
        }
        Ok(())
    }
}

// --- QUALITY ---

/// Keeps the latest score and the latest validation results per entity.
#[derive(Debug, Default)]
pub struct InMemoryQualityRepository {
    scores: RwLock<HashMap<String, QualityScore>>,
    results: RwLock<HashMap<String, Vec<ValidationResult>>>,
}

impl InMemoryQualityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn score_metrics(score: &QualityScore) -> BTreeMap<String, f64> {
    QualityDimension::ALL
        .iter()
        .map(|d| (d.as_str().to_string(), score.dimension(*d)))
        .chain(std::iter::once(("overall".to_string(), score.overall_score)))
        .collect()
}

#[async_trait]
impl QualityRepository for InMemoryQualityRepository {
    async fn save_quality_score(&self, score: &QualityScore) -> Result<(), IntakeError> {
        self.scores
            .write()
            .await
            .insert(score.entity_id.clone(), score.clone());
        Ok(())
    }

    async fn quality_score(&self, entity_id: &str) -> Result<QualityScore, IntakeError> {
        self.scores
            .read()
            .await
            .get(entity_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("QualityScore", entity_id).into())
    }

    async fn save_validation_results(
        &self,
        entity_id: &str,
        results: &[ValidationResult],
    ) -> Result<(), IntakeError> {
        self.results
            .write()
            .await
            .insert(entity_id.to_string(), results.to_vec());
        Ok(())
    }

    async fn validation_results(&self, entity_id: &str) -> Result<Vec<ValidationResult>, IntakeError> {
        Ok(self
            .results
            .read()
            .await
            .get(entity_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn quality_metrics(
        &self,
        level: MetricsLevel,
        key: &str,
    ) -> Result<BTreeMap<String, f64>, IntakeError> {
        let scores = self.scores.read().await;
        match level {
            MetricsLevel::Entity => scores
                .get(key)
                .map(score_metrics)
                .ok_or_else(|| DomainError::not_found("QualityScore", key).into()),
            MetricsLevel::Global => {
                if scores.is_empty() {
                    return Ok(BTreeMap::new());
                }
                let count = scores.len() as f64;
                let mut totals: BTreeMap<String, f64> = BTreeMap::new();
                for score in scores.values() {
                    for (name, value) in score_metrics(score) {
                        *totals.entry(name).or_default() += value;
                    }
                }
                let mut averages: BTreeMap<String, f64> =
                    totals.into_iter().map(|(k, v)| (k, v / count)).collect();
                averages.insert("entity_count".to_string(), count);
                Ok(averages)
            }
        }
    }
}

// --- FILES ---

#[derive(Debug, Default)]
pub struct InMemoryFileRepository {
    files: RwLock<HashMap<String, FileMetadata>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn save_file_metadata(&self, file: &FileMetadata) -> Result<(), IntakeError> {
        self.files
            .write()
            .await
            .insert(file.file_id.clone(), file.clone());
        Ok(())
    }

    async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata, IntakeError> {
        self.files
            .read()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("FileMetadata", file_id).into())
    }

    async fn update_file_status(
        &self,
        file_id: &str,
        status: ProcessingStatus,
        error_message: Option<&str>,
    ) -> Result<(), IntakeError> {
        let mut files = self.files.write().await;
        let file = files
            .get_mut(file_id)
            .ok_or_else(|| DomainError::not_found("FileMetadata", file_id))?;
        file.processing_status = status;
        file.error_message = error_message.map(str::to_string);
        if status.is_terminal() {
            file.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn pending_files(&self, limit: usize) -> Result<Vec<FileMetadata>, IntakeError> {
        let files = self.files.read().await;
        let mut pending: Vec<&FileMetadata> = files
            .values()
            .filter(|f| f.processing_status == ProcessingStatus::Pending)
            .collect();
        pending.sort_by_key(|f| f.upload_timestamp);
        Ok(pending.into_iter().take(limit).cloned().collect())
    }
}

// --- LINEAGE ---

#[derive(Debug, Default)]
pub struct InMemoryLineageRepository {
    records: RwLock<Vec<LineageRecord>>,
}

impl InMemoryLineageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LineageRepository for InMemoryLineageRepository {
    async fn record_lineage(&self, record: &LineageRecord) -> Result<(), IntakeError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn lineage(&self, entity_id: &str) -> Result<Vec<LineageRecord>, IntakeError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn source_lineage(&self, source_file_id: &str) -> Result<Vec<LineageRecord>, IntakeError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.source_file_id == source_file_id)
            .cloned()
            .collect())
    }
}
