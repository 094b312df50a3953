// intake-core/src/application/normalize.rs

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::context::RequestContext;
use super::lineage::LineageTracker;
use crate::domain::entity::Entity;
use crate::domain::file::ParsedData;
use crate::error::IntakeError;
use crate::ports::{DataNormalizer, EntityRepository, MetadataRepository};

pub const STEP_INSERT: &str = "normalize.insert";
pub const STEP_MERGE: &str = "normalize.merge";

#[derive(Debug, Clone)]
pub struct NormalizeRequest {
    pub parsed_data: ParsedData,
    /// Explicit driving field. `None` falls back to configuration, then detection.
    pub driving_field: Option<String>,
}

impl NormalizeRequest {
    pub fn new(parsed_data: ParsedData) -> Self {
        Self {
            parsed_data,
            driving_field: None,
        }
    }

    pub fn with_driving_field(mut self, field: impl Into<String>) -> Self {
        self.driving_field = Some(field.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeResponse {
    pub entities: Vec<Entity>,
    pub driving_field: String,
    pub normalized_count: usize,
}

#[derive(Debug, Clone)]
pub struct MergeReport {
    pub response: NormalizeResponse,
    /// Entities as stored after the merge, in input order. Merged rows carry
    /// the id of the entity they were merged into. Skipped rows are absent.
    pub entities: Vec<Entity>,
    pub merged_count: usize,
    pub new_count: usize,
    /// Entities whose persistence failed. They are logged, not fatal.
    pub skipped_count: usize,
}

enum Persisted {
    Inserted(Entity),
    Merged(Entity),
}

pub struct NormalizeDataUseCase {
    normalizer: Arc<dyn DataNormalizer>,
    metadata: Arc<dyn MetadataRepository>,
    entities: Arc<dyn EntityRepository>,
    lineage: Option<LineageTracker>,
}

impl NormalizeDataUseCase {
    pub fn new(
        normalizer: Arc<dyn DataNormalizer>,
        metadata: Arc<dyn MetadataRepository>,
        entities: Arc<dyn EntityRepository>,
    ) -> Self {
        Self {
            normalizer,
            metadata,
            entities,
            lineage: None,
        }
    }

    pub fn with_lineage(mut self, tracker: LineageTracker) -> Self {
        self.lineage = Some(tracker);
        self
    }

    /// Turn parsed records into validated entities. Nothing is persisted.
    #[instrument(skip_all, fields(file_id = %request.parsed_data.file_metadata.file_id))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: NormalizeRequest,
    ) -> Result<NormalizeResponse, IntakeError> {
        let data = &request.parsed_data;
        let driving_field = self
            .resolve_driving_field(ctx, data, request.driving_field.as_deref())
            .await?;
        info!(driving_field = %driving_field, records = data.record_count(), "Normalizing records");

        let entities = ctx
            .run("normalizer.normalize", self.normalizer.normalize(data, &driving_field))
            .await
            .inspect_err(|e| error!(error = %e, "Normalization failed"))?;

        ctx.run(
            "normalizer.validate",
            self.normalizer.validate_normalization(&entities),
        )
        .await
        .inspect_err(|e| error!(error = %e, "Normalized batch is invalid"))?;

        info!(normalized_count = entities.len(), "Normalization completed");
        Ok(NormalizeResponse {
            normalized_count: entities.len(),
            entities,
            driving_field,
        })
    }

    /// Normalize, then insert new entities and merge into existing ones.
    pub async fn normalize_and_merge(
        &self,
        ctx: &RequestContext,
        request: NormalizeRequest,
    ) -> Result<MergeReport, IntakeError> {
        let source_file_id = request.parsed_data.file_metadata.file_id.clone();
        let response = self.execute(ctx, request).await?;

        let mut merged_count = 0;
        let mut new_count = 0;
        let mut skipped_count = 0;
        let mut stored = Vec::with_capacity(response.entities.len());

        for entity in &response.entities {
            match self.persist(ctx, entity).await {
                Ok(Persisted::Inserted(saved)) => {
                    new_count += 1;
                    self.track(ctx, &saved, &source_file_id, STEP_INSERT).await;
                    stored.push(saved);
                }
                Ok(Persisted::Merged(saved)) => {
                    merged_count += 1;
                    self.track(ctx, &saved, &source_file_id, STEP_MERGE).await;
                    stored.push(saved);
                }
                Err(e) => {
                    skipped_count += 1;
                    error!(
                        driving_value = %entity.driving_field_value,
                        error = %e,
                        "Could not persist entity"
                    );
                }
            }
        }

        info!(merged_count, new_count, skipped_count, "Merge completed");
        Ok(MergeReport {
            response,
            entities: stored,
            merged_count,
            new_count,
            skipped_count,
        })
    }

    async fn resolve_driving_field(
        &self,
        ctx: &RequestContext,
        data: &ParsedData,
        explicit: Option<&str>,
    ) -> Result<String, IntakeError> {
        if let Some(field) = explicit.filter(|f| !f.trim().is_empty()) {
            return Ok(field.to_string());
        }

        let configured = ctx
            .run("metadata.driving_field", self.metadata.driving_field())
            .await?;
        if let Some(field) = configured {
            debug!(driving_field = %field.field_name, "Using configured driving field");
            return Ok(field.field_name);
        }

        ctx.run(
            "normalizer.detect_driving_field",
            self.normalizer.detect_driving_field(data),
        )
        .await
        .map_err(|e| {
            IntakeError::InternalError(format!(
                "no driving field given or configured, and detection failed: {}",
                e
            ))
        })
    }

    async fn persist(&self, ctx: &RequestContext, entity: &Entity) -> Result<Persisted, IntakeError> {
        let exists = ctx
            .run("entities.exists", self.entities.exists(&entity.driving_field_value))
            .await?;
        if exists {
            return self.merge(ctx, entity).await;
        }

        match ctx.run("entities.save", self.entities.save(entity)).await {
            Ok(()) => Ok(Persisted::Inserted(entity.clone())),
            // Another writer inserted the same driving value in between
            Err(e) if e.is_duplicate() => {
                warn!(driving_value = %entity.driving_field_value, "Insert lost a race, merging instead");
                self.merge(ctx, entity).await
            }
            Err(e) => Err(e),
        }
    }

    async fn merge(&self, ctx: &RequestContext, incoming: &Entity) -> Result<Persisted, IntakeError> {
        let mut existing = ctx
            .run(
                "entities.find_by_driving_field",
                self.entities.find_by_driving_field(&incoming.driving_field_value),
            )
            .await?;
        existing.merge_attributes(incoming);
        ctx.run("entities.update", self.entities.update(&existing))
            .await?;
        Ok(Persisted::Merged(existing))
    }

    async fn track(&self, ctx: &RequestContext, entity: &Entity, source_file_id: &str, step: &str) {
        let Some(tracker) = &self.lineage else {
            return;
        };
        let details = BTreeMap::from([
            ("driving_value".to_string(), json!(entity.driving_field_value)),
            ("attribute_count".to_string(), json!(entity.attribute_count())),
        ]);
        if let Err(e) = tracker
            .record(ctx, entity, Some(source_file_id), step, details)
            .await
        {
            warn!(entity_id = %entity.entity_id, error = %e, "Lineage not recorded");
        }
    }
}
