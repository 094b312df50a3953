// intake-core/src/application/validation.rs

use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::context::RequestContext;
use crate::domain::entity::{Entity, FieldMetadata};
use crate::domain::validation::{ValidationEngine, ValidationRule, ValidationSummary};
use crate::error::IntakeError;
use crate::ports::{MetadataRepository, QualityRepository};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Validate entities against the field catalogue and rule set, optionally
/// recording the outcome in the quality store.
pub struct ValidateEntitiesUseCase {
    engine: ValidationEngine,
    metadata: Arc<dyn MetadataRepository>,
    quality: Option<Arc<dyn QualityRepository>>,
    concurrency: usize,
}

impl ValidateEntitiesUseCase {
    pub fn new(engine: ValidationEngine, metadata: Arc<dyn MetadataRepository>) -> Self {
        Self {
            engine,
            metadata,
            quality: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_quality_store(mut self, quality: Arc<dyn QualityRepository>) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn validate_entity(
        &self,
        ctx: &RequestContext,
        entity: &Entity,
    ) -> Result<ValidationSummary, IntakeError> {
        let (metadata, rules) = self.catalogue(ctx).await?;
        let summary = self.engine.validate_entity(entity, &metadata, &rules);
        self.record(ctx, &summary).await;
        Ok(summary)
    }

    /// One summary per entity, in input order. Only a catalogue lookup
    /// failure aborts the batch.
    #[instrument(skip_all, fields(entity_count = entities.len()))]
    pub async fn validate_batch(
        &self,
        ctx: &RequestContext,
        entities: &[Entity],
    ) -> Result<Vec<ValidationSummary>, IntakeError> {
        let (metadata, rules) = self.catalogue(ctx).await?;

        let summaries: Vec<ValidationSummary> = futures::stream::iter(entities)
            .map(|entity| {
                let metadata = &metadata;
                let rules = &rules;
                async move {
                    let summary = self.engine.validate_entity(entity, metadata, rules);
                    self.record(ctx, &summary).await;
                    summary
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let invalid = summaries.iter().filter(|s| !s.is_valid()).count();
        info!(
            validated = summaries.len(),
            invalid, "Batch validation completed"
        );
        Ok(summaries)
    }

    async fn catalogue(
        &self,
        ctx: &RequestContext,
    ) -> Result<(Vec<FieldMetadata>, Vec<ValidationRule>), IntakeError> {
        let metadata = ctx
            .run("metadata.all_field_metadata", self.metadata.all_field_metadata())
            .await?;
        let rules = ctx
            .run("metadata.all_validation_rules", self.metadata.all_validation_rules())
            .await?;
        Ok((metadata, rules))
    }

    async fn record(&self, ctx: &RequestContext, summary: &ValidationSummary) {
        let Some(quality) = &self.quality else {
            return;
        };
        if let Err(e) = ctx
            .run(
                "quality.save_validation_results",
                quality.save_validation_results(&summary.entity_id, &summary.results),
            )
            .await
        {
            warn!(entity_id = %summary.entity_id, error = %e, "Validation results not persisted");
        }
    }
}
