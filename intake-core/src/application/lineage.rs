// intake-core/src/application/lineage.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::context::RequestContext;
use crate::domain::entity::Entity;
use crate::domain::lineage::LineageRecord;
use crate::error::IntakeError;
use crate::ports::LineageRepository;

pub const DEFAULT_ACTOR: &str = "intake";

/// Records which file and which step produced each entity state.
#[derive(Clone)]
pub struct LineageTracker {
    repository: Arc<dyn LineageRepository>,
    performed_by: String,
}

impl LineageTracker {
    pub fn new(repository: Arc<dyn LineageRepository>) -> Self {
        Self {
            repository,
            performed_by: DEFAULT_ACTOR.to_string(),
        }
    }

    pub fn performed_by(mut self, actor: impl Into<String>) -> Self {
        self.performed_by = actor.into();
        self
    }

    /// `source_file_id` defaults to the entity's own source file.
    pub async fn record(
        &self,
        ctx: &RequestContext,
        entity: &Entity,
        source_file_id: Option<&str>,
        step: &str,
        details: BTreeMap<String, serde_json::Value>,
    ) -> Result<LineageRecord, IntakeError> {
        let record = LineageRecord::new(
            entity.entity_id.clone(),
            source_file_id.unwrap_or(&entity.source_file_id),
            step,
            self.performed_by.clone(),
        )
        .with_details(details);

        ctx.run("lineage.record", self.repository.record_lineage(&record))
            .await?;
        debug!(entity_id = %entity.entity_id, step, "Lineage recorded");
        Ok(record)
    }

    pub async fn trail(&self, ctx: &RequestContext, entity_id: &str) -> Result<Vec<LineageRecord>, IntakeError> {
        let mut records = ctx
            .run("lineage.trail", self.repository.lineage(entity_id))
            .await?;
        records.sort_by_key(|r| r.transformation_timestamp);
        Ok(records)
    }

    pub async fn source_trail(
        &self,
        ctx: &RequestContext,
        source_file_id: &str,
    ) -> Result<Vec<LineageRecord>, IntakeError> {
        let mut records = ctx
            .run("lineage.source_trail", self.repository.source_lineage(source_file_id))
            .await?;
        records.sort_by_key(|r| r.transformation_timestamp);
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::InMemoryLineageRepository;

    #[tokio::test]
    async fn test_record_and_read_back() -> anyhow::Result<()> {
        let tracker =
            LineageTracker::new(Arc::new(InMemoryLineageRepository::new())).performed_by("nightly-import");
        let ctx = RequestContext::new();
        let entity = Entity::new("A1", "account", "file-1")?;

        let details = BTreeMap::from([("row".to_string(), serde_json::json!(1))]);
        let first = tracker.record(&ctx, &entity, None, "normalize.insert", details).await?;
        tracker
            .record(&ctx, &entity, Some("file-2"), "normalize.merge", BTreeMap::new())
            .await?;

        assert_eq!(first.performed_by, "nightly-import");
        assert_eq!(first.source_file_id, "file-1");

        let trail = tracker.trail(&ctx, &entity.entity_id).await?;
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].transformation_step, "normalize.insert");

        let from_second = tracker.source_trail(&ctx, "file-2").await?;
        assert_eq!(from_second.len(), 1);
        assert_eq!(from_second[0].transformation_step, "normalize.merge");
        Ok(())
    }
}
