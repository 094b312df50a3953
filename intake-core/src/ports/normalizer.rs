// intake-core/src/ports/normalizer.rs

use async_trait::async_trait;

use crate::domain::entity::Entity;
use crate::domain::file::ParsedData;
use crate::error::IntakeError;

#[async_trait]
pub trait DataNormalizer: Send + Sync {
    /// One entity per record, keyed by the value of `driving_field`.
    async fn normalize(&self, data: &ParsedData, driving_field: &str) -> Result<Vec<Entity>, IntakeError>;

    /// Batch-level checks over freshly normalized entities.
    async fn validate_normalization(&self, entities: &[Entity]) -> Result<(), IntakeError>;

    async fn detect_driving_field(&self, data: &ParsedData) -> Result<String, IntakeError>;
}
