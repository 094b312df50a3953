// intake-core/src/infrastructure/adapters/normalizer.rs

use async_trait::async_trait;

use crate::domain::entity::Entity;
use crate::domain::file::ParsedData;
use crate::domain::normalize::RecordNormalizer;
use crate::error::IntakeError;
use crate::ports::DataNormalizer;

#[async_trait]
impl DataNormalizer for RecordNormalizer {
    async fn normalize(&self, data: &ParsedData, driving_field: &str) -> Result<Vec<Entity>, IntakeError> {
        Ok(RecordNormalizer::normalize(self, data, driving_field)?)
    }

    async fn validate_normalization(&self, entities: &[Entity]) -> Result<(), IntakeError> {
        Ok(RecordNormalizer::validate_normalization(self, entities)?)
    }

    async fn detect_driving_field(&self, data: &ParsedData) -> Result<String, IntakeError> {
        Ok(RecordNormalizer::detect_driving_field(self, data)?)
    }
}
