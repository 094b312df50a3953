// intake-core/src/domain/ports/scorer.rs

use crate::domain::entity::Entity;
use crate::domain::error::DomainError;
use crate::domain::quality::{QualityContext, QualityScore};

/// Computes the six dimension scores and the overall score for an entity.
///
/// Pure domain service: anything it needs from storage arrives through the
/// `QualityContext`.
pub trait QualityScorer: Send + Sync {
    fn calculate_score(&self, entity: &Entity, ctx: &QualityContext) -> Result<QualityScore, DomainError>;

    fn calculate_batch_scores(
        &self,
        entities: &[Entity],
        ctx: &QualityContext,
    ) -> Result<Vec<QualityScore>, DomainError> {
        entities
            .iter()
            .map(|entity| self.calculate_score(entity, ctx))
            .collect()
    }
}
