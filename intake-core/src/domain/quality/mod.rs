// intake-core/src/domain/quality/mod.rs

pub mod score;
pub mod scorer;

pub use score::{QualityDimension, QualityLevel, QualityScore, QualityWeights, REVIEW_THRESHOLD};
pub use scorer::{DEFAULT_FRESHNESS_DAYS, QualityContext, RuleBasedScorer};
