// intake-core/src/domain/quality/scorer.rs

use chrono::{DateTime, Duration, Utc};

use super::score::{QualityDimension, QualityScore, QualityWeights};
use crate::domain::entity::{Entity, FieldMetadata};
use crate::domain::error::DomainError;
use crate::domain::ports::QualityScorer;
use crate::domain::validation::{ValidationEngine, ValidationRule, ValidationRuleType, ValidationSummary};

pub const DEFAULT_FRESHNESS_DAYS: i64 = 30;

/// Everything a scorer may look at besides the entity itself.
#[derive(Debug, Clone)]
pub struct QualityContext {
    pub metadata: Vec<FieldMetadata>,
    pub rules: Vec<ValidationRule>,
    pub weights: QualityWeights,
    /// Precomputed summary. When absent the scorer validates the entity itself.
    pub validation_summary: Option<ValidationSummary>,
    /// Entities already stored under the same driving value.
    pub existing_entities: Vec<Entity>,
    pub freshness: Duration,
    pub now: DateTime<Utc>,
}

impl QualityContext {
    pub fn new(metadata: Vec<FieldMetadata>, rules: Vec<ValidationRule>, weights: QualityWeights) -> Self {
        Self {
            metadata,
            rules,
            weights,
            validation_summary: None,
            existing_entities: Vec::new(),
            freshness: Duration::days(DEFAULT_FRESHNESS_DAYS),
            now: Utc::now(),
        }
    }

    pub fn with_summary(mut self, summary: Option<ValidationSummary>) -> Self {
        self.validation_summary = summary;
        self
    }

    pub fn with_existing(mut self, existing: Vec<Entity>) -> Self {
        self.existing_entities = existing;
        self
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn active_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.metadata.iter().filter(|m| m.is_active)
    }
}

/// Default scorer: each dimension is derived from metadata, rules and
/// timestamps only, with no external lookups.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedScorer {
    engine: ValidationEngine,
}

impl RuleBasedScorer {
    pub fn new(engine: ValidationEngine) -> Self {
        Self { engine }
    }

    /// Quality-weighted share of active fields that hold a value.
    pub fn completeness(&self, entity: &Entity, ctx: &QualityContext) -> f64 {
        let fields: Vec<&FieldMetadata> = ctx.active_fields().collect();
        if fields.is_empty() {
            return if entity.attribute_count() > 0 { 100.0 } else { 0.0 };
        }

        let populated = |m: &FieldMetadata| {
            entity
                .attribute(&m.field_name)
                .is_some_and(|v| !v.is_blank())
        };

        let total_weight: f64 = fields.iter().map(|m| m.quality_weight).sum();
        if total_weight > 0.0 {
            let filled: f64 = fields
                .iter()
                .filter(|m| populated(m))
                .map(|m| m.quality_weight)
                .sum();
            return filled / total_weight * 100.0;
        }

        let filled = fields.iter().filter(|m| populated(m)).count();
        filled as f64 / fields.len() as f64 * 100.0
    }

    pub fn accuracy(&self, entity: &Entity, ctx: &QualityContext) -> f64 {
        let computed;
        let summary = match &ctx.validation_summary {
            Some(summary) => summary,
            None => {
                computed = self.engine.validate_entity(entity, &ctx.metadata, &ctx.rules);
                &computed
            }
        };
        if summary.total_rules == 0 {
            100.0
        } else {
            summary.validation_rate
        }
    }

    /// Type conformance of populated fields plus entity-level consistency rules.
    pub fn consistency(&self, entity: &Entity, ctx: &QualityContext) -> f64 {
        let mut checks: Vec<bool> = ctx
            .active_fields()
            .filter_map(|m| {
                entity
                    .attribute(&m.field_name)
                    .filter(|v| !v.is_blank())
                    .map(|v| v.conforms_to(m.field_type))
            })
            .collect();

        checks.extend(
            ctx.rules
                .iter()
                .filter(|r| r.is_active && r.rule_type == ValidationRuleType::Consistency)
                .map(|r| self.engine.check_consistency(r, entity).passed),
        );

        share_passed(&checks)
    }

    /// Full marks inside the freshness window, linear decay to 0 at twice the window.
    pub fn timeliness(&self, entity: &Entity, ctx: &QualityContext) -> f64 {
        let age = ctx.now.signed_duration_since(entity.updated_at);
        if age <= ctx.freshness {
            return 100.0;
        }
        let window = ctx.freshness.num_milliseconds();
        if window <= 0 {
            return 0.0;
        }
        let overdue = (age - ctx.freshness).num_milliseconds() as f64;
        (100.0 * (1.0 - overdue / window as f64)).max(0.0)
    }

    pub fn uniqueness(&self, entity: &Entity, ctx: &QualityContext) -> f64 {
        let duplicates = ctx
            .existing_entities
            .iter()
            .filter(|other| {
                other.is_active
                    && other.entity_id != entity.entity_id
                    && other.driving_field_value == entity.driving_field_value
            })
            .count();
        100.0 / (1 + duplicates) as f64
    }

    /// Share of populated fields passing every metadata check.
    pub fn validity(&self, entity: &Entity, ctx: &QualityContext) -> f64 {
        let checks: Vec<bool> = ctx
            .active_fields()
            .filter_map(|m| {
                entity
                    .attribute(&m.field_name)
                    .filter(|v| !v.is_null())
                    .map(|v| self.engine.satisfies_metadata(v, m))
            })
            .collect();
        share_passed(&checks)
    }
}

fn share_passed(checks: &[bool]) -> f64 {
    if checks.is_empty() {
        return 100.0;
    }
    checks.iter().filter(|ok| **ok).count() as f64 / checks.len() as f64 * 100.0
}

impl QualityScorer for RuleBasedScorer {
    fn calculate_score(&self, entity: &Entity, ctx: &QualityContext) -> Result<QualityScore, DomainError> {
        let mut score = QualityScore::new(entity.entity_id.clone());
        for dimension in QualityDimension::ALL {
            let value = match dimension {
                QualityDimension::Completeness => self.completeness(entity, ctx),
                QualityDimension::Accuracy => self.accuracy(entity, ctx),
                QualityDimension::Consistency => self.consistency(entity, ctx),
                QualityDimension::Timeliness => self.timeliness(entity, ctx),
                QualityDimension::Uniqueness => self.uniqueness(entity, ctx),
                QualityDimension::Validity => self.validity(entity, ctx),
            };
            score.set_dimension(dimension, value);
        }
        score.calculate_overall(&ctx.weights);
        score.calculated_at = ctx.now;
        Ok(score)
    }
}
