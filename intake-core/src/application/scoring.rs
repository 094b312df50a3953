// intake-core/src/application/scoring.rs

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::context::RequestContext;
use crate::domain::entity::Entity;
use crate::domain::ports::QualityScorer;
use crate::domain::quality::{QualityContext, QualityDimension, QualityLevel, QualityScore, QualityWeights};
use crate::domain::validation::{ValidationResult, ValidationSummary};
use crate::error::IntakeError;
use crate::infrastructure::config::PipelineConfig;
use crate::ports::{EntityRepository, MetadataRepository, Notification, NotificationKind, Notifier, QualityRepository};

#[derive(Debug, Clone)]
pub struct ScoringSettings {
    pub weights: QualityWeights,
    pub freshness: chrono::Duration,
    pub review_recipients: Vec<String>,
    pub batch_concurrency: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: QualityWeights::default(),
            freshness: chrono::Duration::days(crate::domain::quality::DEFAULT_FRESHNESS_DAYS),
            review_recipients: Vec::new(),
            batch_concurrency: 8,
        }
    }
}

impl ScoringSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            weights: config.quality.weights,
            freshness: config.quality.freshness(),
            review_recipients: config.quality.review_recipients.clone(),
            batch_concurrency: config.runtime.batch_concurrency.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreRequest {
    pub entity: Entity,
    pub validation_summary: Option<ValidationSummary>,
    pub custom_weights: Option<QualityWeights>,
}

impl ScoreRequest {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            validation_summary: None,
            custom_weights: None,
        }
    }

    pub fn with_summary(mut self, summary: ValidationSummary) -> Self {
        self.validation_summary = Some(summary);
        self
    }

    pub fn with_weights(mut self, weights: QualityWeights) -> Self {
        self.custom_weights = Some(weights);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub score: QualityScore,
    pub quality_level: QualityLevel,
    pub requires_review: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub entity_id: String,
    pub response: Option<ScoreResponse>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub entity_id: String,
    pub overall_score: f64,
    pub quality_level: QualityLevel,
    pub requires_review: bool,
    pub calculated_at: DateTime<Utc>,
    pub dimensions: BTreeMap<String, f64>,
    pub validation_results: Vec<ValidationResult>,
    pub weakest_dimension: QualityDimension,
}

pub struct ScoreQualityUseCase {
    scorer: Arc<dyn QualityScorer>,
    metadata: Arc<dyn MetadataRepository>,
    quality: Arc<dyn QualityRepository>,
    entities: Option<Arc<dyn EntityRepository>>,
    notifier: Option<Arc<dyn Notifier>>,
    settings: ScoringSettings,
}

impl ScoreQualityUseCase {
    pub fn new(
        scorer: Arc<dyn QualityScorer>,
        metadata: Arc<dyn MetadataRepository>,
        quality: Arc<dyn QualityRepository>,
    ) -> Self {
        Self {
            scorer,
            metadata,
            quality,
            entities: None,
            notifier: None,
            settings: ScoringSettings::default(),
        }
    }

    /// Used to count stored entities sharing the driving value.
    pub fn with_entities(mut self, entities: Arc<dyn EntityRepository>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_settings(mut self, settings: ScoringSettings) -> Self {
        self.settings = settings;
        self
    }

    #[instrument(skip_all, fields(entity_id = %request.entity.entity_id))]
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        request: ScoreRequest,
    ) -> Result<ScoreResponse, IntakeError> {
        // 1. Catalogue
        let metadata = ctx
            .run("metadata.all_field_metadata", self.metadata.all_field_metadata())
            .await
            .inspect_err(|e| error!(error = %e, "Could not load field metadata"))?;
        let rules = ctx
            .run("metadata.all_validation_rules", self.metadata.all_validation_rules())
            .await
            .inspect_err(|e| error!(error = %e, "Could not load validation rules"))?;

        // 2. Weights
        let weights = self.resolve_weights(request.custom_weights);

        let entity = &request.entity;
        if let Some(summary) = &request.validation_summary
            && let Err(e) = ctx
                .run(
                    "quality.save_validation_results",
                    self.quality.save_validation_results(&entity.entity_id, &summary.results),
                )
                .await
        {
            warn!(error = %e, "Validation results not persisted");
        }

        let existing = self.existing_entities(ctx, entity).await;
        let quality_ctx = QualityContext::new(metadata, rules, weights)
            .with_summary(request.validation_summary)
            .with_existing(existing)
            .with_freshness(self.settings.freshness);

        // 3. Score, check ranges, persist
        let score = self.scorer.calculate_score(entity, &quality_ctx)?;
        score.validate()?;
        ctx.run("quality.save_quality_score", self.quality.save_quality_score(&score))
            .await
            .inspect_err(|e| error!(error = %e, "Could not persist quality score"))?;

        let quality_level = score.quality_level();
        let requires_review = score.requires_review();

        // 4. Observability
        let (weakest, weakest_value) = score.lowest_dimension();
        info!(
            overall = score.overall_score,
            level = %quality_level,
            requires_review,
            weakest_dimension = %weakest,
            weakest_score = weakest_value,
            "Quality score calculated"
        );

        if requires_review {
            self.notify_review(ctx, entity, &score);
        }

        Ok(ScoreResponse {
            score,
            quality_level,
            requires_review,
        })
    }

    /// Scores entities independently with bounded parallelism. Items keep input order.
    #[instrument(skip_all, fields(entity_count = entities.len()))]
    pub async fn score_batch(&self, ctx: &RequestContext, entities: Vec<Entity>) -> BatchReport {
        let total = entities.len();
        let items: Vec<BatchItem> = futures::stream::iter(entities)
            .map(|entity| async move {
                let entity_id = entity.entity_id.clone();
                match self.execute(ctx, ScoreRequest::new(entity)).await {
                    Ok(response) => BatchItem {
                        entity_id,
                        response: Some(response),
                        error: None,
                    },
                    Err(e) => {
                        warn!(entity_id = %entity_id, error = %e, "Entity scoring failed");
                        BatchItem {
                            entity_id,
                            response: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .buffered(self.settings.batch_concurrency.max(1))
            .collect()
            .await;

        let succeeded = items.iter().filter(|i| i.response.is_some()).count();
        let failed = total - succeeded;
        info!(total, succeeded, failed, "Batch scoring completed");

        BatchReport {
            total,
            succeeded,
            failed,
            items,
        }
    }

    /// Assemble the stored score and validation results. Nothing is recomputed.
    pub async fn quality_report(
        &self,
        ctx: &RequestContext,
        entity_id: &str,
    ) -> Result<QualityReport, IntakeError> {
        let score = ctx
            .run("quality.quality_score", self.quality.quality_score(entity_id))
            .await?;
        let validation_results = ctx
            .run("quality.validation_results", self.quality.validation_results(entity_id))
            .await?;

        let dimensions = QualityDimension::ALL
            .iter()
            .map(|d| (d.as_str().to_string(), score.dimension(*d)))
            .collect();

        Ok(QualityReport {
            entity_id: score.entity_id.clone(),
            overall_score: score.overall_score,
            quality_level: score.quality_level(),
            requires_review: score.requires_review(),
            calculated_at: score.calculated_at,
            dimensions,
            validation_results,
            weakest_dimension: score.lowest_dimension().0,
        })
    }

    fn resolve_weights(&self, custom: Option<QualityWeights>) -> QualityWeights {
        match custom {
            Some(weights) => match weights.validate() {
                Ok(()) => weights,
                Err(e) => {
                    warn!(error = %e, "Invalid custom weights, using defaults");
                    self.settings.weights
                }
            },
            None => self.settings.weights,
        }
    }

    async fn existing_entities(&self, ctx: &RequestContext, entity: &Entity) -> Vec<Entity> {
        let Some(entities) = &self.entities else {
            return Vec::new();
        };
        match ctx
            .run(
                "entities.find_by_driving_field",
                entities.find_by_driving_field(&entity.driving_field_value),
            )
            .await
        {
            Ok(found) => vec![found],
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Could not look up entities for uniqueness");
                Vec::new()
            }
        }
    }

    /// Delivery runs on its own task under a detached context, so neither
    /// its latency nor the request's cancellation reaches the caller.
    fn notify_review(&self, ctx: &RequestContext, entity: &Entity, score: &QualityScore) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        if self.settings.review_recipients.is_empty() {
            debug!("Review needed but no recipients configured");
            return;
        }

        let notification = Notification::new(
            NotificationKind::Email,
            format!("Quality review needed for {}", entity.driving_field_value),
            format!(
                "Entity {} scored {:.1} ({})",
                entity.entity_id,
                score.overall_score,
                score.quality_level()
            ),
            self.settings.review_recipients.clone(),
        )
        .with_data("entity_id", entity.entity_id.clone())
        .with_data("overall_score", score.overall_score);

        let ctx = ctx.detached();
        let entity_id = entity.entity_id.clone();
        tokio::spawn(async move {
            if let Err(e) = ctx.run("notifier.notify", notifier.notify(&notification)).await {
                warn!(entity_id = %entity_id, error = %e, "Review notification not delivered");
            }
        });
    }
}
