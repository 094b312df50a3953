// intake-core/src/domain/quality/score.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    Completeness,
    Accuracy,
    Consistency,
    Timeliness,
    Uniqueness,
    Validity,
}

impl QualityDimension {
    /// Fixed ordering, also used to break ties in `lowest_dimension`.
    pub const ALL: [QualityDimension; 6] = [
        Self::Completeness,
        Self::Accuracy,
        Self::Consistency,
        Self::Timeliness,
        Self::Uniqueness,
        Self::Validity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completeness => "completeness",
            Self::Accuracy => "accuracy",
            Self::Consistency => "consistency",
            Self::Timeliness => "timeliness",
            Self::Uniqueness => "uniqueness",
            Self::Validity => "validity",
        }
    }
}

impl fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative importance of each dimension. Valid weights sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub completeness: f64,
    pub accuracy: f64,
    pub consistency: f64,
    pub timeliness: f64,
    pub uniqueness: f64,
    pub validity: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            completeness: 20.0,
            accuracy: 25.0,
            consistency: 20.0,
            timeliness: 10.0,
            uniqueness: 15.0,
            validity: 10.0,
        }
    }
}

impl QualityWeights {
    pub fn weight(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::Completeness => self.completeness,
            QualityDimension::Accuracy => self.accuracy,
            QualityDimension::Consistency => self.consistency,
            QualityDimension::Timeliness => self.timeliness,
            QualityDimension::Uniqueness => self.uniqueness,
            QualityDimension::Validity => self.validity,
        }
    }

    pub fn sum(&self) -> f64 {
        QualityDimension::ALL.iter().map(|d| self.weight(*d)).sum()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(d) = QualityDimension::ALL.iter().find(|d| self.weight(**d) < 0.0) {
            return Err(DomainError::business_rule(
                "quality_weights",
                format!("weight for {} cannot be negative", d),
            ));
        }
        let sum = self.sum();
        if sum != 100.0 {
            return Err(DomainError::business_rule(
                "quality_weights",
                format!("quality weights must sum to 100 (got {})", sum),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Excellent,
    Good,
    Poor,
    Critical,
}

impl QualityLevel {
    /// Thresholds are closed at the top: 90 is excellent, 70 good, 50 poor.
    pub fn from_score(overall: f64) -> Self {
        if overall >= 90.0 {
            Self::Excellent
        } else if overall >= 70.0 {
            Self::Good
        } else if overall >= 50.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Poor => "poor",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const REVIEW_THRESHOLD: f64 = 70.0;

/// Six dimension scores plus the weighted overall score for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub score_id: String,
    pub entity_id: String,
    pub completeness_score: f64,
    pub accuracy_score: f64,
    pub consistency_score: f64,
    pub timeliness_score: f64,
    pub uniqueness_score: f64,
    pub validity_score: f64,
    pub overall_score: f64,
    pub calculated_at: DateTime<Utc>,
}

impl QualityScore {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            score_id: Uuid::new_v4().to_string(),
            entity_id: entity_id.into(),
            completeness_score: 0.0,
            accuracy_score: 0.0,
            consistency_score: 0.0,
            timeliness_score: 0.0,
            uniqueness_score: 0.0,
            validity_score: 0.0,
            overall_score: 0.0,
            calculated_at: Utc::now(),
        }
    }

    pub fn dimension(&self, dimension: QualityDimension) -> f64 {
        match dimension {
            QualityDimension::Completeness => self.completeness_score,
            QualityDimension::Accuracy => self.accuracy_score,
            QualityDimension::Consistency => self.consistency_score,
            QualityDimension::Timeliness => self.timeliness_score,
            QualityDimension::Uniqueness => self.uniqueness_score,
            QualityDimension::Validity => self.validity_score,
        }
    }

    pub fn set_dimension(&mut self, dimension: QualityDimension, value: f64) {
        let slot = match dimension {
            QualityDimension::Completeness => &mut self.completeness_score,
            QualityDimension::Accuracy => &mut self.accuracy_score,
            QualityDimension::Consistency => &mut self.consistency_score,
            QualityDimension::Timeliness => &mut self.timeliness_score,
            QualityDimension::Uniqueness => &mut self.uniqueness_score,
            QualityDimension::Validity => &mut self.validity_score,
        };
        *slot = value;
    }

    pub fn with_dimension(mut self, dimension: QualityDimension, value: f64) -> Self {
        self.set_dimension(dimension, value);
        self
    }

    /// Σ(weight × dimension) / 100, stored as the overall score.
    pub fn calculate_overall(&mut self, weights: &QualityWeights) -> f64 {
        self.overall_score = QualityDimension::ALL
            .iter()
            .map(|d| weights.weight(*d) * self.dimension(*d))
            .sum::<f64>()
            / 100.0;
        self.overall_score
    }

    pub fn quality_level(&self) -> QualityLevel {
        QualityLevel::from_score(self.overall_score)
    }

    pub fn requires_review(&self) -> bool {
        self.overall_score < REVIEW_THRESHOLD
    }

    pub fn is_acceptable(&self) -> bool {
        !self.requires_review()
    }

    /// Minimum dimension, first one wins on ties.
    pub fn lowest_dimension(&self) -> (QualityDimension, f64) {
        let mut lowest = (QualityDimension::Completeness, self.completeness_score);
        for dimension in QualityDimension::ALL {
            let value = self.dimension(dimension);
            if value < lowest.1 {
                lowest = (dimension, value);
            }
        }
        lowest
    }

    /// Out-of-range scores are rejected, never clamped.
    pub fn validate(&self) -> Result<(), DomainError> {
        let named = QualityDimension::ALL
            .iter()
            .map(|d| (d.as_str(), self.dimension(*d)))
            .chain(std::iter::once(("overall", self.overall_score)));

        for (name, value) in named {
            if !(0.0..=100.0).contains(&value) {
                return Err(DomainError::field_validation(
                    name,
                    format!("quality score {} must be between 0 and 100 (got {})", name, value),
                ));
            }
        }
        Ok(())
    }
}
