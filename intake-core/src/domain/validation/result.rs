// intake-core/src/domain/validation/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rule::Severity;
use crate::domain::entity::FieldValue;

/// Outcome of applying one rule (or one built-in field check).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule_id: String,
    pub rule_name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
    pub severity: Severity,
    pub checked_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn new(
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        passed: bool,
        severity: Severity,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            passed,
            actual_value: None,
            expected_value: None,
            error_details: None,
            severity,
            checked_at: Utc::now(),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_details = Some(message.into());
        self
    }

    pub fn with_values(mut self, actual: FieldValue, expected: impl Into<String>) -> Self {
        self.actual_value = Some(actual);
        self.expected_value = Some(expected.into());
        self
    }
}

/// Aggregated pass/fail statistics for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub entity_id: String,
    pub total_rules: usize,
    pub passed_rules: usize,
    pub failed_rules: usize,
    pub warning_count: usize,
    pub error_count: usize,
    /// Percentage of passed results, 0 when nothing was checked.
    pub validation_rate: f64,
    pub results: Vec<ValidationResult>,
    pub validated_at: DateTime<Utc>,
}

impl ValidationSummary {
    pub fn new(entity_id: impl Into<String>, results: Vec<ValidationResult>) -> Self {
        let mut summary = Self {
            entity_id: entity_id.into(),
            total_rules: results.len(),
            passed_rules: 0,
            failed_rules: 0,
            warning_count: 0,
            error_count: 0,
            validation_rate: 0.0,
            results: Vec::new(),
            validated_at: Utc::now(),
        };

        for result in &results {
            if result.passed {
                summary.passed_rules += 1;
                continue;
            }
            summary.failed_rules += 1;
            match result.severity {
                Severity::Error => summary.error_count += 1,
                Severity::Warning => summary.warning_count += 1,
                Severity::Info => {}
            }
        }

        if summary.total_rules > 0 {
            summary.validation_rate =
                (summary.passed_rules as f64 / summary.total_rules as f64) * 100.0;
        }
        summary.results = results;
        summary
    }

    /// Warnings never block validity.
    pub fn is_valid(&self) -> bool {
        self.error_count == 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}
