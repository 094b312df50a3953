// intake-core/src/domain/validation/rule.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRuleType {
    Format,
    Range,
    Reference,
    Custom,
    Consistency,
}

impl ValidationRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Range => "range",
            Self::Reference => "reference",
            Self::Custom => "custom",
            Self::Consistency => "consistency",
        }
    }
}

impl fmt::Display for ValidationRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValidationRuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "format" => Ok(Self::Format),
            "range" => Ok(Self::Range),
            "reference" => Ok(Self::Reference),
            "custom" => Ok(Self::Custom),
            "consistency" => Ok(Self::Consistency),
            _ => Err(format!("Unknown rule type: {}", s)),
        }
    }
}

// Declaration order gives Info < Warning < Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Only error-severity failures block an entity.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// A named business rule applied to one field, or to the whole entity for
/// consistency rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub rule_id: String,
    pub rule_name: String,
    pub rule_type: ValidationRuleType,
    /// Target `FieldMetadata::field_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub rule_expression: String,
    pub error_message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl ValidationRule {
    pub fn new(
        rule_id: impl Into<String>,
        rule_type: ValidationRuleType,
        rule_expression: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        let rule_id = rule_id.into();
        Self {
            rule_name: rule_id.clone(),
            rule_id,
            rule_type,
            field_id: None,
            rule_expression: rule_expression.into(),
            error_message: error_message.into(),
            severity: Severity::Error,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn for_field(mut self, field_id: impl Into<String>) -> Self {
        self.field_id = Some(field_id.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn check(&self) -> Result<(), DomainError> {
        if self.rule_name.trim().is_empty() {
            return Err(DomainError::validation("rule name cannot be empty"));
        }
        if self.rule_expression.trim().is_empty() {
            return Err(DomainError::validation("rule expression cannot be empty"));
        }
        if self.error_message.trim().is_empty() {
            return Err(DomainError::validation("error message cannot be empty"));
        }
        Ok(())
    }

    pub fn is_blocking_error(&self) -> bool {
        self.severity.is_blocking()
    }
}
