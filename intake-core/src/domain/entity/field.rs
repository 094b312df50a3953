// intake-core/src/domain/entity/field.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Decimal,
    Date,
    Boolean,
    Json,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "decimal" => Ok(Self::Decimal),
            "date" => Ok(Self::Date),
            "boolean" => Ok(Self::Boolean),
            "json" => Ok(Self::Json),
            _ => Err(format!("invalid field type: {}", s)),
        }
    }
}

/// Schema definition of one entity attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FieldMetadata {
    #[serde(default)]
    pub field_id: String,
    #[validate(length(min = 1, message = "field name cannot be empty"))]
    pub field_name: String,
    #[validate(length(min = 1, message = "display name cannot be empty"))]
    #[serde(default)]
    pub display_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_driving_field: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Regex the value's string form must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub business_rules: BTreeMap<String, serde_json::Value>,
    #[validate(range(min = 0.0, max = 100.0, message = "quality weight must be between 0 and 100"))]
    #[serde(default)]
    pub quality_weight: f64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl FieldMetadata {
    /// Minimal active, optional field. The field id defaults to the name.
    pub fn new(field_name: impl Into<String>, field_type: FieldType) -> Self {
        let field_name = field_name.into();
        let now = Utc::now();
        Self {
            field_id: field_name.clone(),
            display_name: field_name.clone(),
            field_name,
            field_type,
            description: String::new(),
            is_required: false,
            is_driving_field: false,
            default_value: None,
            format_pattern: None,
            min_value: None,
            max_value: None,
            max_length: None,
            allowed_values: Vec::new(),
            business_rules: BTreeMap::new(),
            quality_weight: 0.0,
            created_at: now,
            updated_at: now,
            created_by: String::new(),
            is_active: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn driving(mut self) -> Self {
        self.is_driving_field = true;
        self.is_required = true;
        self
    }

    pub fn weighted(mut self, quality_weight: f64) -> Self {
        self.quality_weight = quality_weight;
        self
    }

    /// Structural check of the definition itself (not of a value).
    pub fn check(&self) -> Result<(), DomainError> {
        self.validate().map_err(|errors| {
            let message = errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .collect::<Vec<_>>()
                .join("; ");
            DomainError::field_validation(self.field_name.clone(), message)
        })
    }

    pub fn has_enum_values(&self) -> bool {
        !self.allowed_values.is_empty()
    }

    pub fn has_range_validation(&self) -> bool {
        self.min_value.is_some() || self.max_value.is_some()
    }

    pub fn has_length_validation(&self) -> bool {
        self.max_length.is_some()
    }
}
