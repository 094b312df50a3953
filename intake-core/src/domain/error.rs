// intake-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Validation failed: {message}")]
    #[diagnostic(code(intake::domain::validation))]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Parsing failed at row {row}, column '{column}': {message}")]
    #[diagnostic(
        code(intake::domain::parsing),
        help("Row-level parse problems are normally attached to the parsed data, not raised.")
    )]
    Parsing {
        message: String,
        row: usize,
        column: String,
    },

    #[error("Business rule '{rule}' violated: {message}")]
    #[diagnostic(code(intake::domain::business_rule))]
    BusinessRule { message: String, rule: String },

    #[error("{entity_type} with ID {id} not found")]
    #[diagnostic(code(intake::domain::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("duplicate {entity_type} found: {field} = {value}")]
    #[diagnostic(
        code(intake::domain::duplicate),
        help("The driving field must identify a single entity.")
    )]
    Duplicate {
        entity_type: String,
        field: String,
        value: String,
    },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn field_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn business_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::BusinessRule {
            message: message.into(),
            rule: rule.into(),
        }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        DomainError::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}
