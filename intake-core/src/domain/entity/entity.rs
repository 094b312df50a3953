// intake-core/src/domain/entity/entity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::value::FieldValue;
use crate::domain::error::DomainError;

pub type Attributes = BTreeMap<String, FieldValue>;

/// A normalized business record, identified by the value of its driving field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_id: String,
    pub driving_field_value: String,
    pub entity_type: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub source_file_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Entity {
    pub fn new(
        driving_field_value: impl Into<String>,
        entity_type: impl Into<String>,
        source_file_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let now = Utc::now();
        let entity = Self {
            entity_id: Uuid::new_v4().to_string(),
            driving_field_value: driving_field_value.into(),
            entity_type: entity_type.into(),
            attributes: Attributes::new(),
            source_file_id: source_file_id.into(),
            created_at: now,
            updated_at: now,
            is_active: true,
        };
        entity.validate()?;
        Ok(entity)
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.driving_field_value.trim().is_empty() {
            return Err(DomainError::validation(
                "driving field value cannot be empty",
            ));
        }
        if self.entity_type.trim().is_empty() {
            return Err(DomainError::validation("entity type cannot be empty"));
        }
        Ok(())
    }

    /// All required fields are present and non-null.
    pub fn is_complete<S: AsRef<str>>(&self, required_fields: &[S]) -> bool {
        required_fields.iter().all(|field| {
            self.attributes
                .get(field.as_ref())
                .is_some_and(|v| !v.is_null())
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&FieldValue> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.attributes.insert(key.into(), value.into());
        self.mark_updated();
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Overwrites this entity's attributes with `other`'s. Keys only present
    /// here are kept.
    pub fn merge_attributes(&mut self, other: &Entity) {
        for (key, value) in &other.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
        self.mark_updated();
    }

    pub fn mark_updated(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.mark_updated();
    }

    /// Soft delete. Entities are never physically removed by the core.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.mark_updated();
    }
}
