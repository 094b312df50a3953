// intake-core/src/domain/lineage.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Audit entry linking an entity to the file and step that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageRecord {
    pub lineage_id: String,
    pub entity_id: String,
    pub source_file_id: String,
    pub transformation_step: String,
    pub transformation_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub transformation_details: BTreeMap<String, serde_json::Value>,
    pub performed_by: String,
}

impl LineageRecord {
    pub fn new(
        entity_id: impl Into<String>,
        source_file_id: impl Into<String>,
        transformation_step: impl Into<String>,
        performed_by: impl Into<String>,
    ) -> Self {
        Self {
            lineage_id: Uuid::new_v4().to_string(),
            entity_id: entity_id.into(),
            source_file_id: source_file_id.into(),
            transformation_step: transformation_step.into(),
            transformation_timestamp: Utc::now(),
            transformation_details: BTreeMap::new(),
            performed_by: performed_by.into(),
        }
    }

    pub fn with_details(mut self, details: BTreeMap<String, serde_json::Value>) -> Self {
        self.transformation_details = details;
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.transformation_details.insert(key.into(), value.into());
        self
    }
}
