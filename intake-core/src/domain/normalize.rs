// intake-core/src/domain/normalize.rs

use std::collections::HashSet;
use tracing::debug;

use crate::domain::entity::Entity;
use crate::domain::error::DomainError;
use crate::domain::file::ParsedData;

/// Turns parsed records into entities keyed by a driving field.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    entity_type: String,
    required_fields: Vec<String>,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new("entity")
    }
}

impl RecordNormalizer {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            required_fields: Vec::new(),
        }
    }

    /// Fields every normalized entity must populate.
    pub fn with_required_fields(mut self, fields: Vec<String>) -> Self {
        self.required_fields = fields;
        self
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn normalize(&self, data: &ParsedData, driving_field: &str) -> Result<Vec<Entity>, DomainError> {
        if !data.headers.is_empty() && !data.headers.iter().any(|h| h == driving_field) {
            return Err(DomainError::field_validation(
                driving_field,
                format!("driving field '{}' is not a column of the parsed data", driving_field),
            ));
        }

        let mut entities = Vec::with_capacity(data.record_count());
        for (index, record) in data.records().iter().enumerate() {
            let row = index + 1;
            let driving_value = record
                .get(driving_field)
                .filter(|v| !v.is_blank())
                .map(|v| v.to_string().trim().to_string())
                .ok_or_else(|| {
                    DomainError::field_validation(
                        driving_field,
                        format!("record {} has no value for driving field '{}'", row, driving_field),
                    )
                })?;

            let entity = Entity::new(
                driving_value,
                self.entity_type.clone(),
                data.file_metadata.file_id.clone(),
            )?
            .with_attributes(record.clone());
            entities.push(entity);
        }

        debug!(
            driving_field,
            entity_count = entities.len(),
            "Records normalized"
        );
        Ok(entities)
    }

    pub fn validate_normalization(&self, entities: &[Entity]) -> Result<(), DomainError> {
        let mut seen = HashSet::with_capacity(entities.len());
        for entity in entities {
            entity.validate()?;

            if !seen.insert(entity.driving_field_value.as_str()) {
                return Err(DomainError::duplicate(
                    entity.entity_type.clone(),
                    "driving_field_value",
                    entity.driving_field_value.clone(),
                ));
            }

            if let Some(missing) = self.required_fields.iter().find(|field| {
                entity
                    .attribute(field)
                    .is_none_or(|v| v.is_blank())
            }) {
                return Err(DomainError::field_validation(
                    missing.clone(),
                    format!(
                        "entity {} is missing required field '{}'",
                        entity.driving_field_value, missing
                    ),
                ));
            }
        }
        Ok(())
    }

    /// First column, in header order, whose values are present and distinct in
    /// every record. Identifier-like column names are tried first.
    pub fn detect_driving_field(&self, data: &ParsedData) -> Result<String, DomainError> {
        if data.record_count() == 0 {
            return Err(DomainError::validation(
                "cannot detect a driving field without records",
            ));
        }

        let (preferred, others): (Vec<&String>, Vec<&String>) =
            data.headers.iter().partition(|h| looks_like_identifier(h));

        preferred
            .into_iter()
            .chain(others)
            .find(|header| is_unique_key(data, header))
            .cloned()
            .ok_or_else(|| {
                DomainError::validation("no column has a unique, non-empty value in every record")
            })
    }
}

fn looks_like_identifier(header: &str) -> bool {
    let name = header.trim().to_lowercase();
    name == "id"
        || ["_id", "_key", "_number", "_code"]
            .iter()
            .any(|suffix| name.ends_with(suffix))
}

fn is_unique_key(data: &ParsedData, header: &str) -> bool {
    let mut seen = HashSet::with_capacity(data.record_count());
    data.column(header).all(|value| match value {
        Some(v) if !v.is_blank() => seen.insert(v.to_string()),
        _ => false,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entity::FieldValue;
    use crate::domain::file::{FileFormat, FileMetadata, Record};

    fn parsed(headers: &[&str], rows: &[&[(&str, FieldValue)]]) -> ParsedData {
        let file = FileMetadata::new("accounts.csv", "uploads/accounts.csv", 128, FileFormat::Csv);
        let mut data = ParsedData::new(file, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            let record: Record = row.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
            data.add_record(record);
        }
        data
    }

    #[test]
    fn test_normalize_keys_entities_by_driving_value() {
        let data = parsed(
            &["account_id", "name"],
            &[
                &[("account_id", "A1".into()), ("name", "Alice".into())],
                &[("account_id", 42.into()), ("name", "Bob".into())],
            ],
        );
        let normalizer = RecordNormalizer::new("account");
        let entities = normalizer.normalize(&data, "account_id").unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].driving_field_value, "A1");
        assert_eq!(entities[1].driving_field_value, "42");
        assert_eq!(entities[0].entity_type, "account");
        assert_eq!(entities[0].source_file_id, data.file_metadata.file_id);
        assert_eq!(entities[0].attribute("name"), Some(&FieldValue::from("Alice")));
        assert!(entities[0].attribute("account_id").is_some());
    }

    #[test]
    fn test_blank_driving_value_names_the_row() {
        let data = parsed(
            &["account_id"],
            &[&[("account_id", "A1".into())], &[("account_id", "  ".into())]],
        );
        let err = RecordNormalizer::default().normalize(&data, "account_id").unwrap_err();
        assert!(err.to_string().contains("record 2"));
    }

    #[test]
    fn test_unknown_driving_column_rejected() {
        let data = parsed(&["name"], &[&[("name", "Alice".into())]]);
        assert!(RecordNormalizer::default().normalize(&data, "account_id").is_err());
    }

    #[test]
    fn test_validate_normalization_rejects_duplicates() {
        let data = parsed(
            &["code"],
            &[&[("code", "X".into())], &[("code", "X".into())]],
        );
        let normalizer = RecordNormalizer::default();
        let entities = normalizer.normalize(&data, "code").unwrap();
        let err = normalizer.validate_normalization(&entities).unwrap_err();
        assert!(matches!(err, DomainError::Duplicate { .. }));
    }

    #[test]
    fn test_validate_normalization_checks_required_fields() {
        let data = parsed(
            &["code", "name"],
            &[&[("code", "X".into()), ("name", FieldValue::Null)]],
        );
        let normalizer = RecordNormalizer::default().with_required_fields(vec!["name".into()]);
        let entities = normalizer.normalize(&data, "code").unwrap();
        assert!(normalizer.validate_normalization(&entities).is_err());
    }

    #[test]
    fn test_detect_prefers_identifier_columns() {
        let data = parsed(
            &["name", "customer_number", "city"],
            &[
                &[("name", "Alice".into()), ("customer_number", 1.into()), ("city", "Paris".into())],
                &[("name", "Bob".into()), ("customer_number", 2.into()), ("city", "Paris".into())],
            ],
        );
        let detected = RecordNormalizer::default().detect_driving_field(&data).unwrap();
        assert_eq!(detected, "customer_number");
    }

    #[test]
    fn test_detect_falls_back_to_first_unique_column() {
        let data = parsed(
            &["city", "name"],
            &[
                &[("city", "Paris".into()), ("name", "Alice".into())],
                &[("city", "Paris".into()), ("name", "Bob".into())],
            ],
        );
        assert_eq!(RecordNormalizer::default().detect_driving_field(&data).unwrap(), "name");
    }

    #[test]
    fn test_detect_fails_without_candidate() {
        let data = parsed(
            &["city"],
            &[&[("city", "Paris".into())], &[("city", "Paris".into())]],
        );
        assert!(RecordNormalizer::default().detect_driving_field(&data).is_err());

        let empty = parsed(&["id"], &[]);
        assert!(RecordNormalizer::default().detect_driving_field(&empty).is_err());
    }
}
