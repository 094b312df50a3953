// intake-core/src/infrastructure/config/catalog.rs

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::pipeline::load_fragment;
use crate::domain::entity::FieldMetadata;
use crate::domain::validation::ValidationRule;
use crate::infrastructure::adapters::InMemoryMetadataRepository;
use crate::infrastructure::error::InfrastructureError;

pub const FIELDS_FILE: &str = "fields.yml";
pub const RULES_FILE: &str = "rules.yml";

/// Field metadata and validation rules declared in YAML next to the pipeline
/// config.
#[derive(Debug, Clone, Default)]
pub struct YamlCatalog {
    pub fields: Vec<FieldMetadata>,
    pub rules: Vec<ValidationRule>,
}

#[derive(Deserialize)]
struct FieldsWrapper {
    #[serde(default)]
    fields: Vec<FieldMetadata>,
}

#[derive(Deserialize)]
struct RulesWrapper {
    #[serde(default)]
    rules: Vec<ValidationRule>,
}

impl YamlCatalog {
    /// Missing files are an empty catalogue; a corrupt file is an error.
    pub fn load(config_dir: &Path) -> Result<Self, InfrastructureError> {
        let mut catalog = YamlCatalog::default();

        let fields_path = config_dir.join(FIELDS_FILE);
        if fields_path.exists() {
            let wrapper: FieldsWrapper = load_fragment(&fields_path)?;
            for mut field in wrapper.fields {
                if field.field_id.is_empty() {
                    field.field_id = field.field_name.clone();
                }
                if field.display_name.is_empty() {
                    field.display_name = field.field_name.clone();
                }
                field.check().map_err(|e| {
                    InfrastructureError::ConfigError(format!("{:?}: {}", fields_path, e))
                })?;
                catalog.fields.push(field);
            }
            info!(count = catalog.fields.len(), "Field catalogue loaded");
        }

        let rules_path = config_dir.join(RULES_FILE);
        if rules_path.exists() {
            let wrapper: RulesWrapper = load_fragment(&rules_path)?;
            for rule in wrapper.rules {
                rule.check().map_err(|e| {
                    InfrastructureError::ConfigError(format!(
                        "{:?}: rule '{}': {}",
                        rules_path, rule.rule_id, e
                    ))
                })?;
                catalog.rules.push(rule);
            }
            info!(count = catalog.rules.len(), "Validation rules loaded");
        }

        if catalog.fields.iter().filter(|f| f.is_driving_field).count() > 1 {
            return Err(InfrastructureError::ConfigError(format!(
                "{:?} declares more than one driving field",
                fields_path
            )));
        }

        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.rules.is_empty()
    }

    pub fn driving_field(&self) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.is_driving_field)
    }

    pub fn required_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_active && f.is_required)
            .map(|f| f.field_name.clone())
            .collect()
    }

    pub fn into_repository(self) -> InMemoryMetadataRepository {
        InMemoryMetadataRepository::new(self.fields, self.rules)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entity::FieldType;
    use crate::domain::validation::{Severity, ValidationRuleType};
    use crate::ports::MetadataRepository;
    use std::fs;

    const FIELDS: &str = r#"
fields:
  - field_name: account_id
    field_type: string
    is_driving_field: true
    is_required: true
    format_pattern: "^A[0-9]+$"
    quality_weight: 40
  - field_name: age
    display_name: Age
    field_type: integer
    min_value: 0
    max_value: 130
    quality_weight: 10
"#;

    const RULES: &str = r#"
rules:
  - rule_id: adult
    rule_name: Adult customers only
    rule_type: range
    field_id: age
    rule_expression: "18.."
    error_message: customer must be an adult
    severity: warning
"#;

    #[test]
    fn test_load_catalog() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(FIELDS_FILE), FIELDS)?;
        fs::write(dir.path().join(RULES_FILE), RULES)?;

        let catalog = YamlCatalog::load(dir.path())?;
        assert_eq!(catalog.fields.len(), 2);
        assert_eq!(catalog.fields[0].field_id, "account_id");
        assert_eq!(catalog.fields[0].display_name, "account_id");
        assert_eq!(catalog.fields[1].field_type, FieldType::Integer);
        assert_eq!(catalog.driving_field().unwrap().field_name, "account_id");
        assert_eq!(catalog.required_fields(), vec!["account_id".to_string()]);

        assert_eq!(catalog.rules[0].rule_type, ValidationRuleType::Range);
        assert_eq!(catalog.rules[0].severity, Severity::Warning);
        Ok(())
    }

    #[test]
    fn test_missing_files_yield_empty_catalog() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(YamlCatalog::load(dir.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_corrupt_or_invalid_files_are_errors() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(FIELDS_FILE), "fields: [ {")?;
        assert!(YamlCatalog::load(dir.path()).is_err());

        fs::write(
            dir.path().join(FIELDS_FILE),
            "fields:\n  - field_name: name\n    field_type: string\n    quality_weight: 150\n",
        )?;
        let err = YamlCatalog::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("quality weight"));

        fs::write(
            dir.path().join(FIELDS_FILE),
            "fields:\n  - field_name: name\n    field_type: money\n",
        )?;
        assert!(YamlCatalog::load(dir.path()).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_catalog_feeds_metadata_repository() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(FIELDS_FILE), FIELDS)?;
        let repo = YamlCatalog::load(dir.path())?.into_repository();
        assert_eq!(repo.driving_field().await?.unwrap().field_name, "account_id");
        Ok(())
    }
}
