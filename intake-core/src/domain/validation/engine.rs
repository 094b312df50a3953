// intake-core/src/domain/validation/engine.rs

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::expression::{Comparison, NumericRange, reference_set};
use super::result::{ValidationResult, ValidationSummary};
use super::rule::{Severity, ValidationRule, ValidationRuleType};
use crate::domain::entity::{Entity, FieldMetadata, FieldType, FieldValue};

/// Predicate backing a `custom` rule, looked up by the rule expression.
pub type CustomCheck = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// Applies field metadata constraints and validation rules to attribute values.
///
/// Never fails: a malformed rule or a dangling field reference becomes a failed
/// result in the returned set.
#[derive(Clone, Default)]
pub struct ValidationEngine {
    custom_checks: HashMap<String, CustomCheck>,
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.custom_checks.keys().collect();
        names.sort();
        f.debug_struct("ValidationEngine")
            .field("custom_checks", &names)
            .finish()
    }
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_custom<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        self.custom_checks.insert(name.into(), Arc::new(check));
    }

    pub fn with_custom<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        self.register_custom(name, check);
        self
    }

    /// Validate one value against its metadata and the active rules that
    /// target the field. Consistency rules need the whole entity and are left
    /// to [`ValidationEngine::validate_entity`].
    pub fn validate_field(
        &self,
        field_name: &str,
        value: &FieldValue,
        metadata: &FieldMetadata,
        rules: &[ValidationRule],
    ) -> Vec<ValidationResult> {
        if value.is_null() {
            if metadata.is_required {
                return vec![
                    ValidationResult::new(
                        format!("{}.required", metadata.field_id),
                        format!("{} is required", field_name),
                        false,
                        Severity::Error,
                    )
                    .with_error(format!("required field {} cannot be null", field_name)),
                ];
            }
            return Vec::new();
        }

        let mut results = self.builtin_checks(field_name, value, metadata);

        for rule in rules.iter().filter(|r| {
            r.is_active
                && r.rule_type != ValidationRuleType::Consistency
                && r.field_id.as_deref() == Some(metadata.field_id.as_str())
        }) {
            results.push(self.apply_rule(rule, value));
        }

        results
    }

    /// Run every active field and rule against the entity.
    pub fn validate_entity(
        &self,
        entity: &Entity,
        metadata: &[FieldMetadata],
        rules: &[ValidationRule],
    ) -> ValidationSummary {
        let mut results = Vec::new();

        for field in metadata.iter().filter(|m| m.is_active) {
            let value = entity
                .attribute(&field.field_name)
                .cloned()
                .unwrap_or_default();
            results.extend(self.validate_field(&field.field_name, &value, field, rules));
        }

        let known_fields: HashSet<&str> = metadata.iter().map(|m| m.field_id.as_str()).collect();

        for rule in rules.iter().filter(|r| r.is_active) {
            if rule.rule_type == ValidationRuleType::Consistency {
                results.push(self.check_consistency(rule, entity));
                continue;
            }
            match rule.field_id.as_deref() {
                None => results.push(rule_failure(rule, "rule has no target field")),
                Some(id) if !known_fields.contains(id) => results.push(rule_failure(
                    rule,
                    format!("rule references unknown field '{}'", id),
                )),
                // Evaluated above through validate_field (or the field is inactive)
                Some(_) => {}
            }
        }

        ValidationSummary::new(entity.entity_id.clone(), results)
    }

    /// Checks derived from the metadata itself: type, enum, length, range and
    /// format pattern. Emitted with error severity.
    pub fn builtin_checks(
        &self,
        field_name: &str,
        value: &FieldValue,
        metadata: &FieldMetadata,
    ) -> Vec<ValidationResult> {
        let id = &metadata.field_id;
        let mut results = Vec::new();

        let conforms = value.conforms_to(metadata.field_type);
        let mut type_check = ValidationResult::new(
            format!("{}.type", id),
            format!("{} type", field_name),
            conforms,
            Severity::Error,
        )
        .with_values(value.clone(), metadata.field_type.as_str());
        if !conforms {
            type_check = type_check.with_error(format!(
                "value of type {} does not conform to {}",
                value.type_name(),
                metadata.field_type
            ));
        }
        results.push(type_check);

        if metadata.has_enum_values() {
            let text = value.to_string();
            let passed = metadata.allowed_values.iter().any(|allowed| *allowed == text);
            let mut check = ValidationResult::new(
                format!("{}.allowed_values", id),
                format!("{} allowed values", field_name),
                passed,
                Severity::Error,
            )
            .with_values(value.clone(), metadata.allowed_values.join(","));
            if !passed {
                check = check.with_error(format!(
                    "value {} not in allowed values for field {}",
                    text, field_name
                ));
            }
            results.push(check);
        }

        if let (Some(max), FieldType::String, Some(text)) =
            (metadata.max_length, metadata.field_type, value.as_str())
        {
            let length = text.chars().count();
            let passed = length <= max;
            let mut check = ValidationResult::new(
                format!("{}.max_length", id),
                format!("{} max length", field_name),
                passed,
                Severity::Error,
            )
            .with_values(value.clone(), max.to_string());
            if !passed {
                check = check.with_error(format!(
                    "value length {} exceeds max length {} for field {}",
                    length, max, field_name
                ));
            }
            results.push(check);
        }

        if metadata.has_range_validation() {
            let range = NumericRange {
                min: metadata.min_value,
                max: metadata.max_value,
            };
            let check = ValidationResult::new(
                format!("{}.range", id),
                format!("{} range", field_name),
                false,
                Severity::Error,
            )
            .with_values(value.clone(), range.to_string());
            results.push(match value.as_f64() {
                Some(n) if range.contains(n) => ValidationResult { passed: true, ..check },
                Some(n) => check.with_error(format!(
                    "value {} outside range {} for field {}",
                    n, range, field_name
                )),
                None => check.with_error(format!("value for field {} is not numeric", field_name)),
            });
        }

        if let Some(pattern) = metadata.format_pattern.as_deref() {
            let check = ValidationResult::new(
                format!("{}.format", id),
                format!("{} format", field_name),
                false,
                Severity::Error,
            )
            .with_values(value.clone(), pattern);
            results.push(match Regex::new(pattern) {
                Ok(re) if re.is_match(&value.to_string()) => {
                    ValidationResult { passed: true, ..check }
                }
                Ok(_) => check.with_error(format!(
                    "value does not match pattern {} for field {}",
                    pattern, field_name
                )),
                Err(e) => check.with_error(format!("invalid format pattern: {}", e)),
            });
        }

        results
    }

    /// True when every built-in metadata check passes for the value.
    pub fn satisfies_metadata(&self, value: &FieldValue, metadata: &FieldMetadata) -> bool {
        self.builtin_checks(&metadata.field_name, value, metadata)
            .iter()
            .all(|r| r.passed)
    }

    fn apply_rule(&self, rule: &ValidationRule, value: &FieldValue) -> ValidationResult {
        if let Err(e) = rule.check() {
            return rule_failure(rule, e.to_string());
        }

        let outcome: Result<bool, String> = match rule.rule_type {
            ValidationRuleType::Format => Regex::new(&rule.rule_expression)
                .map(|re| re.is_match(&value.to_string()))
                .map_err(|e| format!("invalid format expression: {}", e)),
            ValidationRuleType::Range => {
                rule.rule_expression
                    .parse::<NumericRange>()
                    .and_then(|range| match value.as_f64() {
                        Some(n) => Ok(range.contains(n)),
                        None => Err(format!("value {} is not numeric", value)),
                    })
            }
            ValidationRuleType::Reference => {
                let text = value.to_string();
                Ok(reference_set(&rule.rule_expression).contains(&text.as_str()))
            }
            ValidationRuleType::Custom => match self.custom_checks.get(&rule.rule_expression) {
                Some(check) => Ok(check(value)),
                None => Err(format!("unknown custom check '{}'", rule.rule_expression)),
            },
            ValidationRuleType::Consistency => {
                Err("consistency rules apply to whole entities".to_string())
            }
        };

        let result = ValidationResult::new(
            rule.rule_id.clone(),
            rule.rule_name.clone(),
            false,
            rule.severity,
        )
        .with_values(value.clone(), rule.rule_expression.clone());

        match outcome {
            Ok(true) => ValidationResult { passed: true, ..result },
            Ok(false) => result.with_error(rule.error_message.clone()),
            Err(problem) => result.with_error(problem),
        }
    }

    /// Evaluate a `<field> <op> <field>` rule against two attributes of the entity.
    pub fn check_consistency(&self, rule: &ValidationRule, entity: &Entity) -> ValidationResult {
        if let Err(e) = rule.check() {
            return rule_failure(rule, e.to_string());
        }
        let comparison = match rule.rule_expression.parse::<Comparison>() {
            Ok(c) => c,
            Err(problem) => return rule_failure(rule, problem),
        };

        let left = entity.attribute(&comparison.left).filter(|v| !v.is_null());
        let right = entity.attribute(&comparison.right).filter(|v| !v.is_null());

        let result = ValidationResult::new(
            rule.rule_id.clone(),
            rule.rule_name.clone(),
            false,
            rule.severity,
        );

        match (left, right) {
            // Like a SQL CHECK constraint, a missing operand is not a violation
            (None, _) | (_, None) => ValidationResult { passed: true, ..result },
            (Some(l), Some(r)) if comparison.holds(l, r) => {
                ValidationResult { passed: true, ..result }
            }
            (Some(l), Some(_)) => result
                .with_values(l.clone(), rule.rule_expression.clone())
                .with_error(rule.error_message.clone()),
        }
    }
}

fn rule_failure(rule: &ValidationRule, problem: impl Into<String>) -> ValidationResult {
    ValidationResult::new(rule.rule_id.clone(), rule.rule_name.clone(), false, rule.severity)
        .with_error(problem)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entity_with(attrs: &[(&str, FieldValue)]) -> Entity {
        let mut entity = Entity::new("A1", "account", "file-1").unwrap();
        for (k, v) in attrs {
            entity.set_attribute(*k, v.clone());
        }
        entity
    }

    #[test]
    fn test_null_optional_field_passes_trivially() {
        let engine = ValidationEngine::new();
        let field = FieldMetadata::new("nickname", FieldType::String);
        let results = engine.validate_field("nickname", &FieldValue::Null, &field, &[]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_null_required_field_fails_with_error() {
        let engine = ValidationEngine::new();
        let field = FieldMetadata::new("name", FieldType::String).required();
        let results = engine.validate_field("name", &FieldValue::Null, &field, &[]);
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert_eq!(results[0].severity, Severity::Error);
    }

    #[test]
    fn test_allowed_values_compare_as_strings() {
        let engine = ValidationEngine::new();
        let mut field = FieldMetadata::new("tier", FieldType::Integer);
        field.allowed_values = vec!["1".into(), "2".into()];

        let ok = engine.validate_field("tier", &FieldValue::from(2), &field, &[]);
        assert!(ok.iter().all(|r| r.passed));

        let bad = engine.validate_field("tier", &FieldValue::from(3), &field, &[]);
        let failed: Vec<_> = bad.iter().filter(|r| !r.passed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].rule_id, "tier.allowed_values");
    }

    #[test]
    fn test_max_length_counts_characters() {
        let engine = ValidationEngine::new();
        let mut field = FieldMetadata::new("code", FieldType::String);
        field.max_length = Some(3);

        assert!(engine.satisfies_metadata(&FieldValue::from("éèà"), &field));
        assert!(!engine.satisfies_metadata(&FieldValue::from("abcd"), &field));
    }

    #[test]
    fn test_metadata_range_and_pattern() {
        let engine = ValidationEngine::new();
        let mut age = FieldMetadata::new("age", FieldType::Integer);
        age.min_value = Some(0.0);
        age.max_value = Some(130.0);
        assert!(engine.satisfies_metadata(&FieldValue::from(30), &age));
        assert!(!engine.satisfies_metadata(&FieldValue::from(131), &age));

        let mut iban = FieldMetadata::new("iban", FieldType::String);
        iban.format_pattern = Some("^[A-Z]{2}[0-9]{2}".into());
        assert!(engine.satisfies_metadata(&FieldValue::from("FR76300"), &iban));
        assert!(!engine.satisfies_metadata(&FieldValue::from("76FR"), &iban));

        iban.format_pattern = Some("([".into());
        let results = engine.builtin_checks("iban", &FieldValue::from("FR76"), &iban);
        let format = results.iter().find(|r| r.rule_id == "iban.format").unwrap();
        assert!(!format.passed);
        assert!(format.error_details.as_deref().unwrap().contains("invalid format pattern"));
    }

    #[test]
    fn test_rules_by_type() {
        let engine = ValidationEngine::new().with_custom("even", |v| {
            v.as_f64().is_some_and(|n| n % 2.0 == 0.0)
        });
        let field = FieldMetadata::new("qty", FieldType::Integer);
        let rules = vec![
            ValidationRule::new("range", ValidationRuleType::Range, "1..10", "bad qty").for_field("qty"),
            ValidationRule::new("ref", ValidationRuleType::Reference, "2,4,6", "bad ref").for_field("qty"),
            ValidationRule::new("custom", ValidationRuleType::Custom, "even", "odd").for_field("qty"),
            ValidationRule::new("fmt", ValidationRuleType::Format, "^[0-9]+$", "digits").for_field("qty"),
            ValidationRule::new("other", ValidationRuleType::Range, "0..1", "x").for_field("price"),
        ];

        let pass = engine.validate_field("qty", &FieldValue::from(4), &field, &rules);
        // type check + four rules targeting qty
        assert_eq!(pass.len(), 5);
        assert!(pass.iter().all(|r| r.passed));

        let fail = engine.validate_field("qty", &FieldValue::from(11), &field, &rules);
        let failed: Vec<&str> = fail.iter().filter(|r| !r.passed).map(|r| r.rule_id.as_str()).collect();
        assert_eq!(failed, vec!["range", "ref", "custom"]);
    }

    #[test]
    fn test_malformed_rules_fail_locally() {
        let engine = ValidationEngine::new();
        let field = FieldMetadata::new("qty", FieldType::Integer);
        let rules = vec![
            ValidationRule::new("bad_range", ValidationRuleType::Range, "ten..", "x").for_field("qty"),
            ValidationRule::new("bad_regex", ValidationRuleType::Format, "(", "x").for_field("qty"),
            ValidationRule::new("no_custom", ValidationRuleType::Custom, "missing", "x").for_field("qty"),
        ];

        let results = engine.validate_field("qty", &FieldValue::from(5), &field, &rules);
        let failed: Vec<_> = results.iter().filter(|r| !r.passed).collect();
        assert_eq!(failed.len(), 3);
        assert!(failed.iter().all(|r| r.error_details.is_some()));
    }

    #[test]
    fn test_inactive_rules_are_ignored() {
        let engine = ValidationEngine::new();
        let field = FieldMetadata::new("qty", FieldType::Integer);
        let mut rule = ValidationRule::new("r", ValidationRuleType::Range, "0..1", "x").for_field("qty");
        rule.is_active = false;
        let results = engine.validate_field("qty", &FieldValue::from(5), &field, &[rule]);
        assert!(results.iter().all(|r| r.passed));
    }

    #[test]
    fn test_validate_entity_aggregates() {
        let engine = ValidationEngine::new();
        let metadata = vec![
            FieldMetadata::new("name", FieldType::String).required(),
            FieldMetadata::new("age", FieldType::Integer),
            FieldMetadata::new("email", FieldType::String).required(),
        ];
        let rules = vec![
            ValidationRule::new("adult", ValidationRuleType::Range, "18..", "minor")
                .for_field("age")
                .with_severity(Severity::Warning),
            ValidationRule::new("ghost", ValidationRuleType::Format, ".*", "x").for_field("phone"),
            ValidationRule::new("orphan", ValidationRuleType::Format, ".*", "x"),
        ];
        let entity = entity_with(&[("name", "Bob".into()), ("age", 12.into())]);

        let summary = engine.validate_entity(&entity, &metadata, &rules);

        // name.type, age.type, adult, email.required, ghost, orphan
        assert_eq!(summary.total_rules, 6);
        assert_eq!(summary.passed_rules, 2);
        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.error_count, 3);
        assert!(!summary.is_valid());
        assert_eq!(summary.entity_id, entity.entity_id);
    }

    #[test]
    fn test_consistency_rules() {
        let engine = ValidationEngine::new();
        let rule = ValidationRule::new(
            "dates",
            ValidationRuleType::Consistency,
            "opened_on <= closed_on",
            "closed before opened",
        );

        let ok = entity_with(&[("opened_on", "2023-01-01".into()), ("closed_on", "2024-01-01".into())]);
        assert!(engine.validate_entity(&ok, &[], &[rule.clone()]).is_valid());

        let bad = entity_with(&[("opened_on", "2025-01-01".into()), ("closed_on", "2024-01-01".into())]);
        let summary = engine.validate_entity(&bad, &[], &[rule.clone()]);
        assert_eq!(summary.error_count, 1);
        assert_eq!(
            summary.results[0].error_details.as_deref(),
            Some("closed before opened")
        );

        let open = entity_with(&[("opened_on", "2025-01-01".into())]);
        assert!(engine.validate_entity(&open, &[], &[rule]).is_valid());

        let garbled = ValidationRule::new("g", ValidationRuleType::Consistency, "a ~ b", "x");
        assert!(!engine.validate_entity(&ok, &[], &[garbled]).is_valid());
    }
}
