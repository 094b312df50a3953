// intake-core/src/domain/validation/mod.rs

pub mod engine;
pub mod expression;
pub mod result;
pub mod rule;

pub use engine::{CustomCheck, ValidationEngine};
pub use result::{ValidationResult, ValidationSummary};
pub use rule::{Severity, ValidationRule, ValidationRuleType};
