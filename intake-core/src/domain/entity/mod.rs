// intake-core/src/domain/entity/mod.rs

#[allow(clippy::module_inception)]
pub mod entity;
pub mod field;
pub mod value;

pub use entity::{Attributes, Entity};
pub use field::{FieldMetadata, FieldType};
pub use value::FieldValue;
