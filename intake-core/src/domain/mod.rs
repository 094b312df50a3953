// intake-core/src/domain/mod.rs

pub mod entity;
pub mod error;
pub mod file;
pub mod lineage;
pub mod normalize;
pub mod ports;
pub mod quality;
pub mod validation;

// Convenience re-exports to keep imports short elsewhere
pub use error::DomainError;
