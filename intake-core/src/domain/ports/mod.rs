// intake-core/src/domain/ports/mod.rs

pub mod scorer;

pub use scorer::QualityScorer;
