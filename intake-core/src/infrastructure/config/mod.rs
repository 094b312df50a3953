// intake-core/src/infrastructure/config/mod.rs

pub mod catalog;
pub mod pipeline;

pub use catalog::YamlCatalog;
pub use pipeline::{
    PipelineConfig, QualitySettings, RuntimeSettings, load_pipeline_config,
    load_pipeline_config_with,
};
