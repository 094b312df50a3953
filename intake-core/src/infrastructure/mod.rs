// intake-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;

pub use logging::{LogSettings, init_tracing};
