// intake-core/src/infrastructure/error.rs

use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(intake::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(intake::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(intake::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(intake::infra::config))]
    ConfigError(String),

    #[error("Pipeline configuration not found at '{0}'")]
    #[diagnostic(code(intake::infra::config_missing))]
    ConfigNotFound(String),

    // --- COLLABORATORS ---
    #[error("Storage Error: {0}")]
    #[diagnostic(code(intake::infra::storage))]
    Storage(String),

    #[error("Repository Error: {0}")]
    #[diagnostic(code(intake::infra::repository))]
    Repository(String),

    // --- DEADLINES ---
    #[error("Operation '{operation}' timed out after {after:?}")]
    #[diagnostic(
        code(intake::infra::timeout),
        help("Raise runtime.io_timeout_secs if the backend is legitimately slow.")
    )]
    Timeout { operation: String, after: Duration },

    #[error("Operation '{operation}' was cancelled")]
    #[diagnostic(code(intake::infra::cancelled))]
    Cancelled { operation: String },
}

// Config loading uses anyhow contexts, collapse them at the boundary
impl From<anyhow::Error> for InfrastructureError {
    fn from(err: anyhow::Error) -> Self {
        InfrastructureError::ConfigError(format!("{:#}", err))
    }
}
