// intake-core/src/infrastructure/config/pipeline.rs

use anyhow::Context;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::catalog::YamlCatalog;
use crate::domain::quality::{DEFAULT_FRESHNESS_DAYS, QualityWeights};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::logging::LogSettings;

pub const CONFIG_CANDIDATES: [&str; 2] = ["intake.yaml", "intake_project.yaml"];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    #[validate(length(min = 1, message = "pipeline name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_entity_type")]
    #[validate(length(min = 1, message = "entity type cannot be empty"))]
    pub entity_type: String,

    /// Overrides the driving field declared in the field catalogue.
    #[serde(default)]
    pub driving_field: Option<String>,

    #[serde(rename = "config-paths", default = "default_config_paths")]
    pub config_paths: Vec<String>,

    #[serde(rename = "storage-root", default = "default_storage_root")]
    pub storage_root: String,

    #[serde(default)]
    #[validate(nested)]
    pub quality: QualitySettings,

    #[serde(default)]
    #[validate(nested)]
    pub runtime: RuntimeSettings,

    #[serde(default)]
    pub logging: LogSettings,

    /// Hydrated from the satellite files, never read from the main file.
    #[serde(skip)]
    pub catalog: YamlCatalog,
}

fn default_entity_type() -> String {
    "entity".to_string()
}

fn default_config_paths() -> Vec<String> {
    vec!["config".to_string()]
}

fn default_storage_root() -> String {
    "data".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QualitySettings {
    #[serde(default)]
    pub weights: QualityWeights,

    #[serde(default = "default_freshness_days")]
    #[validate(range(
        min = 1,
        max = 36500,
        message = "freshness window must be between 1 and 36500 days"
    ))]
    pub freshness_days: i64,

    /// Who hears about entities that need a quality review.
    #[serde(default)]
    pub review_recipients: Vec<String>,
}

fn default_freshness_days() -> i64 {
    DEFAULT_FRESHNESS_DAYS
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            weights: QualityWeights::default(),
            freshness_days: DEFAULT_FRESHNESS_DAYS,
            review_recipients: Vec::new(),
        }
    }
}

impl QualitySettings {
    /// Out-of-range windows (only reachable when built in code) fall back to
    /// the default.
    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.freshness_days)
            .filter(|d| *d > chrono::Duration::zero())
            .unwrap_or_else(|| chrono::Duration::days(DEFAULT_FRESHNESS_DAYS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuntimeSettings {
    #[serde(default = "default_io_timeout")]
    pub io_timeout_secs: u64,

    #[serde(default = "default_batch_concurrency")]
    #[validate(range(min = 1, message = "batch concurrency must be at least 1"))]
    pub batch_concurrency: usize,
}

fn default_io_timeout() -> u64 {
    30
}

fn default_batch_concurrency() -> usize {
    8
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            io_timeout_secs: default_io_timeout(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

impl RuntimeSettings {
    /// `None` when the timeout is disabled (0).
    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_secs > 0).then(|| Duration::from_secs(self.io_timeout_secs))
    }
}

impl PipelineConfig {
    /// Driving field from the config, falling back to the catalogue.
    pub fn resolved_driving_field(&self) -> Option<&str> {
        self.driving_field
            .as_deref()
            .or_else(|| self.catalog.driving_field().map(|f| f.field_name.as_str()))
    }

    pub fn storage_root_in(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.storage_root)
    }
}

// --- LOADER ---

#[instrument(skip(project_dir))]
pub fn load_pipeline_config(project_dir: &Path) -> Result<PipelineConfig, InfrastructureError> {
    load_pipeline_config_with(project_dir, |key| std::env::var(key).ok())
}

/// Same as [`load_pipeline_config`] with an explicit environment lookup.
pub fn load_pipeline_config_with<F>(
    project_dir: &Path,
    env: F,
) -> Result<PipelineConfig, InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    // 1. Main file
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "Loading pipeline config");

    let mut config: PipelineConfig = load_fragment(&config_path)?;

    // 2. Satellites (a corrupt file stops everything)
    if let Some(config_folder) = config.config_paths.first() {
        let config_dir = project_dir.join(config_folder);
        if config_dir.exists() {
            config.catalog = YamlCatalog::load(&config_dir)?;
        }
    }

    // 3. Environment layer
    apply_env_overrides(&mut config, env);

    // 4. Invariants
    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(format!("{:?}: {}", config_path, e)))?;

    if let Err(e) = config.quality.weights.validate() {
        warn!(error = %e, "Invalid quality weights in config, using defaults");
        config.quality.weights = QualityWeights::default();
    }

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, CONFIG_CANDIDATES
    )))
}

/// Read one typed YAML document.
pub(crate) fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config fragment at {:?}", path))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML fragment at {:?}", path))
        .map_err(Into::into)
}

fn apply_env_overrides<F>(config: &mut PipelineConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = env("INTAKE_DRIVING_FIELD") {
        info!(old = ?config.driving_field, new = %val, "Overriding driving field via ENV");
        config.driving_field = Some(val);
    }
    if let Some(val) = env("INTAKE_STORAGE_ROOT") {
        info!(old = %config.storage_root, new = %val, "Overriding storage root via ENV");
        config.storage_root = val;
    }
    if let Some(val) = env("INTAKE_LOG_LEVEL") {
        info!(old = %config.logging.level, new = %val, "Overriding log level via ENV");
        config.logging.level = val;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn project(main: &str) -> anyhow::Result<TempDir> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("intake.yaml"), main)?;
        Ok(dir)
    }

    #[test]
    fn test_defaults_apply() -> anyhow::Result<()> {
        let dir = project("name: accounts\n")?;
        let config = load_pipeline_config_with(dir.path(), no_env)?;

        assert_eq!(config.entity_type, "entity");
        assert_eq!(config.config_paths, vec!["config"]);
        assert_eq!(config.storage_root, "data");
        assert_eq!(config.quality.weights, QualityWeights::default());
        assert_eq!(config.quality.freshness_days, 30);
        assert_eq!(config.runtime.batch_concurrency, 8);
        assert_eq!(config.runtime.io_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.logging.level, "info");
        assert!(config.catalog.is_empty());
        assert!(config.resolved_driving_field().is_none());
        Ok(())
    }

    #[test]
    fn test_missing_config_is_reported() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let err = load_pipeline_config_with(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, InfrastructureError::ConfigNotFound(_)));
        Ok(())
    }

    #[test]
    fn test_alternate_file_name_and_satellites() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("intake_project.yaml"),
            "name: accounts\nentity_type: account\nconfig-paths: [catalog]\n",
        )?;
        fs::create_dir(dir.path().join("catalog"))?;
        fs::write(
            dir.path().join("catalog/fields.yml"),
            "fields:\n  - field_name: account_id\n    field_type: string\n    is_driving_field: true\n",
        )?;

        let config = load_pipeline_config_with(dir.path(), no_env)?;
        assert_eq!(config.entity_type, "account");
        assert_eq!(config.catalog.fields.len(), 1);
        assert_eq!(config.resolved_driving_field(), Some("account_id"));
        Ok(())
    }

    #[test]
    fn test_env_overrides() -> anyhow::Result<()> {
        let dir = project("name: accounts\ndriving_field: code\n")?;
        let env: HashMap<&str, &str> = HashMap::from([
            ("INTAKE_DRIVING_FIELD", "account_id"),
            ("INTAKE_STORAGE_ROOT", "/srv/intake"),
            ("INTAKE_LOG_LEVEL", "debug"),
        ]);
        let config =
            load_pipeline_config_with(dir.path(), |k| env.get(k).map(|v| v.to_string()))?;

        assert_eq!(config.resolved_driving_field(), Some("account_id"));
        assert_eq!(config.storage_root, "/srv/intake");
        assert_eq!(config.logging.level, "debug");
        Ok(())
    }

    #[test]
    fn test_invalid_weights_fall_back_to_defaults() -> anyhow::Result<()> {
        let dir = project("name: accounts\nquality:\n  weights:\n    completeness: 90\n")?;
        let config = load_pipeline_config_with(dir.path(), no_env)?;
        assert_eq!(config.quality.weights, QualityWeights::default());
        Ok(())
    }

    #[test]
    fn test_structural_violations_are_errors() -> anyhow::Result<()> {
        let dir = project("name: accounts\nruntime:\n  batch_concurrency: 0\n")?;
        let err = load_pipeline_config_with(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, InfrastructureError::ConfigError(_)));

        let dir = project("name: ''\n")?;
        assert!(load_pipeline_config_with(dir.path(), no_env).is_err());
        Ok(())
    }

    #[test]
    fn test_huge_freshness_window_is_rejected() -> anyhow::Result<()> {
        let dir = project("name: accounts\nquality:\n  freshness_days: 9223372036854775807\n")?;
        let err = load_pipeline_config_with(dir.path(), no_env).unwrap_err();
        assert!(matches!(err, InfrastructureError::ConfigError(_)));

        let settings = QualitySettings {
            freshness_days: i64::MAX,
            ..Default::default()
        };
        assert_eq!(settings.freshness(), chrono::Duration::days(DEFAULT_FRESHNESS_DAYS));
        Ok(())
    }

    #[test]
    fn test_corrupt_satellite_stops_loading() -> anyhow::Result<()> {
        let dir = project("name: accounts\n")?;
        fs::create_dir(dir.path().join("config"))?;
        fs::write(dir.path().join("config/rules.yml"), "rules: {{{")?;
        assert!(load_pipeline_config_with(dir.path(), no_env).is_err());
        Ok(())
    }
}
