// intake-core/src/infrastructure/logging.rs

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter directive, e.g. `info` or `intake_core=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// One JSON object per event instead of compact text.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl LogSettings {
    /// `RUST_LOG` wins over the configured level when set.
    pub fn filter(&self) -> Result<EnvFilter, InfrastructureError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).map_err(|e| {
            InfrastructureError::ConfigError(format!("invalid log level '{}': {}", self.level, e))
        })
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(settings: &LogSettings) -> Result<(), InfrastructureError> {
    let filter = settings.filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if settings.json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer().compact().with_target(true)).try_init()
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}
