//! Configuration Loader
//!
//! Environment-aware loading of [`ResilienceConfig`]. Layers, lowest first:
//! the environment variant of the defaults, an optional TOML file, and
//! `BRIDGE_RESILIENCE__SECTION__FIELD` environment variables. File and
//! environment layers are read through the `config` crate and merged key by
//! key over the defaults, so a file only needs the fields it changes.

use super::error::{ConfigResult, ConfigurationError};
use super::ResilienceConfig;
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix for environment overrides, e.g. `BRIDGE_RESILIENCE__RECOVERY__MAX_RECOVERY_ATTEMPTS`
pub const ENV_PREFIX: &str = "BRIDGE_RESILIENCE";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

/// Default location of the shipped configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/resilience.toml";

/// Loaded and validated resilience configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: ResilienceConfig,
    environment: String,
    source_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    ///
    /// Reads `config/resilience.toml` when present; otherwise defaults plus
    /// environment overrides.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        let path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let path = path.exists().then_some(path);
        Self::build(path.as_deref(), &environment, Self::environment_source())
    }

    /// Load configuration from a specific file with explicit environment
    pub fn load_from(path: impl AsRef<Path>, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigurationError::config_file_not_found(path));
        }
        Self::build(Some(path), environment, Self::environment_source())
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(
        config: ResilienceConfig,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            source_path: None,
        }))
    }

    pub(crate) fn build(
        path: Option<&Path>,
        environment: &str,
        env_source: config::Environment,
    ) -> ConfigResult<Arc<ConfigManager>> {
        debug!(
            environment = environment,
            path = ?path,
            "Loading resilience configuration"
        );

        let defaults = ResilienceConfig::for_environment(environment);
        let mut merged = serde_json::to_value(&defaults)
            .map_err(|e| ConfigurationError::environment_config_error(environment, e))?;

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(env_source);

        let layered = builder.build().map_err(|e| match path {
            Some(path) => ConfigurationError::invalid_toml(path.display().to_string(), e),
            None => ConfigurationError::config_merge_error(e),
        })?;
        let overrides: Value = layered
            .try_deserialize()
            .map_err(ConfigurationError::config_merge_error)?;

        merge_values(&mut merged, overrides);

        let config: ResilienceConfig =
            serde_json::from_value(merged).map_err(ConfigurationError::config_merge_error)?;
        config.validate()?;

        info!(
            environment = environment,
            source = path.map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".into()),
            auto_recovery = config.recovery.auto_recovery_enabled,
            max_recovery_attempts = config.recovery.max_recovery_attempts,
            "✅ Resilience configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            source_path: path.map(Path::to_path_buf),
        }))
    }

    pub(crate) fn environment_source() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// File the configuration was read from, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Detect environment from `BRIDGE_ENV`, then `APP_ENV`, defaulting to development
    pub fn detect_environment() -> String {
        env::var("BRIDGE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }
}

/// Recursively overlay `overlay` onto `base`; objects merge, everything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
