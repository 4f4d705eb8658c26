use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid max_attempts: {0}. Must be at least 1")]
    InvalidMaxAttempts(u32),

    #[error("Invalid drain_timeout_secs: {0}. Must be at least 1")]
    InvalidDrainTimeout(u64),

    #[error("Invalid health_check_interval_secs: {0}. Must be at least 1")]
    InvalidHealthCheckInterval(u64),

    #[error("Registry path cannot be empty")]
    EmptyRegistryPath,
}

/// Project config file, created by the operator
pub const PROJECT_CONFIG_FILE: &str = "autorename.yaml";

/// Optional machine-local overrides
pub const LOCAL_CONFIG_FILE: &str = "autorename.local.yaml";

/// Prefix of environment overrides; `__` separates nested keys
pub const ENV_PREFIX: &str = "AUTORENAME_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. autorename.yaml in the working directory
    /// 3. autorename.local.yaml (optional local overrides)
    /// 4. Environment variables (AUTORENAME_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(PROJECT_CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.pipeline.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.pipeline.max_attempts));
        }

        if config.supervisor.drain_timeout_secs == 0 {
            return Err(ConfigError::InvalidDrainTimeout(
                config.supervisor.drain_timeout_secs,
            ));
        }

        // tokio intervals panic on a zero period
        if config.supervisor.health_check_interval_secs == 0 {
            return Err(ConfigError::InvalidHealthCheckInterval(
                config.supervisor.health_check_interval_secs,
            ));
        }

        if config.registry.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRegistryPath);
        }

        Ok(())
    }
}
