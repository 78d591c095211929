use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: {value}. Must be an http(s) URL")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Invalid timeout_secs: {0}. Must be between 1 and 300")]
    InvalidTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Drafts path cannot be empty")]
    EmptyDraftsPath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .flowgate/config.yaml (project config)
    /// 3. .flowgate/local.yaml (local overrides, optional)
    /// 4. Environment variables (FLOWGATE_* prefix, `__` between sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Layered providers without extraction; exposed for inspection in tests.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".flowgate/config.yaml"))
            .merge(Yaml::file(".flowgate/local.yaml"))
            .merge(Env::prefixed("FLOWGATE_").split("__"))
    }

    /// Load configuration from a specific file; environment still wins.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("FLOWGATE_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for (field, value) in [
            ("engine.gateway_url", &config.engine.gateway_url),
            ("engine.engine_url", &config.engine.engine_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    field,
                    value: value.clone(),
                });
            }
        }

        if !(1..=300).contains(&config.engine.timeout_secs) {
            return Err(ConfigError::InvalidTimeout(config.engine.timeout_secs));
        }

        if config.drafts.path.trim().is_empty() {
            return Err(ConfigError::EmptyDraftsPath);
        }

        if config.drafts.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.drafts.max_connections));
        }

        if config.drafts.session_id.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "drafts.session_id cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.tasks.actor.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed(
                "tasks.actor cannot be blank when set".to_string(),
            ));
        }

        Ok(())
    }
}
