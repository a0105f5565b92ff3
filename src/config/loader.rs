//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, pull the shared secret
/// from the environment, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<GateConfig, ConfigError> {
    let content = match path {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };
    resolve_config(content.as_deref(), |name| std::env::var(name).ok())
}

/// Build a validated config from file content and an environment lookup.
///
/// `None` content means built-in defaults.
pub fn resolve_config<F>(content: Option<&str>, env: F) -> Result<GateConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: GateConfig = match content {
        Some(content) => toml::from_str(content)?,
        None => GateConfig::default(),
    };

    config.auth.api_key = env(&config.auth.api_key_env).filter(|key| !key.is_empty());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
