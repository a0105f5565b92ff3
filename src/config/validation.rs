//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the backend URL is usable by a plain HTTP client
//! - Check the route prefix can be mounted on the router
//! - Refuse key-auth mode without a secret
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GateConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("backend.url {url:?} is invalid: {reason}")]
    BackendUrl { url: String, reason: String },

    #[error("route.prefix {0:?} must start and end with '/' and contain no '{{', '}}' or '*'")]
    RoutePrefix(String),

    #[error("auth.require_api_key is set but environment variable {0} is missing or empty")]
    MissingApiKey(String),

    #[error("auth.allowed_ips contains an empty entry")]
    EmptyAllowlistEntry,

    #[error("request_log.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Validate a fully loaded configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(reason) = check_backend_url(&config.backend.url) {
        errors.push(ValidationError::BackendUrl {
            url: config.backend.url.clone(),
            reason,
        });
    }

    if !is_valid_prefix(&config.route.prefix) {
        errors.push(ValidationError::RoutePrefix(config.route.prefix.clone()));
    }

    let has_key = config
        .auth
        .api_key
        .as_deref()
        .is_some_and(|key| !key.is_empty());
    if config.auth.require_api_key && !has_key {
        errors.push(ValidationError::MissingApiKey(
            config.auth.api_key_env.clone(),
        ));
    }

    if config.auth.allowed_ips.iter().any(|ip| ip.is_empty()) {
        errors.push(ValidationError::EmptyAllowlistEntry);
    }

    if config.request_log.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_backend_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

fn is_valid_prefix(prefix: &str) -> bool {
    prefix.starts_with('/')
        && prefix.ends_with('/')
        && !prefix.contains(['{', '}', '*'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_config() -> GateConfig {
        let mut config = GateConfig::default();
        config.auth.api_key = Some("s3cret".into());
        config
    }

    #[test]
    fn test_defaults_with_key_are_valid() {
        assert_eq!(validate_config(&keyed_config()), Ok(()));
    }

    #[test]
    fn test_missing_key_rejected_when_required() {
        let config = GateConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingApiKey("API_KEY".into())]);

        let mut config = GateConfig::default();
        config.auth.api_key = Some(String::new());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_key_allowed_when_not_required() {
        let mut config = GateConfig::default();
        config.auth.require_api_key = false;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_backend_url_checks() {
        let mut config = keyed_config();
        config.backend.url = "https://localhost:11434".into();
        assert!(matches!(
            validate_config(&config).unwrap_err()[0],
            ValidationError::BackendUrl { .. }
        ));

        config.backend.url = "not a url".into();
        assert!(validate_config(&config).is_err());

        config.backend.url = "http://10.0.0.2:11434/base".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = GateConfig::default();
        config.listener.bind_address = "localhost".into();
        config.route.prefix = "v1".into();
        config.auth.allowed_ips = vec!["1.2.3.4".into(), String::new()];
        config.request_log.max_body_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::EmptyAllowlistEntry));
        assert!(errors.contains(&ValidationError::ZeroBodyLimit));
    }

    #[test]
    fn test_prefix_rules() {
        assert!(is_valid_prefix("/"));
        assert!(is_valid_prefix("/v1/"));
        assert!(is_valid_prefix("/api/"));
        assert!(!is_valid_prefix("/v1"));
        assert!(!is_valid_prefix("v1/"));
        assert!(!is_valid_prefix("/{x}/"));
        assert!(!is_valid_prefix("/*/"));
    }
}
