//! Configuration validation.
//!
//! Serde handles syntax; this pass checks semantics and reports every
//! problem at once rather than stopping at the first.

use std::collections::HashSet;
use thiserror::Error;
use url::Url;
use crate::config::schema::GatewayConfig;

/// Route segments owned by the gateway itself.
const RESERVED_SERVICE_NAMES: &[&str] = &["data", "status", "health"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one backend must be configured")]
    NoBackends,

    #[error("backend '{name}' has invalid url '{url}': {reason}")]
    InvalidBackendUrl { name: String, url: String, reason: String },

    #[error("backend url '{0}' is configured more than once")]
    DuplicateBackend(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{field} must start with '/', got '{value}'")]
    InvalidPath { field: &'static str, value: String },

    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    #[error("invalid webhook url '{0}'")]
    InvalidWebhookUrl(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends {
        match Url::parse(&backend.url) {
            Ok(url) if url.scheme() == "http" => {
                let normalized = url.as_str().trim_end_matches('/').to_string();
                if !seen.insert(normalized) {
                    errors.push(ValidationError::DuplicateBackend(backend.url.clone()));
                }
            }
            Ok(url) => errors.push(ValidationError::InvalidBackendUrl {
                name: backend.name.clone(),
                url: backend.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidBackendUrl {
                name: backend.name.clone(),
                url: backend.url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    let positive = [
        ("health_check.interval_ms", config.health_check.interval_ms),
        ("health_check.timeout_ms", config.health_check.timeout_ms),
        ("health_check.failure_threshold", u64::from(config.health_check.failure_threshold)),
        ("circuit_breaker.recovery_timeout_ms", config.circuit_breaker.recovery_timeout_ms),
        ("circuit_breaker.recovery_interval_ms", config.circuit_breaker.recovery_interval_ms),
        ("upstream.request_timeout_ms", config.upstream.request_timeout_ms),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(field));
        }
    }

    for (field, value) in [
        ("health_check.path", &config.health_check.path),
        ("upstream.data_path", &config.upstream.data_path),
    ] {
        if !value.starts_with('/') {
            errors.push(ValidationError::InvalidPath { field, value: value.clone() });
        }
    }

    for service in &config.upstream.services {
        if service.is_empty()
            || service.contains('/')
            || RESERVED_SERVICE_NAMES.contains(&service.as_str())
        {
            errors.push(ValidationError::InvalidServiceName(service.clone()));
        }
    }

    if let Some(webhook) = &config.notifier.webhook_url {
        if Url::parse(webhook).is_err() {
            errors.push(ValidationError::InvalidWebhookUrl(webhook.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
