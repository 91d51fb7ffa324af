//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the storage gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The fixed set of storage backends.
    pub backends: Vec<BackendConfig>,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Circuit breaker recovery settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Outbound request settings (data fetch and proxy).
    pub upstream: UpstreamConfig,

    /// Inbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Alert delivery settings.
    pub notifier: NotifierConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Storage backend definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackendConfig {
    /// Backend identifier for logs.
    pub name: String,

    /// Base URL (e.g., "http://storage_service_1:5000").
    pub url: String,
}

impl BackendConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

fn default_backends() -> Vec<BackendConfig> {
    (1..=3)
        .map(|i| BackendConfig::new(
            format!("storage_service_{}", i),
            format!("http://storage_service_{}:5000", i),
        ))
        .collect()
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Interval between health check cycles in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path to probe on each backend.
    pub path: String,

    /// Consecutive probe failures before the circuit opens.
    pub failure_threshold: u32,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            timeout_ms: 2_000,
            path: "/health".to_string(),
            failure_threshold: 3,
        }
    }
}

/// Circuit breaker recovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Time an open circuit waits before its half-open trial, in milliseconds.
    pub recovery_timeout_ms: u64,

    /// How often the recovery prober scans for open circuits, in milliseconds.
    pub recovery_interval_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_millis(self.recovery_timeout_ms)
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_interval_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            recovery_timeout_ms: 30_000,
            recovery_interval_ms: 10_000,
        }
    }
}

/// Outbound request configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Path fetched on the selected backend for `GET /data`.
    pub data_path: String,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// Retries after a connection failure (0 disables).
    pub connect_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Maximum inbound body forwarded by the proxy route.
    pub max_body_bytes: usize,

    /// Service names accepted by `/{service}/{*path}`.
    pub services: Vec<String>,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            data_path: "/data".to_string(),
            request_timeout_ms: 2_000,
            connect_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 2_000,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            services: vec!["service1".to_string()],
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for an inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Alert delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Enable isolation/recovery alerts.
    pub enabled: bool,

    /// Webhook receiving `{subject, body}` JSON. Alerts are logged when unset.
    pub webhook_url: Option<String>,

    /// Webhook delivery timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            timeout_ms: 5_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

// An explicit empty backend list is rejected by validation.
impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backends: default_backends(),
            health_check: HealthCheckConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            upstream: UpstreamConfig::default(),
            timeouts: TimeoutConfig::default(),
            notifier: NotifierConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_gateway_constants() {
        let config = GatewayConfig::default();
        assert_eq!(config.backends.len(), 3);
        assert_eq!(config.backends[0].url, "http://storage_service_1:5000");
        assert_eq!(config.health_check.failure_threshold, 3);
        assert_eq!(config.health_check.interval(), Duration::from_secs(10));
        assert_eq!(config.health_check.timeout(), Duration::from_secs(2));
        assert_eq!(config.circuit_breaker.recovery_timeout(), Duration::from_secs(30));
        assert_eq!(config.upstream.request_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[backends]]
            name = "a"
            url = "http://127.0.0.1:5001"

            [health_check]
            interval_ms = 500

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.backends, vec![BackendConfig::new("a", "http://127.0.0.1:5001")]);
        assert_eq!(config.health_check.interval_ms, 500);
        assert_eq!(config.health_check.timeout_ms, 2_000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.upstream.services, vec!["service1".to_string()]);
    }
}
