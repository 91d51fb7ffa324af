//! Gateway error taxonomy.
//!
//! Probe failures are absorbed by the circuit breaker; request-path failures
//! fall back to the response cache. Only the proxy route surfaces these
//! errors to clients directly.

use thiserror::Error;

/// Errors from outbound calls to a backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Backend unreachable (connection refused, DNS, reset).
    #[error("connection to {backend} failed: {message}")]
    ConnectionFailure { backend: String, message: String },

    /// Probe or request exceeded its bound.
    #[error("request to {backend} timed out after {timeout_ms} ms")]
    Timeout { backend: String, timeout_ms: u64 },

    /// Backend answered with a non-2xx status.
    #[error("{backend} responded with status {status}")]
    UpstreamError { backend: String, status: u16 },

    /// Backend answered 2xx but the body was not JSON.
    #[error("invalid payload from {backend}: {message}")]
    InvalidPayload { backend: String, message: String },

    /// Any other client-side failure (building the request, reading the body).
    #[error("request to {backend} failed: {message}")]
    Request { backend: String, message: String },
}

impl GatewayError {
    /// True when the backend could not be reached at all.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, GatewayError::ConnectionFailure { .. })
    }

    /// Classify a reqwest failure against `backend`.
    pub fn from_reqwest(backend: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout {
                backend: backend.to_string(),
                timeout_ms,
            }
        } else if err.is_connect() {
            GatewayError::ConnectionFailure {
                backend: backend.to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            GatewayError::UpstreamError {
                backend: backend.to_string(),
                status: status.as_u16(),
            }
        } else {
            GatewayError::Request {
                backend: backend.to_string(),
                message: err.to_string(),
            }
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors assembling the gateway at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] crate::load_balancer::registry::RegistryError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
