//! HTTP health probe.
//!
//! A probe is one bounded `GET <backend><path>`. Any 2xx is a success;
//! connection errors, timeouts and non-2xx statuses are failures.

use std::time::Duration;
use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use crate::config::HealthCheckConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::load_balancer::BackendEndpoint;
use crate::resilience::timeouts::with_timeout;

/// Issues health probes. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct HealthProber {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
}

impl std::fmt::Debug for HealthProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthProber")
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HealthProber {
    pub fn new(config: &HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());

        Self {
            client,
            path: config.path.clone(),
            timeout: config.timeout(),
        }
    }

    /// Probe `endpoint` once.
    pub async fn probe(&self, endpoint: &BackendEndpoint) -> GatewayResult<()> {
        let backend = endpoint.as_str();
        let request = Request::builder()
            .method("GET")
            .uri(endpoint.url_for(&self.path))
            .header("user-agent", "storage-gateway-health-check")
            .body(Body::empty())
            .map_err(|e| GatewayError::Request {
                backend: backend.to_string(),
                message: e.to_string(),
            })?;

        with_timeout(self.timeout, backend, async {
            let response = self.client.request(request).await.map_err(|e| {
                if e.is_connect() {
                    GatewayError::ConnectionFailure { backend: backend.to_string(), message: e.to_string() }
                } else {
                    GatewayError::Request { backend: backend.to_string(), message: e.to_string() }
                }
            })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(GatewayError::UpstreamError {
                    backend: backend.to_string(),
                    status: response.status().as_u16(),
                })
            }
        })
        .await
    }
}
