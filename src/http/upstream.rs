//! Outbound requests to storage backends.
//!
//! # Responsibilities
//! - Fetch the data payload from a selected backend
//! - Forward proxied requests (method, headers minus Host, JSON body)
//! - Bound every call by the request timeout and retry connection failures

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode};
use crate::config::UpstreamConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::load_balancer::BackendEndpoint;
use crate::resilience::backoff::Backoff;
use crate::resilience::retries::RetryPolicy;

/// A proxied backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

/// HTTP client for the request path.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    data_path: String,
    timeout_ms: u64,
    retry: RetryPolicy,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        // Backends are internal addresses; never route them through an env proxy.
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            data_path: config.data_path.clone(),
            timeout_ms: config.request_timeout_ms,
            retry: RetryPolicy {
                max_retries: config.connect_retries,
                backoff: Backoff::from_config(config),
            },
        })
    }

    /// Fetch the data payload. The body must be JSON; it is returned as raw
    /// bytes so the cache can serve it unchanged.
    pub async fn fetch_data(&self, endpoint: &BackendEndpoint) -> GatewayResult<Bytes> {
        let backend = endpoint.as_str();
        let url = endpoint.url_for(&self.data_path);
        let url = &url;

        self.retry
            .run(|| async move {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| GatewayError::from_reqwest(backend, self.timeout_ms, e))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(GatewayError::UpstreamError {
                        backend: backend.to_string(),
                        status: status.as_u16(),
                    });
                }

                let body = response
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::from_reqwest(backend, self.timeout_ms, e))?;

                serde_json::from_slice::<serde_json::Value>(&body).map_err(|e| {
                    GatewayError::InvalidPayload {
                        backend: backend.to_string(),
                        message: e.to_string(),
                    }
                })?;

                Ok(body)
            })
            .await
    }

    /// Forward a request to `path` on `endpoint`.
    pub async fn forward(
        &self,
        endpoint: &BackendEndpoint,
        method: Method,
        path: &str,
        headers: &HeaderMap,
        body: Option<&serde_json::Value>,
    ) -> GatewayResult<ProxiedResponse> {
        let backend = endpoint.as_str();
        let url = endpoint.url_for(path);
        let headers = forwarded_headers(headers);
        let (url, headers, method) = (&url, &headers, &method);

        self.retry
            .run(|| async move {
                let mut request = self
                    .client
                    .request(method.clone(), url)
                    .headers(headers.clone());
                if let Some(json) = body {
                    request = request.json(json);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| GatewayError::from_reqwest(backend, self.timeout_ms, e))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(GatewayError::UpstreamError {
                        backend: backend.to_string(),
                        status: status.as_u16(),
                    });
                }

                let body = response
                    .json::<serde_json::Value>()
                    .await
                    .map_err(|e| GatewayError::InvalidPayload {
                        backend: backend.to_string(),
                        message: e.to_string(),
                    })?;

                Ok(ProxiedResponse { status, body })
            })
            .await
    }
}

/// Inbound headers minus Host and hop-by-hop framing headers.
pub fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in [
        header::HOST,
        header::CONTENT_LENGTH,
        header::CONNECTION,
        header::TRANSFER_ENCODING,
    ] {
        forwarded.remove(name);
    }
    forwarded
}
